use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::calendar::{parse_flexible_date, Period};
use super::directory::EmployeeDirectory;
use super::domain::{EmployeeSubmission, STATUS_INTERNAL_ERROR, STATUS_OK};
use super::storage::StoreError;

pub const SAVED_MESSAGE: &str = "Saved";
pub const UPDATED_MESSAGE: &str = "Updated";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token.";

/// Payload handed to the remote registration system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub names: String,
    pub last_names: String,
    pub document_type: String,
    pub document_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_affiliation_company: Option<NaiveDate>,
    pub position: String,
    pub salary: String,
}

impl RegistrationRequest {
    pub fn from_submission(submission: &EmployeeSubmission) -> Self {
        Self {
            names: submission.names.clone(),
            last_names: submission.last_names.clone(),
            document_type: submission.document_type.clone(),
            document_number: submission.document_number.clone(),
            date_of_birth: parse_flexible_date(&submission.date_of_birth),
            date_affiliation_company: parse_flexible_date(&submission.date_affiliation_company),
            position: submission.position.clone(),
            salary: submission.salary.clone(),
        }
    }
}

/// Values the remote system derives while registering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedFields {
    pub tenure: Period,
    pub age: Period,
    pub type_document_description: Option<String>,
    pub position_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub status_code: u16,
    pub status_message: String,
    /// Set when the remote overwrote an existing employee instead of creating one.
    pub updated: bool,
    #[serde(default)]
    pub computed: ComputedFields,
}

impl RegistrationResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_INTERNAL_ERROR,
            status_message: message.into(),
            updated: false,
            computed: ComputedFields::default(),
        }
    }

    pub fn failed(&self) -> bool {
        self.status_code == STATUS_INTERNAL_ERROR
    }
}

/// Remote employee registration, called with the caller's bearer token.
pub trait RegistrationClient: Send + Sync {
    fn register(
        &self,
        request: &RegistrationRequest,
        caller_token: &str,
    ) -> Result<RegistrationResponse, RemoteError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("registration transport unavailable: {0}")]
    Transport(String),
}

/// Registration system backed directly by the local employee directory.
///
/// Any non-blank bearer token is accepted. Records the store refuses come back as the
/// internal-error status; store outages surface as transport errors.
pub struct DirectoryRegistrationClient {
    directory: Arc<dyn EmployeeDirectory>,
}

impl DirectoryRegistrationClient {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

impl RegistrationClient for DirectoryRegistrationClient {
    fn register(
        &self,
        request: &RegistrationRequest,
        caller_token: &str,
    ) -> Result<RegistrationResponse, RemoteError> {
        if caller_token.trim().is_empty() {
            return Ok(RegistrationResponse::failure(INVALID_TOKEN_MESSAGE));
        }

        let saved = match self.directory.save(request) {
            Ok(saved) => saved,
            Err(StoreError::InvalidRecord(message)) => {
                return Ok(RegistrationResponse::failure(message))
            }
            Err(other) => return Err(RemoteError::Transport(other.to_string())),
        };
        debug!(id = saved.record.id, updated = saved.updated, "employee stored");

        let today = Local::now().date_naive();
        let record = saved.record;
        Ok(RegistrationResponse {
            status_code: STATUS_OK,
            status_message: if saved.updated {
                UPDATED_MESSAGE
            } else {
                SAVED_MESSAGE
            }
            .to_string(),
            updated: saved.updated,
            computed: ComputedFields {
                tenure: Period::between(record.date_affiliation_company, today),
                age: Period::between(record.date_of_birth, today),
                type_document_description: record.document_type.description,
                position_description: record.position.description,
            },
        })
    }
}
