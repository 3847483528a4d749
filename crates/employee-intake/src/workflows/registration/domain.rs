use serde::{Deserialize, Serialize};

use super::calendar::Period;
use super::remote::ComputedFields;

pub const STATUS_OK: u16 = 200;
/// Status shared by rule rejections and remote registration failures.
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Employee record as submitted through the public entry point.
///
/// Fields stay raw strings: rule scripts decide what is blank, malformed or unknown,
/// and may normalise values in place before registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeSubmission {
    pub names: String,
    pub last_names: String,
    pub document_type: String,
    pub document_number: String,
    pub date_of_birth: String,
    pub date_affiliation_company: String,
    pub position: String,
    pub email: Option<String>,
    pub salary: String,
}

impl EmployeeSubmission {
    /// Trimmed contact address, if one was supplied.
    pub fn contact_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
    }
}

/// A single rule verdict appended to the shared outcome log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub message: String,
    pub is_error: bool,
}

impl ValidationOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }
}

/// Token forwarded to the remote registration system on behalf of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub token: String,
}

impl CallerIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Externally visible shape of a registered employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeView {
    pub names: String,
    pub last_names: String,
    pub document_type: CodeDescription,
    pub document_number: String,
    pub date_of_birth: String,
    pub date_affiliation_company: String,
    pub position: CodeDescription,
    pub salary: String,
    pub time_linked_to_company: Period,
    pub current_age: Period,
}

impl EmployeeView {
    pub fn from_registration(submission: &EmployeeSubmission, computed: &ComputedFields) -> Self {
        Self {
            names: submission.names.clone(),
            last_names: submission.last_names.clone(),
            document_type: CodeDescription {
                code: submission.document_type.clone(),
                description: computed.type_document_description.clone(),
            },
            document_number: submission.document_number.clone(),
            date_of_birth: submission.date_of_birth.clone(),
            date_affiliation_company: submission.date_affiliation_company.clone(),
            position: CodeDescription {
                code: submission.position.clone(),
                description: computed.position_description.clone(),
            },
            salary: submission.salary.clone(),
            time_linked_to_company: computed.tenure,
            current_age: computed.age,
        }
    }
}

/// Outcome of one pipeline run, returned to the caller and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status_code: u16,
    pub message: String,
    pub data: Option<EmployeeView>,
}

impl PipelineResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code != STATUS_INTERNAL_ERROR
    }
}
