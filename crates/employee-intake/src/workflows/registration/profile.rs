use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Local, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::warn;

use super::calendar::Period;
use super::directory::{EmployeeDirectory, EmployeeRecord, ProfileLookup};
use super::domain::STATUS_OK;
use super::notification::GET_REPORT_EMPLOYEE;
use super::parameters::{flag_enabled, ParameterSource};
use super::storage::{BlobError, BlobStore, StoreError};

pub const PROFILE_FOUND_MESSAGE: &str = "The information was consulted correctly";

/// Stored employee plus derived tenure and age, and optionally the latest report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeProfile {
    #[serde(flatten)]
    pub employee: EmployeeRecord,
    pub time_linked_to_company: Period,
    pub current_age: Period,
    #[serde(
        serialize_with = "serialize_report",
        skip_serializing_if = "Option::is_none"
    )]
    pub report: Option<Vec<u8>>,
}

fn serialize_report<S: Serializer>(report: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match report {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileResult {
    pub status_code: u16,
    pub message: String,
    pub data: EmployeeProfile,
}

impl ProfileResult {
    pub fn found(profile: EmployeeProfile) -> Self {
        Self {
            status_code: STATUS_OK,
            message: PROFILE_FOUND_MESSAGE.to_string(),
            data: profile,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("provide an id or both document type and document number")]
    MissingCriteria,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Read path over registered employees.
pub struct ProfileService {
    directory: Arc<dyn EmployeeDirectory>,
    parameters: Arc<dyn ParameterSource>,
    blobs: Arc<dyn BlobStore>,
}

impl ProfileService {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        parameters: Arc<dyn ParameterSource>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            directory,
            parameters,
            blobs,
        }
    }

    pub fn fetch(&self, lookup: &ProfileLookup) -> Result<Option<EmployeeProfile>, ProfileError> {
        self.fetch_on(lookup, Local::now().date_naive())
    }

    /// Like [`ProfileService::fetch`] with periods computed up to `today`.
    pub fn fetch_on(
        &self,
        lookup: &ProfileLookup,
        today: NaiveDate,
    ) -> Result<Option<EmployeeProfile>, ProfileError> {
        let lookup = lookup.normalized();
        if !lookup.is_searchable() {
            return Err(ProfileError::MissingCriteria);
        }
        let Some(employee) = self.directory.find(&lookup)? else {
            return Ok(None);
        };

        let report = match employee.report_location.as_deref() {
            Some(location)
                if flag_enabled(self.parameters.get_one(GET_REPORT_EMPLOYEE)?.as_deref()) =>
            {
                match self.blobs.fetch(location) {
                    Ok(bytes) => Some(bytes),
                    Err(BlobError::NotFound(key)) => {
                        warn!(%key, "stored report location has no blob");
                        None
                    }
                    Err(other) => return Err(other.into()),
                }
            }
            _ => None,
        };

        Ok(Some(EmployeeProfile {
            time_linked_to_company: Period::between(employee.date_affiliation_company, today),
            current_age: Period::between(employee.date_of_birth, today),
            employee,
            report,
        }))
    }
}
