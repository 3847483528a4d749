use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::CodeDescription;
use super::remote::RegistrationRequest;
use super::storage::StoreError;

/// Persisted employee row joined with its catalog descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: i64,
    pub names: String,
    pub last_names: String,
    pub document_type: CodeDescription,
    pub document_number: String,
    pub date_of_birth: NaiveDate,
    pub date_affiliation_company: NaiveDate,
    pub position: CodeDescription,
    pub salary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedEmployee {
    pub record: EmployeeRecord,
    /// `true` when an existing row with the same document was overwritten.
    pub updated: bool,
}

/// Lookup by id, or by document type (code or description) together with document number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileLookup {
    pub id: Option<i64>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
}

impl ProfileLookup {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_document(document_type: impl Into<String>, document_number: impl Into<String>) -> Self {
        Self {
            id: None,
            document_type: Some(document_type.into()),
            document_number: Some(document_number.into()),
        }
    }

    /// Blank query values count as missing.
    pub fn normalized(&self) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            id: self.id,
            document_type: clean(&self.document_type),
            document_number: clean(&self.document_number),
        }
    }

    pub fn is_searchable(&self) -> bool {
        self.id.is_some() || (self.document_type.is_some() && self.document_number.is_some())
    }
}

/// Employee persistence shared by the registration system and the profile read path.
pub trait EmployeeDirectory: Send + Sync {
    fn find(&self, lookup: &ProfileLookup) -> Result<Option<EmployeeRecord>, StoreError>;
    /// Inserts or overwrites the employee keyed by document type and number.
    fn save(&self, request: &RegistrationRequest) -> Result<SavedEmployee, StoreError>;
    /// Remembers where the latest report artifact was stored.
    fn record_report(
        &self,
        document_type: &str,
        document_number: &str,
        location: &str,
    ) -> Result<(), StoreError>;
}
