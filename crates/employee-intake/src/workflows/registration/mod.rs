//! Employee intake: rule-script validation, remote registration and follow-up notification.
//!
//! Rules, message templates and feature toggles live in the relational store so operators
//! can change behavior without a redeploy. The pipeline reads them on every submission.

pub mod calendar;
pub mod directory;
pub mod domain;
pub mod notification;
pub mod parameters;
pub mod pipeline;
pub mod profile;
pub mod remote;
pub mod router;
pub mod rules;
pub mod scripting;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod tests;

pub use calendar::{parse_flexible_date, Period};
pub use directory::{EmployeeDirectory, EmployeeRecord, ProfileLookup, SavedEmployee};
pub use domain::{
    CallerIdentity, CodeDescription, EmployeeSubmission, EmployeeView, PipelineResult,
    ValidationOutcome, STATUS_INTERNAL_ERROR, STATUS_OK,
};
pub use notification::{
    ArtifactRenderer, Attachment, Flow, HtmlReportRenderer, NotificationConfig,
    NotificationDispatch, NotificationError, NotificationJob, NotificationOrchestrator,
    NotificationPlan, NotificationQueue, NotificationServices, Notifier, NotifyError,
    RenderError,
};
pub use parameters::ParameterSource;
pub use pipeline::RegistrationPipeline;
pub use profile::{EmployeeProfile, ProfileError, ProfileResult, ProfileService};
pub use remote::{
    ComputedFields, DirectoryRegistrationClient, RegistrationClient, RegistrationRequest,
    RegistrationResponse, RemoteError,
};
pub use router::{registration_router, RegistrationState};
pub use rules::{RuleDefinition, RuleStore, NOTIFICATION_RULE_SET, VALIDATION_RULE_SET};
pub use scripting::{ReadQueries, Row, ScriptEngine, ScriptError, ScriptExtras};
pub use storage::{BlobError, BlobStore, FileSystemBlobStore, SqliteDatabase, StoreError};
pub use validation::{ValidationOrchestrator, ValidationReport};
