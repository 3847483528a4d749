use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::domain::{CallerIdentity, EmployeeSubmission, EmployeeView, PipelineResult};
use super::notification::{NotificationDispatch, NotificationJob};
use super::remote::{RegistrationClient, RegistrationRequest, RegistrationResponse};
use super::validation::ValidationOrchestrator;

/// Validate, register, then hand off notification.
///
/// Each call is independent: the submission is normalised by the validation scripts,
/// forwarded to the remote registration system, and queued for notification whenever it
/// carries a contact address. The caller gets its answer before notification runs.
pub struct RegistrationPipeline {
    validation: ValidationOrchestrator,
    remote: Arc<dyn RegistrationClient>,
    notifications: Arc<dyn NotificationDispatch>,
}

impl RegistrationPipeline {
    pub fn new(
        validation: ValidationOrchestrator,
        remote: Arc<dyn RegistrationClient>,
        notifications: Arc<dyn NotificationDispatch>,
    ) -> Self {
        Self {
            validation,
            remote,
            notifications,
        }
    }

    pub fn submit(
        &self,
        mut submission: EmployeeSubmission,
        caller: &CallerIdentity,
    ) -> PipelineResult {
        let report = match self.validation.validate(&mut submission) {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "validation rules unavailable");
                return PipelineResult::failure(format!("validation rules unavailable: {err}"));
            }
        };
        if let Some(rejection) = report.first_error() {
            return PipelineResult::failure(rejection.message.clone());
        }

        let request = RegistrationRequest::from_submission(&submission);
        let response = self
            .remote
            .register(&request, &caller.token)
            .unwrap_or_else(|err| {
                warn!(error = %err, "remote registration unreachable");
                RegistrationResponse::failure(err.to_string())
            });
        info!(
            status = response.status_code,
            updated = response.updated,
            "remote registration answered"
        );

        let registered = !response.failed();
        let result = PipelineResult {
            status_code: response.status_code,
            message: response.status_message.clone(),
            data: registered.then(|| EmployeeView::from_registration(&submission, &response.computed)),
        };

        if submission.contact_address().is_some() {
            self.notifications.enqueue(NotificationJob {
                submission,
                update_flow: registered && response.updated,
            });
        } else {
            debug!("no contact address; notification not queued");
        }

        result
    }
}
