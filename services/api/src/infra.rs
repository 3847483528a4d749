use employee_intake::config::{AppConfig, ScriptingConfig};
use employee_intake::error::AppError;
use employee_intake::workflows::registration::{
    EmployeeSubmission, NotificationPlan, Notifier, NotifyError, ScriptEngine, SqliteDatabase,
    ValidationOrchestrator, ValidationReport,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Outbound mail stand-in: every plan is written to the log instead of a mail relay.
#[derive(Debug, Default, Clone)]
pub(crate) struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send(&self, plan: &NotificationPlan) -> Result<(), NotifyError> {
        info!(
            flow = plan.flow.label(),
            to = %plan.to,
            subject = %plan.subject,
            cc = plan.cc.len(),
            bcc = plan.bcc.len(),
            attachment = plan.attachment.as_ref().map(|item| item.name.as_str()),
            "notification delivered"
        );
        Ok(())
    }
}

/// Opens the configured database and installs any missing default rows.
pub(crate) fn open_store(config: &AppConfig) -> Result<Arc<SqliteDatabase>, AppError> {
    let db = SqliteDatabase::open(&config.storage.database_path)?;
    db.seed_defaults()?;
    Ok(Arc::new(db))
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidationSummary {
    pub(crate) passed: bool,
    pub(crate) report: ValidationReport,
    pub(crate) submission: EmployeeSubmission,
}

/// Runs only the validation stage and returns the possibly normalised submission.
pub(crate) fn validate_submission(
    db: Arc<SqliteDatabase>,
    scripting: ScriptingConfig,
    mut submission: EmployeeSubmission,
) -> Result<ValidationSummary, AppError> {
    let engine = Arc::new(ScriptEngine::new(db.clone(), scripting));
    let report = ValidationOrchestrator::new(db, engine).validate(&mut submission)?;
    Ok(ValidationSummary {
        passed: report.passed(),
        report,
        submission,
    })
}
