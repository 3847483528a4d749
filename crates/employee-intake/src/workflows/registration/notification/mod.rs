//! Post-registration notification: chooses the create or update flow, resolves operator
//! parameters, optionally renders and stores a report artifact, renders the body through
//! a rule script and hands the plan to a [`Notifier`].

mod artifact;
mod queue;

use std::collections::HashMap;
use std::sync::Arc;

use rhai::Dynamic;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::directory::EmployeeDirectory;
use super::domain::EmployeeSubmission;
use super::parameters::{flag_enabled, ParameterSource};
use super::rules::RuleStore;
use super::scripting::{ScriptEngine, ScriptExtras};
use super::storage::{BlobError, BlobStore, StoreError};

pub use artifact::{
    report_file_name, safe_digits_prefix, safe_prefix, safe_upper, ArtifactRenderer,
    HtmlReportRenderer, RenderError,
};
pub use queue::{NotificationDispatch, NotificationJob, NotificationQueue};

/// Global switch for the update-specific message set.
pub const UPDATE_INFORMATION: &str = "UPDATE_INFORMATION";
/// Switch for embedding stored report artifacts in profile responses.
pub const GET_REPORT_EMPLOYEE: &str = "GET_REPORT_EMPLOYEE";
/// Name of the raw template inside body scripts.
pub const TEMPLATE_BINDING: &str = "template";

const CREATE_BODY_RULE: &str = "CAST_CONTENT_EMAIL";
const UPDATE_BODY_RULE: &str = "CAST_CONTENT_EMAIL_UPDATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Create,
    Update,
}

impl Flow {
    /// The update flow applies only when the employee was overwritten and update
    /// notices are switched on.
    pub fn resolve(update_flow: bool, update_notices_enabled: bool) -> Self {
        if update_flow && update_notices_enabled {
            Self::Update
        } else {
            Self::Create
        }
    }

    pub fn body_rule(self) -> &'static str {
        match self {
            Self::Create => CREATE_BODY_RULE,
            Self::Update => UPDATE_BODY_RULE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }

    fn parameter_suffix(self) -> &'static str {
        match self {
            Self::Create => "",
            Self::Update => "_UPDATE",
        }
    }
}

/// Parameter names consulted for one flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterKeys {
    pub subject: String,
    pub content: String,
    pub copy: String,
    pub send_attachment: String,
    pub send_copy: String,
    pub send_blind_copy: String,
    pub blind_copy: String,
}

impl ParameterKeys {
    pub fn for_flow(flow: Flow) -> Self {
        let key = |base: &str| format!("{base}{}", flow.parameter_suffix());
        Self {
            subject: key("EMAIL_SUBJECT"),
            content: key("EMAIL_CONTENT"),
            copy: key("EMAIL_COPY"),
            send_attachment: key("EMAIL_SEND_ATTACHMENT"),
            send_copy: key("SEND_EMAIL_WITH_COPY"),
            send_blind_copy: key("SEND_EMAIL_WITH_BLIND_COPY"),
            blind_copy: key("BLIND_COPY_EMAILS"),
        }
    }

    pub fn names(&self) -> [&str; 7] {
        [
            self.subject.as_str(),
            self.content.as_str(),
            self.copy.as_str(),
            self.send_attachment.as_str(),
            self.send_copy.as_str(),
            self.send_blind_copy.as_str(),
            self.blind_copy.as_str(),
        ]
    }
}

/// Operator settings for one notification, resolved from parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationConfig {
    pub subject: String,
    pub template: String,
    pub attach_report: bool,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl NotificationConfig {
    pub fn from_parameters(keys: &ParameterKeys, values: &HashMap<String, String>) -> Self {
        let value = |key: &String| values.get(key).map(String::as_str);
        Self {
            subject: value(&keys.subject).unwrap_or_default().to_string(),
            template: value(&keys.content).unwrap_or_default().to_string(),
            attach_report: flag_enabled(value(&keys.send_attachment)),
            cc: recipients(value(&keys.copy), flag_enabled(value(&keys.send_copy))),
            bcc: recipients(
                value(&keys.blind_copy),
                flag_enabled(value(&keys.send_blind_copy)),
            ),
        }
    }
}

/// Comma-separated addresses, trimmed with blanks dropped. Empty unless `enabled`.
pub fn recipients(raw: Option<&str>, enabled: bool) -> Vec<String> {
    if !enabled {
        return Vec::new();
    }
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Fully prepared message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPlan {
    pub flow: Flow,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// Outbound message transport.
pub trait Notifier: Send + Sync {
    fn send(&self, plan: &NotificationPlan) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Adapters the notification stage writes through.
pub struct NotificationServices {
    pub renderer: Arc<dyn ArtifactRenderer>,
    pub blobs: Arc<dyn BlobStore>,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct NotificationOrchestrator {
    parameters: Arc<dyn ParameterSource>,
    rules: Arc<dyn RuleStore>,
    engine: Arc<ScriptEngine>,
    services: NotificationServices,
}

impl NotificationOrchestrator {
    pub fn new(
        parameters: Arc<dyn ParameterSource>,
        rules: Arc<dyn RuleStore>,
        engine: Arc<ScriptEngine>,
        services: NotificationServices,
    ) -> Self {
        Self {
            parameters,
            rules,
            engine,
            services,
        }
    }

    /// Builds and sends the notification for `submission`.
    ///
    /// Returns `Ok(None)` without touching any collaborator when the submission carries
    /// no contact address.
    pub fn prepare(
        &self,
        submission: &EmployeeSubmission,
        update_flow: bool,
    ) -> Result<Option<NotificationPlan>, NotificationError> {
        let Some(to) = submission.contact_address() else {
            debug!("no contact address; notification skipped");
            return Ok(None);
        };

        let update_notices = flag_enabled(self.parameters.get_one(UPDATE_INFORMATION)?.as_deref());
        let flow = Flow::resolve(update_flow, update_notices);
        let keys = ParameterKeys::for_flow(flow);
        let config =
            NotificationConfig::from_parameters(&keys, &self.parameters.get_many(&keys.names())?);

        let attachment = if config.attach_report {
            Some(self.store_report(submission, flow)?)
        } else {
            None
        };
        let body = self.render_body(submission, flow, &config.template)?;

        let plan = NotificationPlan {
            flow,
            to: to.to_string(),
            subject: config.subject,
            body,
            attachment,
            cc: config.cc,
            bcc: config.bcc,
        };
        self.services.notifier.send(&plan)?;
        info!(
            flow = flow.label(),
            attachment = plan.attachment.is_some(),
            cc = plan.cc.len(),
            bcc = plan.bcc.len(),
            "notification sent"
        );
        Ok(Some(plan))
    }

    fn store_report(
        &self,
        submission: &EmployeeSubmission,
        flow: Flow,
    ) -> Result<Attachment, NotificationError> {
        let bytes = self.services.renderer.render(submission, flow)?;
        let name = report_file_name(submission);
        let key = self.services.blobs.store(&bytes, &name)?;
        self.services.directory.record_report(
            &submission.document_type,
            &submission.document_number,
            &key,
        )?;
        Ok(Attachment { name, bytes })
    }

    // Falls back to the raw template when the body rule is absent or yields nothing.
    fn render_body(
        &self,
        submission: &EmployeeSubmission,
        flow: Flow,
        template: &str,
    ) -> Result<String, StoreError> {
        let Some(rule) = self.rules.find_active(flow.body_rule())? else {
            warn!(rule = flow.body_rule(), "body rule not active; using raw template");
            return Ok(template.to_string());
        };

        let mut context = submission.clone();
        let mut extras =
            ScriptExtras::new().with(TEMPLATE_BINDING, Dynamic::from(template.to_string()));
        match self
            .engine
            .run(std::slice::from_ref(&rule), &mut context, &mut extras)
        {
            Some(body) if !body.trim().is_empty() => Ok(body),
            _ => {
                warn!(rule = %rule.id, "body rule produced no content; using raw template");
                Ok(template.to_string())
            }
        }
    }
}
