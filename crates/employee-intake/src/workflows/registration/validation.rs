use std::sync::Arc;

use rhai::Dynamic;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{EmployeeSubmission, ValidationOutcome};
use super::rules::{RuleStore, VALIDATION_RULE_SET};
use super::scripting::{OutcomeLog, RuleHelpers, ScriptEngine, ScriptExtras};
use super::storage::StoreError;

/// Name of the outcome log inside validation scripts.
pub const OUTCOMES_BINDING: &str = "outcomes";
/// Name of the helper namespace inside validation scripts.
pub const HELPERS_BINDING: &str = "util";

/// Everything the validation scripts recorded for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub outcomes: Vec<ValidationOutcome>,
}

impl ValidationReport {
    pub fn first_error(&self) -> Option<&ValidationOutcome> {
        self.outcomes.iter().find(|outcome| outcome.is_error)
    }

    pub fn passed(&self) -> bool {
        self.first_error().is_none()
    }
}

/// Runs the active validation rule set against a submission.
///
/// Scripts share one outcome log and stop at the first recorded error. A script that
/// throws ends the run without failing validation; only recorded error outcomes reject.
pub struct ValidationOrchestrator {
    rules: Arc<dyn RuleStore>,
    engine: Arc<ScriptEngine>,
}

impl ValidationOrchestrator {
    pub fn new(rules: Arc<dyn RuleStore>, engine: Arc<ScriptEngine>) -> Self {
        Self { rules, engine }
    }

    /// Validates and normalises `submission` in place.
    pub fn validate(
        &self,
        submission: &mut EmployeeSubmission,
    ) -> Result<ValidationReport, StoreError> {
        let rules = self.rules.active_rules(VALIDATION_RULE_SET)?;
        let outcomes = OutcomeLog::new();
        let mut extras = ScriptExtras::new()
            .with(HELPERS_BINDING, Dynamic::from(RuleHelpers))
            .with(OUTCOMES_BINDING, Dynamic::from(outcomes.clone()));

        match self
            .engine
            .run_until(&rules, submission, &mut extras, || outcomes.has_error())
        {
            Some(output) => debug!(rules = rules.len(), %output, "validation scripts completed"),
            None => warn!(
                rules = rules.len(),
                "validation scripts aborted; recorded outcomes still apply"
            ),
        }

        let report = ValidationReport {
            outcomes: outcomes.snapshot(),
        };
        if let Some(rejection) = report.first_error() {
            info!(message = %rejection.message, "submission rejected by validation rule");
        }
        Ok(report)
    }
}
