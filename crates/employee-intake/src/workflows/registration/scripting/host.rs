use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};
use rhai::{Dynamic, Engine, EvalAltResult, Position};

use crate::workflows::registration::calendar::{parse_flexible_date, Period};
use crate::workflows::registration::domain::ValidationOutcome;
use crate::workflows::registration::notification::safe_prefix;

type RhaiResultOf<T> = Result<T, Box<EvalAltResult>>;

/// Outcome log shared between the validation orchestrator and its scripts.
///
/// Clones share the same entries, so the copy bound into a script scope records into the
/// log the orchestrator inspects.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    entries: Arc<Mutex<Vec<ValidationOutcome>>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ValidationOutcome>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, outcome: ValidationOutcome) {
        self.lock().push(outcome);
    }

    pub fn has_error(&self) -> bool {
        self.lock().iter().any(|outcome| outcome.is_error)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ValidationOutcome> {
        self.lock().clone()
    }
}

/// Stateless helper namespace exposed to scripts as `util`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleHelpers;

fn is_blank(value: &Dynamic) -> bool {
    if value.is_unit() {
        return true;
    }
    match value.clone().into_immutable_string() {
        Ok(text) => text.trim().is_empty(),
        Err(_) => false,
    }
}

fn script_date(raw: &str) -> RhaiResultOf<NaiveDate> {
    parse_flexible_date(raw).ok_or_else(|| {
        EvalAltResult::ErrorRuntime(
            Dynamic::from(format!("'{raw}' is not a recognised date")),
            Position::NONE,
        )
        .into()
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(super) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<OutcomeLog>("Outcomes")
        .register_fn("error", |log: &mut OutcomeLog, message: &str| {
            log.record(ValidationOutcome::error(message))
        })
        .register_fn("info", |log: &mut OutcomeLog, message: &str| {
            log.record(ValidationOutcome::info(message))
        })
        .register_fn("has_error", |log: &mut OutcomeLog| log.has_error())
        .register_fn("len", |log: &mut OutcomeLog| log.len() as i64);

    engine
        .register_type_with_name::<RuleHelpers>("Helpers")
        .register_fn("is_blank", |_: &mut RuleHelpers, value: Dynamic| {
            is_blank(&value)
        })
        .register_fn("is_valid_date", |_: &mut RuleHelpers, raw: &str| {
            parse_flexible_date(raw).is_some()
        })
        .register_fn(
            "years_since",
            |_: &mut RuleHelpers, raw: &str| -> RhaiResultOf<i64> {
                let date = script_date(raw)?;
                Ok(i64::from(Period::between(date, today()).years))
            },
        )
        .register_fn(
            "days_between",
            |_: &mut RuleHelpers, from: &str, to: &str| -> RhaiResultOf<i64> {
                Ok((script_date(to)? - script_date(from)?).num_days())
            },
        )
        .register_fn(
            "safe_prefix",
            |_: &mut RuleHelpers, value: &str, length: i64| {
                safe_prefix(value, usize::try_from(length).unwrap_or_default())
            },
        )
        .register_fn("today", |_: &mut RuleHelpers| today().to_string());
}
