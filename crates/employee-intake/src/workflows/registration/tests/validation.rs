use std::sync::Arc;

use chrono::{Datelike, Local};

use super::common::*;
use crate::workflows::registration::domain::ValidationOutcome;
use crate::workflows::registration::storage::{SqliteDatabase, StoreError};
use crate::workflows::registration::validation::ValidationOrchestrator;

#[test]
fn first_error_stops_later_rules() {
    let queries = Arc::new(CountingQueries::default());
    let orchestrator = ValidationOrchestrator::new(
        Arc::new(MemoryRules::with_validation(vec![
            rule("FIRST", r#"outcomes.error("first failure");"#),
            rule(
                "SECOND",
                r#"query("SELECT 1"); outcomes.error("second failure");"#,
            ),
        ])),
        engine_with(queries.clone()),
    );

    let mut candidate = submission();
    let report = orchestrator.validate(&mut candidate).expect("rules load");

    assert_eq!(report.outcomes, vec![ValidationOutcome::error("first failure")]);
    assert!(queries.calls().is_empty());
}

#[test]
fn informational_outcomes_do_not_reject() {
    let orchestrator = validator(vec![
        rule("NOTE", r#"outcomes.info("checked names");"#),
        rule("COUNT", r#"if outcomes.len() != 1 { outcomes.error("lost note"); }"#),
    ]);

    let mut candidate = submission();
    let report = orchestrator.validate(&mut candidate).expect("rules load");

    assert!(report.passed());
    assert_eq!(report.outcomes, vec![ValidationOutcome::info("checked names")]);
}

#[test]
fn throwing_rule_without_recorded_error_still_passes() {
    let orchestrator = validator(vec![
        rule("BOOM", r#"throw "unexpected";"#),
        rule("NEVER", r#"outcomes.error("not reached");"#),
    ]);

    let mut candidate = submission();
    let report = orchestrator.validate(&mut candidate).expect("rules load");

    assert!(report.passed());
    assert!(report.outcomes.is_empty());
}

#[test]
fn rules_normalise_the_submission_in_place() {
    let orchestrator = validator(vec![rule(
        "UPPER",
        "context.names = context.names.to_upper();",
    )]);

    let mut candidate = submission();
    orchestrator.validate(&mut candidate).expect("rules load");
    assert_eq!(candidate.names, "ANA");
}

#[test]
fn unavailable_rule_store_is_an_error() {
    let orchestrator = ValidationOrchestrator::new(Arc::new(UnavailableRules), engine());
    let mut candidate = submission();
    assert!(matches!(
        orchestrator.validate(&mut candidate),
        Err(StoreError::LockPoisoned)
    ));
}

fn seeded_validator() -> ValidationOrchestrator {
    let db = Arc::new(SqliteDatabase::in_memory().expect("db"));
    db.seed_defaults().expect("seeded");
    ValidationOrchestrator::new(db.clone(), engine_with(db))
}

#[test]
fn default_rules_accept_and_canonicalise_a_valid_employee() {
    let orchestrator = seeded_validator();
    let mut candidate = submission();
    candidate.names = "  Ana ".to_string();
    candidate.document_type = "passport".to_string();
    candidate.position = "software developer".to_string();

    let report = orchestrator.validate(&mut candidate).expect("rules load");

    assert!(report.passed(), "{:?}", report.outcomes);
    assert_eq!(candidate.names, "Ana");
    assert_eq!(candidate.document_type, "PP");
    assert_eq!(candidate.position, "DEV");
}

#[test]
fn default_rules_reject_missing_fields_first() {
    let orchestrator = seeded_validator();
    let mut candidate = submission();
    candidate.names = "   ".to_string();
    candidate.salary = String::new();

    let report = orchestrator.validate(&mut candidate).expect("rules load");
    assert_eq!(
        report.first_error().map(|outcome| outcome.message.as_str()),
        Some("Names are required")
    );
    assert_eq!(report.outcomes.len(), 1);
}

#[test]
fn default_rules_reject_bad_dates_unknown_catalog_values_and_minors() {
    let orchestrator = seeded_validator();

    let mut bad_date = submission();
    bad_date.date_of_birth = "31/31/1990".to_string();
    let report = orchestrator.validate(&mut bad_date).expect("rules load");
    assert_eq!(
        report.first_error().map(|outcome| outcome.message.clone()),
        Some("Date of birth has an invalid format".to_string())
    );

    let mut unknown_position = submission();
    unknown_position.position = "astronaut".to_string();
    let report = orchestrator
        .validate(&mut unknown_position)
        .expect("rules load");
    assert_eq!(
        report.first_error().map(|outcome| outcome.message.clone()),
        Some("Position ASTRONAUT is not recognised".to_string())
    );

    let this_year = Local::now().year();
    let mut minor = submission();
    minor.date_of_birth = format!("{}-01-01", this_year - 10);
    minor.date_affiliation_company = format!("{}-01-01", this_year - 1);
    let report = orchestrator.validate(&mut minor).expect("rules load");
    assert_eq!(
        report.first_error().map(|outcome| outcome.message.clone()),
        Some("The employee must be of legal age".to_string())
    );

    let mut reversed = submission();
    reversed.date_affiliation_company = "1990-01-01".to_string();
    let report = orchestrator.validate(&mut reversed).expect("rules load");
    assert_eq!(
        report.first_error().map(|outcome| outcome.message.clone()),
        Some("Company affiliation date cannot precede the date of birth".to_string())
    );
}
