//! Tests for the real-time vs. bulk scheduling decision as observed
//! through the evaluator.
//!
//! The decision itself is a pure function of the context; these tests
//! pin the observable consequences: which rules actually execute on each
//! path, and that thresholds behave as hard boundaries.

use gridval_core::{
    CellValue, GridRow, Rule, Severity, ValidationConfiguration, ValidationContext,
    ValidationResult, ValidationTrigger,
};
use gridval_engine::Evaluator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn tracked_rule(name: &str, priority: u32, severity: Severity, hits: Arc<AtomicUsize>) -> Rule {
    Rule::single_cell("Amount", move |_, _| {
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(ValidationResult::success())
    })
    .named(name)
    .with_priority(priority)
    .with_severity(severity)
}

#[tokio::test]
async fn realtime_path_runs_only_urgent_rules() {
    let evaluator = Evaluator::new();
    let urgent = Arc::new(AtomicUsize::new(0));
    let deferred = Arc::new(AtomicUsize::new(0));

    evaluator
        .registry()
        .register(tracked_rule("urgent", 50, Severity::Error, urgent.clone()))
        .unwrap();
    evaluator
        .registry()
        .register(tracked_rule("deferred", 500, Severity::Error, deferred.clone()))
        .unwrap();

    let context = evaluator.context_for(ValidationTrigger::OnTextChanged);
    assert!(context.should_use_real_time_validation());

    let row = GridRow::new().set("Amount", 5i64);
    evaluator
        .validate_row(0, &row, Some(context))
        .await
        .unwrap();

    assert_eq!(urgent.load(Ordering::SeqCst), 1);
    assert_eq!(deferred.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bulk_path_runs_every_rule() {
    let evaluator = Evaluator::new();
    let urgent = Arc::new(AtomicUsize::new(0));
    let deferred = Arc::new(AtomicUsize::new(0));

    evaluator
        .registry()
        .register(tracked_rule("urgent", 50, Severity::Error, urgent.clone()))
        .unwrap();
    evaluator
        .registry()
        .register(tracked_rule("deferred", 500, Severity::Error, deferred.clone()))
        .unwrap();

    let context = evaluator.context_for(ValidationTrigger::Bulk);
    assert!(context.should_use_bulk_validation());

    let row = GridRow::new().set("Amount", 5i64);
    evaluator
        .validate_row(0, &row, Some(context))
        .await
        .unwrap();

    assert_eq!(urgent.load(Ordering::SeqCst), 1);
    assert_eq!(deferred.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn row_threshold_is_a_hard_boundary() {
    let evaluator = Evaluator::new();
    evaluator
        .update_configuration(ValidationConfiguration::new().with_real_time_max_rows(5));
    let config = evaluator.configuration();

    let at_limit =
        ValidationContext::new(ValidationTrigger::OnCellChanged, config.clone()).with_rows(5);
    assert!(at_limit.should_use_real_time_validation());
    assert!(!at_limit.should_use_bulk_validation());

    let over_limit = ValidationContext::new(ValidationTrigger::OnCellChanged, config).with_rows(6);
    assert!(!over_limit.should_use_real_time_validation());
    assert!(over_limit.should_use_bulk_validation());
}

#[tokio::test]
async fn import_context_forces_the_comprehensive_path() {
    let evaluator = Evaluator::new();
    let deferred = Arc::new(AtomicUsize::new(0));

    evaluator
        .registry()
        .register(tracked_rule("deferred", 500, Severity::Warning, deferred.clone()))
        .unwrap();

    // One row, one rule: well under every real-time threshold, but the
    // import flag alone forces bulk.
    let context = evaluator.context_for(ValidationTrigger::Import);
    assert!(context.should_use_bulk_validation());

    let row = GridRow::new().set("Amount", 5i64);
    evaluator
        .validate_row(0, &row, Some(context))
        .await
        .unwrap();

    assert_eq!(deferred.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn typing_on_unregistered_column_is_clean() {
    let evaluator = Evaluator::new();
    let context = evaluator.context_for(ValidationTrigger::OnTextChanged);

    let row = GridRow::new().set("Notes", "free text");
    let results = evaluator
        .validate_row(0, &row, Some(context))
        .await
        .unwrap();
    assert!(results.is_empty());

    let result = evaluator
        .validate_cell(0, "Notes", &CellValue::from("free text"), &row, None)
        .await
        .unwrap();
    assert!(result.is_valid);
}
