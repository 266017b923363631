//! Composable rule groups.
//!
//! A [`RuleGroup`] is an owned tree of rules and sub-groups attached to a
//! column, combined with a logical operator. Groups are registered once,
//! atomically, and never mutated in place afterwards.

use crate::{
    CellValue, ColumnValidationPolicy, GridRow, Rule, RuleType, ValidationResult,
    DEFAULT_RULE_PRIORITY,
};
use serde::{Deserialize, Serialize};

/// Combinator applied across a group's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    /// Valid iff every child is valid
    #[default]
    And,
    /// Valid iff any child is valid
    Or,
}

/// A named tree of rules and sub-groups evaluated as one unit.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    /// Unique key; the registry generates one when absent
    pub name: Option<String>,

    /// The column this group is attached to
    pub column: String,

    /// Statistics tag recorded for the group's combined result
    pub rule_type: RuleType,

    /// Evaluation order among the column's groups, lower runs first
    pub priority: u32,

    /// Combinator across children
    pub operator: LogicalOperator,

    /// Direct child rules, evaluated in priority order
    pub rules: Vec<Rule>,

    /// Child groups, evaluated after the direct rules in priority order
    pub groups: Vec<RuleGroup>,
}

impl RuleGroup {
    /// Creates an empty AND group attached to `column`.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            name: None,
            column: column.into(),
            rule_type: RuleType::SingleCell,
            priority: DEFAULT_RULE_PRIORITY,
            operator: LogicalOperator::And,
            rules: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Sets the group name (unique registry key).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the combinator.
    pub fn with_operator(mut self, operator: LogicalOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Sets the evaluation priority (lower runs first).
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the statistics tag.
    pub fn with_rule_type(mut self, rule_type: RuleType) -> Self {
        self.rule_type = rule_type;
        self
    }

    /// Adds a child rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a child group.
    pub fn group(mut self, group: RuleGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Total number of rules in this group and all descendants.
    pub fn rule_count(&self) -> usize {
        self.rules.len() + self.groups.iter().map(RuleGroup::rule_count).sum::<usize>()
    }

    /// Evaluates the group against one cell.
    ///
    /// Children run in priority order, direct rules before sub-groups.
    /// The combinator decides the boolean value (AND latches false at the
    /// first failure, OR latches true at the first success); the stop
    /// policy alone decides whether evaluation continues. `ValidateAll`
    /// behaves as stop-on-first-error when `stop_all_on_first_error` is
    /// set.
    pub fn evaluate(
        &self,
        value: &CellValue,
        row: &GridRow,
        policy: ColumnValidationPolicy,
        stop_all_on_first_error: bool,
    ) -> ValidationResult {
        let mut results = Vec::new();

        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by_key(|r| r.priority);
        let mut groups: Vec<&RuleGroup> = self.groups.iter().collect();
        groups.sort_by_key(|g| g.priority);

        let mut stopped = false;
        for rule in rules {
            let result = rule.evaluate_cell(value, row);
            let stop = should_stop(&result, policy, stop_all_on_first_error);
            results.push(result);
            if stop {
                stopped = true;
                break;
            }
        }

        if !stopped {
            for group in groups {
                let result = group.evaluate(value, row, policy, stop_all_on_first_error);
                let stop = should_stop(&result, policy, stop_all_on_first_error);
                results.push(result);
                if stop {
                    break;
                }
            }
        }

        self.fold(results)
    }

    /// Combines executed child results per this group's operator.
    fn fold(&self, results: Vec<ValidationResult>) -> ValidationResult {
        let is_valid = match self.operator {
            LogicalOperator::And => results.iter().all(|r| r.is_valid),
            LogicalOperator::Or => results.is_empty() || results.iter().any(|r| r.is_valid),
        };

        if is_valid {
            let elapsed = results.iter().map(|r| r.elapsed).sum();
            let timed_out = results.iter().any(|r| r.timed_out);
            ValidationResult::success()
                .with_elapsed(elapsed)
                .with_timeout(timed_out)
        } else {
            // All operators agree on the failure to surface: the highest
            // severity among the failures, first encountered on ties.
            ValidationResult::combine(&results)
        }
    }
}

/// Shared stop-policy check, applied after each rule/group result.
pub fn should_stop(
    result: &ValidationResult,
    policy: ColumnValidationPolicy,
    stop_all_on_first_error: bool,
) -> bool {
    match policy {
        ColumnValidationPolicy::StopOnFirstError => !result.is_valid,
        ColumnValidationPolicy::StopOnFirstSuccess => result.is_valid,
        ColumnValidationPolicy::ValidateAll => stop_all_on_first_error && !result.is_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use pretty_assertions::assert_eq;

    fn equals(expected: &'static str) -> Rule {
        Rule::single_cell("Code", move |value, _| {
            if value.as_string() == Some(expected) {
                Ok(ValidationResult::success())
            } else {
                Ok(ValidationResult::failure(
                    Severity::Error,
                    format!("expected '{expected}'"),
                ))
            }
        })
    }

    #[test]
    fn test_or_group_valid_when_any_child_passes() {
        let group = RuleGroup::new("Code")
            .with_operator(LogicalOperator::Or)
            .rule(equals("A"))
            .rule(equals("B"));

        let row = GridRow::new().set("Code", "B");
        let result = group.evaluate(
            &CellValue::from("B"),
            &row,
            ColumnValidationPolicy::ValidateAll,
            false,
        );
        assert!(result.is_valid);
    }

    #[test]
    fn test_and_group_fails_when_any_child_fails() {
        let group = RuleGroup::new("Code")
            .rule(equals("A"))
            .rule(equals("B"));

        let row = GridRow::new().set("Code", "A");
        let result = group.evaluate(
            &CellValue::from("A"),
            &row,
            ColumnValidationPolicy::ValidateAll,
            false,
        );
        assert!(!result.is_valid);
    }

    #[test]
    fn test_stop_policy_halts_execution_not_value() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let executed = Arc::new(AtomicUsize::new(0));
        let counting_fail = |executed: Arc<AtomicUsize>| {
            Rule::single_cell("Code", move |_, _| {
                executed.fetch_add(1, Ordering::SeqCst);
                Ok(ValidationResult::failure(Severity::Error, "no"))
            })
        };

        let group = RuleGroup::new("Code")
            .rule(counting_fail(executed.clone()).with_priority(1))
            .rule(counting_fail(executed.clone()).with_priority(2))
            .rule(counting_fail(executed.clone()).with_priority(3));

        let row = GridRow::new();
        let result = group.evaluate(
            &CellValue::Null,
            &row,
            ColumnValidationPolicy::StopOnFirstError,
            false,
        );

        assert!(!result.is_valid);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validate_all_runs_every_child() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let executed = Arc::new(AtomicUsize::new(0));
        let make = |executed: Arc<AtomicUsize>, pass: bool| {
            Rule::single_cell("Code", move |_, _| {
                executed.fetch_add(1, Ordering::SeqCst);
                Ok(if pass {
                    ValidationResult::success()
                } else {
                    ValidationResult::failure(Severity::Error, "no")
                })
            })
        };

        let group = RuleGroup::new("Code")
            .with_operator(LogicalOperator::Or)
            .rule(make(executed.clone(), false))
            .rule(make(executed.clone(), true))
            .rule(make(executed.clone(), false));

        let result = group.evaluate(
            &CellValue::Null,
            &GridRow::new(),
            ColumnValidationPolicy::ValidateAll,
            false,
        );

        // OR latched true at the second child, but ValidateAll still ran
        // all three.
        assert!(result.is_valid);
        assert_eq!(executed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_nested_groups() {
        let inner = RuleGroup::new("Code")
            .with_operator(LogicalOperator::Or)
            .rule(equals("X"))
            .rule(equals("B"));
        let outer = RuleGroup::new("Code").rule(equals("B")).group(inner);

        let row = GridRow::new().set("Code", "B");
        let result = outer.evaluate(
            &CellValue::from("B"),
            &row,
            ColumnValidationPolicy::ValidateAll,
            false,
        );
        assert!(result.is_valid);
    }

    #[test]
    fn test_empty_group_is_valid() {
        let group = RuleGroup::new("Code");
        let result = group.evaluate(
            &CellValue::Null,
            &GridRow::new(),
            ColumnValidationPolicy::ValidateAll,
            false,
        );
        assert!(result.is_valid);
    }

    #[test]
    fn test_rule_count_recurses() {
        let group = RuleGroup::new("Code")
            .rule(equals("A"))
            .group(RuleGroup::new("Code").rule(equals("B")).rule(equals("C")));
        assert_eq!(group.rule_count(), 3);
    }
}
