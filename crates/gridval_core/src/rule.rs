//! Validation rules.
//!
//! A [`Rule`] is a unit of validation logic bound to a cell, row, or
//! dataset scope. The [`RuleKind`] union is closed: the evaluator's
//! dispatch is exhaustive, and adding a new capability is a compile-time
//! checked change.

use crate::{CellValue, GridDataset, GridRow, Severity, ValidationResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Priority assigned when a rule does not specify one. Lower runs first.
pub const DEFAULT_RULE_PRIORITY: u32 = 500;

/// Check over one cell value, with the owning row available for context.
pub type CellCheck =
    Arc<dyn Fn(&CellValue, &GridRow) -> anyhow::Result<ValidationResult> + Send + Sync>;

/// Check over one full row.
pub type RowCheck = Arc<dyn Fn(&GridRow) -> anyhow::Result<ValidationResult> + Send + Sync>;

/// Check over the ordered collection of rows; may produce many results.
pub type RowSetCheck =
    Arc<dyn Fn(&[GridRow]) -> anyhow::Result<Vec<ValidationResult>> + Send + Sync>;

/// Check over the whole dataset; produces one aggregate result.
pub type DatasetCheck =
    Arc<dyn Fn(&GridDataset) -> anyhow::Result<ValidationResult> + Send + Sync>;

/// Rule classification used as the statistics key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Bound to exactly one column, evaluates one value
    SingleCell,
    /// Bound to a set of dependent columns, evaluates a full row
    CrossColumn,
    /// Bound to a primary column, gates on other columns' values
    Conditional,
    /// Evaluates the ordered collection of rows
    CrossRow,
    /// Evaluates the whole dataset
    Complex,
    /// Business rule over the whole dataset
    Business,
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleType::SingleCell => "single_cell",
            RuleType::CrossColumn => "cross_column",
            RuleType::Conditional => "conditional",
            RuleType::CrossRow => "cross_row",
            RuleType::Complex => "complex",
            RuleType::Business => "business",
        };
        f.write_str(name)
    }
}

/// Capability variants of a rule.
#[derive(Clone)]
pub enum RuleKind {
    /// Evaluates one value of one column
    SingleCell {
        /// The owning column
        column: String,
        /// The check closure
        check: CellCheck,
    },
    /// Evaluates a full row against a set of dependent columns
    CrossColumn {
        /// Columns this rule depends on
        columns: Vec<String>,
        /// The check closure
        check: RowCheck,
    },
    /// Evaluates a full row, typically gating on another column's value
    Conditional {
        /// The primary column
        column: String,
        /// Columns the condition reads
        dependencies: Vec<String>,
        /// The check closure
        check: RowCheck,
    },
    /// Evaluates the entire ordered collection of rows
    CrossRow {
        /// The check closure
        check: RowSetCheck,
    },
    /// Evaluates the entire dataset
    Dataset {
        /// The check closure
        check: DatasetCheck,
    },
}

impl std::fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::SingleCell { column, .. } => {
                f.debug_struct("SingleCell").field("column", column).finish()
            }
            RuleKind::CrossColumn { columns, .. } => {
                f.debug_struct("CrossColumn").field("columns", columns).finish()
            }
            RuleKind::Conditional { column, dependencies, .. } => f
                .debug_struct("Conditional")
                .field("column", column)
                .field("dependencies", dependencies)
                .finish(),
            RuleKind::CrossRow { .. } => f.debug_struct("CrossRow").finish(),
            RuleKind::Dataset { .. } => f.debug_struct("Dataset").finish(),
        }
    }
}

/// A single validation rule.
///
/// Rules are created through the constructors below (or
/// [`RuleBuilder`](crate::RuleBuilder)) and handed to the registry, which
/// becomes their sole owner and assigns a generated name when none was
/// given.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique key; the registry generates one when absent
    pub name: Option<String>,

    /// Severity stamped onto failures this rule produces
    pub severity: Severity,

    /// Evaluation order, lower runs first
    pub priority: u32,

    /// Statistics tag
    pub rule_type: RuleType,

    /// The capability variant
    pub kind: RuleKind,
}

impl Rule {
    /// Creates a single-cell rule bound to `column`.
    pub fn single_cell(
        column: impl Into<String>,
        check: impl Fn(&CellValue, &GridRow) -> anyhow::Result<ValidationResult>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: None,
            severity: Severity::Error,
            priority: DEFAULT_RULE_PRIORITY,
            rule_type: RuleType::SingleCell,
            kind: RuleKind::SingleCell {
                column: column.into(),
                check: Arc::new(check),
            },
        }
    }

    /// Creates a cross-column rule over a set of dependent columns.
    pub fn cross_column(
        columns: Vec<String>,
        check: impl Fn(&GridRow) -> anyhow::Result<ValidationResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            severity: Severity::Error,
            priority: DEFAULT_RULE_PRIORITY,
            rule_type: RuleType::CrossColumn,
            kind: RuleKind::CrossColumn {
                columns,
                check: Arc::new(check),
            },
        }
    }

    /// Creates a conditional rule on a primary column with dependencies.
    pub fn conditional(
        column: impl Into<String>,
        dependencies: Vec<String>,
        check: impl Fn(&GridRow) -> anyhow::Result<ValidationResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            severity: Severity::Error,
            priority: DEFAULT_RULE_PRIORITY,
            rule_type: RuleType::Conditional,
            kind: RuleKind::Conditional {
                column: column.into(),
                dependencies,
                check: Arc::new(check),
            },
        }
    }

    /// Creates a cross-row rule over the ordered row collection.
    pub fn cross_row(
        check: impl Fn(&[GridRow]) -> anyhow::Result<Vec<ValidationResult>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            severity: Severity::Error,
            priority: DEFAULT_RULE_PRIORITY,
            rule_type: RuleType::CrossRow,
            kind: RuleKind::CrossRow {
                check: Arc::new(check),
            },
        }
    }

    /// Creates a dataset-wide rule tagged `Complex`.
    pub fn complex(
        check: impl Fn(&GridDataset) -> anyhow::Result<ValidationResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            severity: Severity::Error,
            priority: DEFAULT_RULE_PRIORITY,
            rule_type: RuleType::Complex,
            kind: RuleKind::Dataset {
                check: Arc::new(check),
            },
        }
    }

    /// Creates a dataset-wide rule tagged `Business`.
    pub fn business(
        check: impl Fn(&GridDataset) -> anyhow::Result<ValidationResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            severity: Severity::Error,
            priority: DEFAULT_RULE_PRIORITY,
            rule_type: RuleType::Business,
            kind: RuleKind::Dataset {
                check: Arc::new(check),
            },
        }
    }

    /// Sets the rule name (unique registry key).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the failure severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the evaluation priority (lower runs first).
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Columns this rule is indexed under in the registry.
    pub fn indexed_columns(&self) -> Vec<&str> {
        match &self.kind {
            RuleKind::SingleCell { column, .. } => vec![column.as_str()],
            RuleKind::CrossColumn { columns, .. } => {
                columns.iter().map(String::as_str).collect()
            }
            RuleKind::Conditional { column, dependencies, .. } => {
                let mut cols = vec![column.as_str()];
                cols.extend(dependencies.iter().map(String::as_str));
                cols
            }
            RuleKind::CrossRow { .. } | RuleKind::Dataset { .. } => Vec::new(),
        }
    }

    /// Whether this rule participates in validating `column`.
    pub fn applies_to_column(&self, column: &str) -> bool {
        match &self.kind {
            RuleKind::SingleCell { column: owned, .. } => owned == column,
            RuleKind::Conditional { column: owned, .. } => owned == column,
            RuleKind::CrossColumn { columns, .. } => columns.iter().any(|c| c == column),
            RuleKind::CrossRow { .. } | RuleKind::Dataset { .. } => false,
        }
    }

    /// Evaluates this rule against one cell value.
    ///
    /// Row- and dataset-scope rules are not applicable in cell scope and
    /// evaluate to success. A check closure returning `Err` is converted
    /// into an `Error`-severity failure carrying the fault text.
    pub fn evaluate_cell(&self, value: &CellValue, row: &GridRow) -> ValidationResult {
        let start = Instant::now();
        let outcome = match &self.kind {
            RuleKind::SingleCell { check, .. } => check(value, row),
            RuleKind::CrossColumn { check, .. } | RuleKind::Conditional { check, .. } => {
                check(row)
            }
            RuleKind::CrossRow { .. } | RuleKind::Dataset { .. } => {
                Ok(ValidationResult::success())
            }
        };
        self.finish(outcome, start)
    }

    /// Evaluates this rule against one full row.
    ///
    /// Single-cell rules look their column's value up in the row (missing
    /// cells evaluate as null).
    pub fn evaluate_row(&self, row: &GridRow) -> ValidationResult {
        let start = Instant::now();
        let outcome = match &self.kind {
            RuleKind::SingleCell { column, check } => {
                let value = row.get(column).cloned().unwrap_or(CellValue::Null);
                check(&value, row)
            }
            RuleKind::CrossColumn { check, .. } | RuleKind::Conditional { check, .. } => {
                check(row)
            }
            RuleKind::CrossRow { .. } | RuleKind::Dataset { .. } => {
                Ok(ValidationResult::success())
            }
        };
        self.finish(outcome, start)
    }

    /// Evaluates a cross-row rule against the ordered row collection.
    ///
    /// Non-cross-row rules produce no results here.
    pub fn evaluate_rows(&self, rows: &[GridRow]) -> Vec<ValidationResult> {
        let RuleKind::CrossRow { check } = &self.kind else {
            return Vec::new();
        };
        let start = Instant::now();
        match check(rows) {
            Ok(results) => results
                .into_iter()
                .map(|r| self.stamp(r).with_elapsed(start.elapsed()))
                .collect(),
            Err(fault) => vec![self.fault_result(fault, start)],
        }
    }

    /// Evaluates a dataset-wide rule.
    ///
    /// Non-dataset rules evaluate to success.
    pub fn evaluate_dataset(&self, dataset: &GridDataset) -> ValidationResult {
        let RuleKind::Dataset { check } = &self.kind else {
            return ValidationResult::success();
        };
        let start = Instant::now();
        self.finish(check(dataset), start)
    }

    fn finish(
        &self,
        outcome: anyhow::Result<ValidationResult>,
        start: Instant,
    ) -> ValidationResult {
        match outcome {
            Ok(result) => self.stamp(result).with_elapsed(start.elapsed()),
            Err(fault) => self.fault_result(fault, start),
        }
    }

    /// Applies the rule's severity and name to a failure.
    fn stamp(&self, mut result: ValidationResult) -> ValidationResult {
        if !result.is_valid {
            result.severity = self.severity;
            if result.rule_name.is_none() {
                result.rule_name = self.name.clone();
            }
        }
        result
    }

    fn fault_result(&self, fault: anyhow::Error, start: Instant) -> ValidationResult {
        let mut result = ValidationResult::failure(
            Severity::Error,
            format!("rule execution failed: {fault}"),
        )
        .with_elapsed(start.elapsed());
        result.rule_name = self.name.clone();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn require_positive(value: &CellValue, _row: &GridRow) -> anyhow::Result<ValidationResult> {
        match value.as_float() {
            Some(v) if v > 0.0 => Ok(ValidationResult::success()),
            _ => Ok(ValidationResult::failure(Severity::Error, "not positive")),
        }
    }

    #[test]
    fn test_single_cell_evaluation() {
        let rule = Rule::single_cell("Amount", require_positive).named("positive-amount");

        let row = GridRow::new().set("Amount", 10i64);
        let result = rule.evaluate_cell(&CellValue::Int(10), &row);
        assert!(result.is_valid);

        let result = rule.evaluate_cell(&CellValue::Int(-3), &row);
        assert!(!result.is_valid);
        assert_eq!(result.rule_name.as_deref(), Some("positive-amount"));
    }

    #[test]
    fn test_failure_takes_rule_severity() {
        let rule = Rule::single_cell("Amount", require_positive)
            .named("positive-amount")
            .with_severity(Severity::Critical);

        let row = GridRow::new();
        let result = rule.evaluate_cell(&CellValue::Int(-1), &row);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn test_row_evaluation_reads_missing_cell_as_null() {
        let rule = Rule::single_cell("Amount", require_positive);
        let result = rule.evaluate_row(&GridRow::new());
        assert!(!result.is_valid);
    }

    #[test]
    fn test_fault_becomes_error_result() {
        let rule = Rule::single_cell("Amount", |_, _| anyhow::bail!("backing store offline"))
            .named("flaky")
            .with_severity(Severity::Info);

        let result = rule.evaluate_cell(&CellValue::Int(1), &GridRow::new());
        assert!(!result.is_valid);
        assert_eq!(result.severity, Severity::Error);
        assert!(result.message.as_deref().unwrap().contains("backing store offline"));
        assert_eq!(result.rule_name.as_deref(), Some("flaky"));
    }

    #[test]
    fn test_indexed_columns() {
        let rule = Rule::cross_column(vec!["A".into(), "B".into()], |_| {
            Ok(ValidationResult::success())
        });
        assert_eq!(rule.indexed_columns(), vec!["A", "B"]);
        assert!(rule.applies_to_column("A"));
        assert!(!rule.applies_to_column("C"));

        let rule = Rule::conditional("A", vec!["B".into()], |_| Ok(ValidationResult::success()));
        assert_eq!(rule.indexed_columns(), vec!["A", "B"]);
        assert!(rule.applies_to_column("A"));
        assert!(!rule.applies_to_column("B"));
    }

    #[test]
    fn test_dataset_rule_tags() {
        let complex = Rule::complex(|_| Ok(ValidationResult::success()));
        let business = Rule::business(|_| Ok(ValidationResult::success()));
        assert_eq!(complex.rule_type, RuleType::Complex);
        assert_eq!(business.rule_type, RuleType::Business);
    }
}
