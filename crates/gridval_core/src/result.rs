//! Validation outcome types.
//!
//! This module defines the severity ordering, the immutable
//! [`ValidationResult`] value produced by every rule evaluation, and the
//! flattened [`ValidationError`] projection used for deletion criteria and
//! per-cell UI addressing.

use crate::CellValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ordered classification of a validation failure.
///
/// The numeric rank drives result combination: when several rules fail,
/// the failure with the highest severity wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding, data is still usable
    #[default]
    Info,
    /// Suspicious but tolerated
    Warning,
    /// Data-level failure
    Error,
    /// Failure that must block downstream processing
    Critical,
}

impl Severity {
    /// Numeric rank, higher is more severe.
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// The outcome of evaluating one rule (or one combined pass).
///
/// Invariant: a valid result carries no message, rule name, or location.
/// The constructors and builder methods below maintain this; there is no
/// way to attach failure metadata to a success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Whether the checked data passed
    pub is_valid: bool,

    /// Failure message, absent on success
    pub message: Option<String>,

    /// Severity of the failure; `Info` on success
    pub severity: Severity,

    /// Name of the rule that produced this result, absent on success
    pub rule_name: Option<String>,

    /// Row the failure is addressed to, absent on success
    pub row_index: Option<usize>,

    /// Column the failure is addressed to, absent on success
    pub column: Option<String>,

    /// Wall-clock time spent evaluating
    pub elapsed: Duration,

    /// True when evaluation exceeded the effective timeout budget
    pub timed_out: bool,

    /// The value that was checked, when the rule echoes it back
    pub value: Option<CellValue>,
}

impl ValidationResult {
    /// Creates a passing result.
    pub fn success() -> Self {
        Self {
            is_valid: true,
            message: None,
            severity: Severity::Info,
            rule_name: None,
            row_index: None,
            column: None,
            elapsed: Duration::ZERO,
            timed_out: false,
            value: None,
        }
    }

    /// Creates a failing result with a severity and message.
    pub fn failure(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            severity,
            rule_name: None,
            row_index: None,
            column: None,
            elapsed: Duration::ZERO,
            timed_out: false,
            value: None,
        }
    }

    /// Attaches the originating rule name. No-op on passing results.
    pub fn with_rule(mut self, name: impl Into<String>) -> Self {
        if !self.is_valid {
            self.rule_name = Some(name.into());
        }
        self
    }

    /// Addresses the result to a row and column. No-op on passing results.
    pub fn at(mut self, row_index: usize, column: impl Into<String>) -> Self {
        if !self.is_valid {
            self.row_index = Some(row_index);
            self.column = Some(column.into());
        }
        self
    }

    /// Addresses the result to a row only. No-op on passing results.
    pub fn at_row(mut self, row_index: usize) -> Self {
        if !self.is_valid {
            self.row_index = Some(row_index);
        }
        self
    }

    /// Records the elapsed evaluation time.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Marks the result as having exceeded its time budget.
    pub fn with_timeout(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }

    /// Echoes the checked value back to the caller.
    pub fn with_value(mut self, value: CellValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Combines multiple outcomes into one.
    ///
    /// The combination is valid iff every input is valid. Otherwise the
    /// failure with the numerically highest severity wins, ties broken by
    /// first encounter. Elapsed times are summed and timeout flags ORed
    /// in both cases. An empty input combines to success.
    pub fn combine(results: &[ValidationResult]) -> ValidationResult {
        let elapsed = results.iter().map(|r| r.elapsed).sum();
        let timed_out = results.iter().any(|r| r.timed_out);

        let worst = results
            .iter()
            .filter(|r| !r.is_valid)
            .reduce(|worst, r| if r.severity > worst.severity { r } else { worst });

        match worst {
            Some(failure) => failure.clone().with_elapsed(elapsed).with_timeout(timed_out),
            None => ValidationResult::success()
                .with_elapsed(elapsed)
                .with_timeout(timed_out),
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

/// A flattened, row/column-addressed projection of a failed
/// [`ValidationResult`].
///
/// Cross-row and dataset-wide rules cannot always attribute a row, so the
/// address fields stay optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Row the failure is addressed to
    pub row_index: Option<usize>,

    /// Column the failure is addressed to
    pub column: Option<String>,

    /// Name of the failing rule
    pub rule_name: Option<String>,

    /// Failure severity
    pub severity: Severity,

    /// Failure message
    pub message: String,
}

impl ValidationError {
    /// Projects a failed result into an addressable error.
    ///
    /// Returns `None` for valid results.
    pub fn from_result(result: &ValidationResult) -> Option<Self> {
        if result.is_valid {
            return None;
        }
        Some(Self {
            row_index: result.row_index,
            column: result.column.clone(),
            rule_name: result.rule_name.clone(),
            severity: result.severity,
            message: result.message.clone().unwrap_or_default(),
        })
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.row_index, &self.column) {
            (Some(row), Some(col)) => {
                write!(f, "[row {row}, {col}] {}: {}", self.severity, self.message)
            }
            (Some(row), None) => write!(f, "[row {row}] {}: {}", self.severity, self.message),
            _ => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_success_carries_no_failure_metadata() {
        let result = ValidationResult::success()
            .with_rule("ignored")
            .at(3, "ignored");

        assert!(result.is_valid);
        assert_eq!(result.message, None);
        assert_eq!(result.rule_name, None);
        assert_eq!(result.row_index, None);
        assert_eq!(result.column, None);
    }

    #[test]
    fn test_combine_all_valid() {
        let results = vec![
            ValidationResult::success().with_elapsed(Duration::from_millis(5)),
            ValidationResult::success().with_elapsed(Duration::from_millis(7)),
        ];

        let combined = ValidationResult::combine(&results);
        assert!(combined.is_valid);
        assert_eq!(combined.elapsed, Duration::from_millis(12));
    }

    #[test]
    fn test_combine_picks_highest_severity() {
        let results = vec![
            ValidationResult::failure(Severity::Warning, "low"),
            ValidationResult::failure(Severity::Critical, "high"),
            ValidationResult::failure(Severity::Error, "mid"),
        ];

        let combined = ValidationResult::combine(&results);
        assert!(!combined.is_valid);
        assert_eq!(combined.severity, Severity::Critical);
        assert_eq!(combined.message.as_deref(), Some("high"));
    }

    #[test]
    fn test_combine_tie_keeps_first_encountered() {
        let results = vec![
            ValidationResult::failure(Severity::Error, "first"),
            ValidationResult::failure(Severity::Error, "second"),
        ];

        let combined = ValidationResult::combine(&results);
        assert_eq!(combined.message.as_deref(), Some("first"));
    }

    #[test]
    fn test_combine_valid_iff_all_valid() {
        let mixed = vec![
            ValidationResult::success(),
            ValidationResult::failure(Severity::Info, "minor"),
        ];
        assert!(!ValidationResult::combine(&mixed).is_valid);
        assert!(ValidationResult::combine(&[]).is_valid);
    }

    #[test]
    fn test_combine_ors_timeout() {
        let results = vec![
            ValidationResult::success(),
            ValidationResult::success().with_timeout(true),
        ];
        assert!(ValidationResult::combine(&results).timed_out);
    }

    #[test]
    fn test_error_projection() {
        let result = ValidationResult::failure(Severity::Error, "out of range")
            .with_rule("age-range")
            .at(2, "Age");

        let error = ValidationError::from_result(&result).unwrap();
        assert_eq!(error.row_index, Some(2));
        assert_eq!(error.column.as_deref(), Some("Age"));
        assert_eq!(error.rule_name.as_deref(), Some("age-range"));
        assert_eq!(error.severity, Severity::Error);

        assert_eq!(ValidationError::from_result(&ValidationResult::success()), None);
    }
}
