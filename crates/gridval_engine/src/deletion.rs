//! Validation-driven row deletion.
//!
//! A two-stage flow built on the evaluator: `preview_deletion` classifies
//! rows against a criteria without touching the dataset, and
//! `execute_deletion` reports the qualifying indices for the caller's row
//! storage to physically delete. The engine itself never deletes.

use crate::Evaluator;
use gridval_core::{
    GridDataset, GridRow, Result, Severity, ValidationResult, ValidationTrigger,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Caller-supplied predicate for custom-rule deletion.
pub type RowPredicate = Arc<dyn Fn(usize, &GridRow) -> bool + Send + Sync>;

/// How rows qualify for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionMode {
    /// Any invalid result at or above the criteria's minimum severity
    InvalidRows,
    /// Every produced result is valid
    ValidRows,
    /// Any invalid result whose severity is in the criteria's set
    BySeverity,
    /// Any invalid result produced by one of the named rules
    ByRuleName,
    /// The caller-supplied predicate decides; no validation runs
    ByCustomRule,
}

/// Criteria driving the deletion preview.
#[derive(Clone)]
pub struct DeletionCriteria {
    /// Qualification mode
    pub mode: DeletionMode,

    /// Severity floor for `InvalidRows`; unset means any invalid result
    pub minimum_severity: Option<Severity>,

    /// Severity set for `BySeverity`
    pub severities: Vec<Severity>,

    /// Rule names for `ByRuleName`
    pub rule_names: Vec<String>,

    /// Predicate for `ByCustomRule`
    pub custom: Option<RowPredicate>,
}

impl std::fmt::Debug for DeletionCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionCriteria")
            .field("mode", &self.mode)
            .field("minimum_severity", &self.minimum_severity)
            .field("severities", &self.severities)
            .field("rule_names", &self.rule_names)
            .field("custom", &self.custom.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl DeletionCriteria {
    /// Rows with any invalid result qualify.
    pub fn invalid_rows() -> Self {
        Self {
            mode: DeletionMode::InvalidRows,
            minimum_severity: None,
            severities: Vec::new(),
            rule_names: Vec::new(),
            custom: None,
        }
    }

    /// Rows with any invalid result at or above `severity` qualify.
    pub fn invalid_rows_at_least(severity: Severity) -> Self {
        Self {
            minimum_severity: Some(severity),
            ..Self::invalid_rows()
        }
    }

    /// Rows where every result is valid qualify.
    pub fn valid_rows() -> Self {
        Self {
            mode: DeletionMode::ValidRows,
            ..Self::invalid_rows()
        }
    }

    /// Rows failing with any of the given severities qualify.
    pub fn by_severity(severities: Vec<Severity>) -> Self {
        Self {
            mode: DeletionMode::BySeverity,
            severities,
            ..Self::invalid_rows()
        }
    }

    /// Rows failing any of the named rules qualify.
    pub fn by_rule_names(rule_names: Vec<String>) -> Self {
        Self {
            mode: DeletionMode::ByRuleName,
            rule_names,
            ..Self::invalid_rows()
        }
    }

    /// The predicate alone decides; validation is skipped.
    pub fn by_custom_rule(
        predicate: impl Fn(usize, &GridRow) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            mode: DeletionMode::ByCustomRule,
            custom: Some(Arc::new(predicate)),
            ..Self::invalid_rows()
        }
    }
}

/// Options for the execute stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionOptions {
    /// The caller must confirm before physically deleting
    pub require_confirmation: bool,

    /// Classify only, never mark as executed
    pub preview_only: bool,

    /// Batch size the caller should delete in
    pub batch_size: usize,

    /// Time budget the caller should spend deleting
    pub max_duration: Option<Duration>,
}

impl Default for DeletionOptions {
    fn default() -> Self {
        Self {
            require_confirmation: false,
            preview_only: true,
            batch_size: 1_000,
            max_duration: None,
        }
    }
}

/// Outcome of the execute stage.
///
/// The engine only classifies; `executed` means the caller is cleared to
/// physically delete the listed rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionOutcome {
    /// Qualifying row indices, in input order
    pub row_indices: Vec<usize>,

    /// True when the caller may delete without further interaction
    pub executed: bool,

    /// True when the caller must confirm first
    pub requires_confirmation: bool,
}

impl Evaluator {
    /// Classifies rows against the criteria without mutating the dataset.
    ///
    /// Returns the qualifying row indices in input order. Calling twice
    /// with identical input and criteria yields identical output.
    pub async fn preview_deletion(
        &self,
        dataset: &GridDataset,
        criteria: &DeletionCriteria,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<usize>> {
        let context = self
            .context_for(ValidationTrigger::Bulk)
            .with_rows(dataset.len());

        let mut matches = Vec::new();
        for (index, row) in dataset.rows().enumerate() {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(gridval_core::EngineError::Cancelled);
                }
            }

            let qualifies = if criteria.mode == DeletionMode::ByCustomRule {
                criteria
                    .custom
                    .as_ref()
                    .map(|predicate| predicate(index, row))
                    .unwrap_or(false)
            } else {
                let results = self.validate_row(index, row, Some(context.clone())).await?;
                row_qualifies(&results, criteria)
            };

            if qualifies {
                matches.push(index);
            }
        }

        debug!(
            mode = ?criteria.mode,
            matched = matches.len(),
            total = dataset.len(),
            "deletion preview finished"
        );
        Ok(matches)
    }

    /// Runs the preview and reports the result for the caller's row
    /// storage to act on.
    pub async fn execute_deletion(
        &self,
        dataset: &GridDataset,
        criteria: &DeletionCriteria,
        options: &DeletionOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<DeletionOutcome> {
        let row_indices = self.preview_deletion(dataset, criteria, cancel).await?;
        let requires_confirmation = options.require_confirmation && !options.preview_only;
        Ok(DeletionOutcome {
            row_indices,
            executed: !options.preview_only && !options.require_confirmation,
            requires_confirmation,
        })
    }
}

fn row_qualifies(results: &[ValidationResult], criteria: &DeletionCriteria) -> bool {
    match criteria.mode {
        DeletionMode::InvalidRows => results.iter().any(|r| {
            !r.is_valid
                && criteria
                    .minimum_severity
                    .is_none_or(|minimum| r.severity >= minimum)
        }),
        DeletionMode::ValidRows => results.iter().all(|r| r.is_valid),
        DeletionMode::BySeverity => results
            .iter()
            .any(|r| !r.is_valid && criteria.severities.contains(&r.severity)),
        DeletionMode::ByRuleName => results.iter().any(|r| {
            !r.is_valid
                && r.rule_name
                    .as_ref()
                    .is_some_and(|name| criteria.rule_names.contains(name))
        }),
        DeletionMode::ByCustomRule => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridval_core::{rules, CellValue};
    use pretty_assertions::assert_eq;

    fn evaluator_with_required_name() -> Evaluator {
        let evaluator = Evaluator::new();
        evaluator
            .registry()
            .register(rules::required("Name").named("name-req"))
            .unwrap();
        evaluator
    }

    fn three_rows_one_bad() -> GridDataset {
        GridDataset::from_rows(vec![
            GridRow::new().set("Name", CellValue::Null),
            GridRow::new().set("Name", "bob"),
            GridRow::new().set("Name", "carol"),
        ])
    }

    #[tokio::test]
    async fn test_invalid_rows_preview() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();

        let indices = evaluator
            .preview_deletion(&dataset, &DeletionCriteria::invalid_rows(), None)
            .await
            .unwrap();
        assert_eq!(indices, vec![0]);
    }

    #[tokio::test]
    async fn test_preview_is_pure_and_repeatable() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();
        let before = dataset.len();

        let first = evaluator
            .preview_deletion(&dataset, &DeletionCriteria::invalid_rows(), None)
            .await
            .unwrap();
        let second = evaluator
            .preview_deletion(&dataset, &DeletionCriteria::invalid_rows(), None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(dataset.len(), before);
        assert_eq!(dataset.get_row(0).unwrap().get("Name"), Some(&CellValue::Null));
    }

    #[tokio::test]
    async fn test_minimum_severity_filters_low_failures() {
        let evaluator = Evaluator::new();
        evaluator
            .registry()
            .register(
                rules::required("Name")
                    .named("name-soft")
                    .with_severity(Severity::Warning),
            )
            .unwrap();
        let dataset = three_rows_one_bad();

        let indices = evaluator
            .preview_deletion(
                &dataset,
                &DeletionCriteria::invalid_rows_at_least(Severity::Error),
                None,
            )
            .await
            .unwrap();
        assert!(indices.is_empty());

        let indices = evaluator
            .preview_deletion(&dataset, &DeletionCriteria::invalid_rows(), None)
            .await
            .unwrap();
        assert_eq!(indices, vec![0]);
    }

    #[tokio::test]
    async fn test_valid_rows_mode() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();

        let indices = evaluator
            .preview_deletion(&dataset, &DeletionCriteria::valid_rows(), None)
            .await
            .unwrap();
        assert_eq!(indices, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_by_severity_mode() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();

        let indices = evaluator
            .preview_deletion(
                &dataset,
                &DeletionCriteria::by_severity(vec![Severity::Error]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(indices, vec![0]);

        let indices = evaluator
            .preview_deletion(
                &dataset,
                &DeletionCriteria::by_severity(vec![Severity::Critical]),
                None,
            )
            .await
            .unwrap();
        assert!(indices.is_empty());
    }

    #[tokio::test]
    async fn test_by_rule_name_mode() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();

        let indices = evaluator
            .preview_deletion(
                &dataset,
                &DeletionCriteria::by_rule_names(vec!["name-req".into()]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(indices, vec![0]);

        let indices = evaluator
            .preview_deletion(
                &dataset,
                &DeletionCriteria::by_rule_names(vec!["other-rule".into()]),
                None,
            )
            .await
            .unwrap();
        assert!(indices.is_empty());
    }

    #[tokio::test]
    async fn test_custom_rule_skips_validation() {
        let evaluator = Evaluator::new();
        let dataset = three_rows_one_bad();

        let indices = evaluator
            .preview_deletion(
                &dataset,
                &DeletionCriteria::by_custom_rule(|index, _| index % 2 == 0),
                None,
            )
            .await
            .unwrap();
        assert_eq!(indices, vec![0, 2]);
        // No validation ran.
        assert_eq!(evaluator.statistics().total_count, 0);
    }

    #[tokio::test]
    async fn test_execute_preview_only() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();

        let outcome = evaluator
            .execute_deletion(
                &dataset,
                &DeletionCriteria::invalid_rows(),
                &DeletionOptions::default(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.row_indices, vec![0]);
        assert!(!outcome.executed);
    }

    #[tokio::test]
    async fn test_execute_with_confirmation_flow() {
        let evaluator = evaluator_with_required_name();
        let dataset = three_rows_one_bad();

        let options = DeletionOptions {
            preview_only: false,
            require_confirmation: true,
            ..DeletionOptions::default()
        };
        let outcome = evaluator
            .execute_deletion(&dataset, &DeletionCriteria::invalid_rows(), &options, None)
            .await
            .unwrap();
        assert!(!outcome.executed);
        assert!(outcome.requires_confirmation);

        let options = DeletionOptions {
            preview_only: false,
            require_confirmation: false,
            ..DeletionOptions::default()
        };
        let outcome = evaluator
            .execute_deletion(&dataset, &DeletionCriteria::invalid_rows(), &options, None)
            .await
            .unwrap();
        assert!(outcome.executed);
    }
}
