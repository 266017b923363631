//! The validation evaluator.
//!
//! Walks applicable rules and groups for a cell, row, row collection, or
//! whole dataset, applying per-column stop policies and evaluation
//! strategies, converting rule faults into error results, and recording
//! statistics for every terminal outcome.
//!
//! All bulk operations are cooperatively cancellable through a
//! caller-supplied [`CancellationToken`], checked at row and phase
//! boundaries, never mid-rule. Long loops yield to the runtime
//! periodically so the host stays responsive.

use crate::{RuleRegistry, StatisticsSnapshot, ValidationStatistics};
use gridval_core::{
    group::should_stop, CellValue, ColumnValidationConfiguration, ColumnValidationPolicy,
    EngineError, EvaluationStrategy, GridDataset, GridRow, Result, Rule, RuleKind, RuleType,
    Severity, ValidationConfiguration, ValidationContext, ValidationResult, ValidationTrigger,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fractional progress callback for bulk operations.
pub type ProgressFn<'a> = dyn Fn(f64) + Send + Sync + 'a;

/// Bulk loops hand control back to the runtime at this granularity.
const YIELD_EVERY_ROWS: usize = 2048;

/// Asynchronous, cancellable rule evaluator over grid data.
///
/// The evaluator holds the rule registry, the statistics sink, and the
/// active configuration. The configuration is an immutable snapshot
/// swapped wholesale under a single write lock; reads clone the `Arc`
/// and never observe a half-updated value.
pub struct Evaluator {
    registry: Arc<RuleRegistry>,
    stats: Arc<ValidationStatistics>,
    config: RwLock<Arc<ValidationConfiguration>>,
    column_configs: RwLock<HashMap<String, ColumnValidationConfiguration>>,
}

impl Evaluator {
    /// Creates an evaluator with an empty registry and default
    /// configuration.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(RuleRegistry::new()))
    }

    /// Creates an evaluator over an existing registry.
    pub fn with_registry(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
            stats: Arc::new(ValidationStatistics::new()),
            config: RwLock::new(Arc::new(ValidationConfiguration::default())),
            column_configs: RwLock::new(HashMap::new()),
        }
    }

    /// The rule registry this evaluator reads.
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Snapshot of the statistics counters.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Zeroes the statistics counters.
    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// The active configuration snapshot.
    pub fn configuration(&self) -> Arc<ValidationConfiguration> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the configuration wholesale.
    pub fn update_configuration(&self, config: ValidationConfiguration) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Sets a per-column configuration override.
    pub fn set_column_configuration(
        &self,
        column: impl Into<String>,
        config: ColumnValidationConfiguration,
    ) -> Result<()> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(EngineError::configuration(
                "column configuration requires a column name",
            ));
        }
        self.column_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(column, config);
        Ok(())
    }

    /// The effective configuration for a column: the explicit override,
    /// or defaults derived from the global configuration.
    pub fn column_configuration(&self, column: &str) -> ColumnValidationConfiguration {
        self.column_configuration_with(&self.configuration(), column)
    }

    fn column_configuration_with(
        &self,
        config: &ValidationConfiguration,
        column: &str,
    ) -> ColumnValidationConfiguration {
        self.column_configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(column)
            .cloned()
            .unwrap_or_else(|| ColumnValidationConfiguration::derived_from(config))
    }

    /// Builds a context for a trigger from the current configuration and
    /// rule count. Every validation call re-derives its own context;
    /// nothing is persisted between calls.
    pub fn context_for(&self, trigger: ValidationTrigger) -> ValidationContext {
        ValidationContext::new(trigger, self.configuration())
            .with_rule_count(self.registry.rule_count())
    }

    /// Validates one cell.
    ///
    /// Rule groups attached to the column run first (in priority order,
    /// with the column's stop policy applied between groups) when group
    /// validation is permitted; otherwise the flat path runs single-cell
    /// rules, then conditional rules, then cross-column rules depending
    /// on this column. No matching rules means immediate success. All
    /// produced results combine into one, addressed to the cell.
    pub async fn validate_cell(
        &self,
        row_index: usize,
        column: &str,
        value: &CellValue,
        row: &GridRow,
        context: Option<&ValidationContext>,
    ) -> Result<ValidationResult> {
        let config = match context {
            Some(ctx) => ctx.config.clone(),
            None => self.configuration(),
        };
        if !config.enabled {
            return Ok(ValidationResult::success());
        }

        let col_cfg = self.column_configuration_with(&config, column);
        let timeout = col_cfg.effective_timeout(&config);
        let policy = effective_policy(&col_cfg);
        let groups = self.registry.groups_for_column(column);

        let results = if !groups.is_empty() && col_cfg.allow_rule_groups {
            let mut results = Vec::with_capacity(groups.len());
            for group in groups {
                let result = apply_timeout(
                    group.evaluate(value, row, policy, config.stop_all_on_first_error),
                    timeout,
                );
                self.stats.record(group.rule_type, &result);
                let stop = should_stop(&result, policy, config.stop_all_on_first_error);
                results.push(result);
                if stop {
                    break;
                }
            }
            results
        } else {
            let rules = flat_rules_for_cell(&self.registry, column);
            self.run_cell_rules(rules, value, row, &col_cfg, &config, timeout)
                .await
        };

        if results.is_empty() {
            return Ok(ValidationResult::success());
        }
        Ok(ValidationResult::combine(&results).at(row_index, column))
    }

    /// Validates one row.
    ///
    /// A typing-qualified context takes the real-time short path: only
    /// rules with priority at or below the configured cutoff and severity
    /// at or above `Error` run. Everything else takes the comprehensive
    /// column-by-column path, honoring the global stop-all override.
    pub async fn validate_row(
        &self,
        row_index: usize,
        row: &GridRow,
        context: Option<ValidationContext>,
    ) -> Result<Vec<ValidationResult>> {
        let config = self.configuration();
        if !config.enabled {
            return Ok(Vec::new());
        }
        let context = context.unwrap_or_else(|| self.context_for(config.default_trigger));

        if context.should_use_real_time_validation() {
            Ok(self.validate_row_realtime(row_index, row, &config))
        } else {
            Ok(self.validate_row_comprehensive(row_index, row, &config))
        }
    }

    /// Validates an ordered collection of rows.
    ///
    /// Rows are validated sequentially in input order (progress reported
    /// up to 0.8), then every cross-row rule runs across the full set
    /// (0.8 to 1.0). Cancellation is honored before each row and before
    /// the cross-row phase.
    pub async fn validate_rows(
        &self,
        rows: &[GridRow],
        context: Option<ValidationContext>,
        progress: Option<&ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<ValidationResult>> {
        let config = self.configuration();
        if !config.enabled {
            return Ok(Vec::new());
        }
        let context = context
            .unwrap_or_else(|| self.context_for(ValidationTrigger::Bulk).with_rows(rows.len()));

        debug!(rows = rows.len(), "starting row-collection validation");

        let mut results = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            check_cancelled(cancel)?;
            results.extend(self.validate_row(index, row, Some(context.clone())).await?);
            if let Some(report) = progress {
                report(0.8 * (index + 1) as f64 / rows.len().max(1) as f64);
            }
            if (index + 1) % YIELD_EVERY_ROWS == 0 {
                tokio::task::yield_now().await;
            }
        }

        check_cancelled(cancel)?;
        let cross_rules = self.registry.rules_of_type(RuleType::CrossRow);
        let total = cross_rules.len();
        for (index, rule) in cross_rules.iter().enumerate() {
            let rule_results = rule.evaluate_rows(rows);
            for result in &rule_results {
                self.stats.record(rule.rule_type, result);
            }
            results.extend(rule_results);
            if let Some(report) = progress {
                report(0.8 + 0.2 * (index + 1) as f64 / total as f64);
            }
        }
        if let Some(report) = progress {
            report(1.0);
        }

        Ok(results)
    }

    /// Validates a whole dataset in three phases: per-row and cross-row
    /// validation (0 to 0.7), `Complex` rules (0.7 to 0.9), and
    /// `Business` rules (0.9 to 1.0). Each dataset-scope rule runs once
    /// against the whole dataset and contributes one result.
    pub async fn validate_dataset(
        &self,
        dataset: &GridDataset,
        context: Option<ValidationContext>,
        progress: Option<&ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<ValidationResult>> {
        let config = self.configuration();
        if !config.enabled {
            return Ok(Vec::new());
        }
        let context = context.unwrap_or_else(|| {
            self.context_for(ValidationTrigger::Bulk)
                .with_rows(dataset.len())
        });

        let mut results = match progress {
            Some(report) => {
                let scaled = |fraction: f64| report(fraction * 0.7);
                self.validate_rows(dataset.as_slice(), Some(context), Some(&scaled), cancel)
                    .await?
            }
            None => {
                self.validate_rows(dataset.as_slice(), Some(context), None, cancel)
                    .await?
            }
        };

        let phases = [
            (0.7, 0.2, RuleType::Complex),
            (0.9, 0.1, RuleType::Business),
        ];
        for (phase_start, phase_width, rule_type) in phases {
            check_cancelled(cancel)?;
            let rules = self.registry.rules_of_type(rule_type);
            let total = rules.len();
            for (index, rule) in rules.iter().enumerate() {
                let result = rule.evaluate_dataset(dataset);
                self.stats.record(rule.rule_type, &result);
                results.push(result);
                if let Some(report) = progress {
                    report(phase_start + phase_width * (index + 1) as f64 / total as f64);
                }
            }
        }
        if let Some(report) = progress {
            report(1.0);
        }

        debug!(results = results.len(), "dataset validation finished");
        Ok(results)
    }

    /// Real-time short path: high-priority, high-severity rules only.
    fn validate_row_realtime(
        &self,
        row_index: usize,
        row: &GridRow,
        config: &ValidationConfiguration,
    ) -> Vec<ValidationResult> {
        let mut seen = HashSet::new();
        let mut rules: Vec<Arc<Rule>> = Vec::new();
        let mut columns: Vec<&str> = row.columns().collect();
        columns.sort_unstable();
        for column in columns {
            for rule in self.registry.rules_for_column(column) {
                let name = rule.name.clone().unwrap_or_default();
                if rule.priority <= config.real_time_priority_cutoff
                    && rule.severity >= Severity::Error
                    && seen.insert(name)
                {
                    rules.push(rule);
                }
            }
        }
        rules.sort_by_key(|rule| rule.priority);

        let mut results = Vec::new();
        for rule in rules {
            let result = rule.evaluate_row(row);
            self.stats.record(rule.rule_type, &result);
            let result = address_to_rule_column(result, row_index, &rule);
            let stop = config.stop_all_on_first_error && !result.is_valid;
            results.push(result);
            if stop {
                break;
            }
        }
        results
    }

    /// Comprehensive path: the per-column logic of `validate_cell` for
    /// every column present in the row. Columns with rule groups keep
    /// their group semantics; flattened group children never run
    /// standalone for a grouped column.
    fn validate_row_comprehensive(
        &self,
        row_index: usize,
        row: &GridRow,
        config: &ValidationConfiguration,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        let mut executed = HashSet::new();
        let mut columns: Vec<&str> = row.columns().collect();
        columns.sort_unstable();

        'columns: for column in columns {
            let col_cfg = self.column_configuration_with(config, column);
            let timeout = col_cfg.effective_timeout(config);
            let policy = effective_policy(&col_cfg);

            let groups = self.registry.groups_for_column(column);
            if !groups.is_empty() && col_cfg.allow_rule_groups {
                let value = row.get(column).cloned().unwrap_or(CellValue::Null);
                for group in groups {
                    let result = apply_timeout(
                        group.evaluate(&value, row, policy, config.stop_all_on_first_error),
                        timeout,
                    );
                    self.stats.record(group.rule_type, &result);
                    let result = result.at(row_index, column);
                    let stop_everything = config.stop_all_on_first_error && !result.is_valid;
                    let stop_column =
                        should_stop(&result, policy, config.stop_all_on_first_error);
                    results.push(result);
                    if stop_everything {
                        break 'columns;
                    }
                    if stop_column {
                        break;
                    }
                }
                continue;
            }

            for rule in flat_rules_for_cell(&self.registry, column) {
                // Multi-column rules surface once per row, not once per
                // participating column.
                if !executed.insert(rule.name.clone().unwrap_or_default()) {
                    continue;
                }
                let result = apply_timeout(rule.evaluate_row(row), timeout);
                self.stats.record(rule.rule_type, &result);
                let result = result.at(row_index, column);
                let stop_everything = config.stop_all_on_first_error && !result.is_valid;
                let stop_column = should_stop(&result, policy, config.stop_all_on_first_error);
                results.push(result);
                if stop_everything {
                    break 'columns;
                }
                if stop_column {
                    break;
                }
            }
        }
        results
    }

    /// Runs a column's flat rule list per the column's strategy.
    async fn run_cell_rules(
        &self,
        rules: Vec<Arc<Rule>>,
        value: &CellValue,
        row: &GridRow,
        col_cfg: &ColumnValidationConfiguration,
        config: &ValidationConfiguration,
        timeout: Duration,
    ) -> Vec<ValidationResult> {
        match col_cfg.strategy {
            EvaluationStrategy::Sequential => {
                self.run_cell_rules_sequential(rules, value, row, col_cfg.policy, config, timeout)
            }
            EvaluationStrategy::ShortCircuit => self.run_cell_rules_sequential(
                rules,
                value,
                row,
                ColumnValidationPolicy::StopOnFirstError,
                config,
                timeout,
            ),
            EvaluationStrategy::Parallel => {
                self.run_cell_rules_parallel(rules, value, row, config, timeout)
                    .await
            }
        }
    }

    fn run_cell_rules_sequential(
        &self,
        rules: Vec<Arc<Rule>>,
        value: &CellValue,
        row: &GridRow,
        policy: ColumnValidationPolicy,
        config: &ValidationConfiguration,
        timeout: Duration,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(rules.len());
        for rule in rules {
            let result = apply_timeout(rule.evaluate_cell(value, row), timeout);
            self.stats.record(rule.rule_type, &result);
            let stop = should_stop(&result, policy, config.stop_all_on_first_error);
            results.push(result);
            if stop {
                break;
            }
        }
        results
    }

    /// Runs every rule concurrently, capped by the configured concurrency
    /// limit. Stop policies do not apply mid-flight; results are
    /// re-ordered to the priority order for deterministic output.
    async fn run_cell_rules_parallel(
        &self,
        rules: Vec<Arc<Rule>>,
        value: &CellValue,
        row: &GridRow,
        config: &ValidationConfiguration,
        timeout: Duration,
    ) -> Vec<ValidationResult> {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_validations.max(1)));
        let mut join_set = JoinSet::new();

        for (index, rule) in rules.iter().enumerate() {
            let semaphore = semaphore.clone();
            let rule = rule.clone();
            let value = value.clone();
            let row = row.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, rule.rule_type, rule.evaluate_cell(&value, &row))
            });
        }

        let mut indexed = Vec::with_capacity(rules.len());
        while let Some(joined) = join_set.join_next().await {
            if let Ok((index, rule_type, result)) = joined {
                let result = apply_timeout(result, timeout);
                self.stats.record(rule_type, &result);
                indexed.push((index, result));
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// The flat rule list for a cell: single-cell rules first, then
/// conditional rules on this column, then cross-column rules whose
/// dependent set contains it. Each section keeps the registry's
/// ascending-priority order.
fn flat_rules_for_cell(registry: &RuleRegistry, column: &str) -> Vec<Arc<Rule>> {
    let indexed = registry.rules_for_column(column);
    let mut ordered = Vec::with_capacity(indexed.len());

    for rule in &indexed {
        if matches!(rule.kind, RuleKind::SingleCell { .. }) && rule.applies_to_column(column) {
            ordered.push(rule.clone());
        }
    }
    for rule in &indexed {
        if matches!(rule.kind, RuleKind::Conditional { .. }) && rule.applies_to_column(column) {
            ordered.push(rule.clone());
        }
    }
    for rule in &indexed {
        if matches!(rule.kind, RuleKind::CrossColumn { .. }) && rule.applies_to_column(column) {
            ordered.push(rule.clone());
        }
    }
    ordered
}

/// `ShortCircuit` forces stop-on-first-error regardless of policy.
fn effective_policy(col_cfg: &ColumnValidationConfiguration) -> ColumnValidationPolicy {
    if matches!(col_cfg.strategy, EvaluationStrategy::ShortCircuit) {
        ColumnValidationPolicy::StopOnFirstError
    } else {
        col_cfg.policy
    }
}

/// Flags a result that ran past its time budget. The engine never
/// preempts a stuck rule; the flag is applied after the fact.
fn apply_timeout(result: ValidationResult, timeout: Duration) -> ValidationResult {
    if result.elapsed > timeout {
        result.with_timeout(true)
    } else {
        result
    }
}

/// Addresses a failure to the rule's primary column, when it has one.
fn address_to_rule_column(
    result: ValidationResult,
    row_index: usize,
    rule: &Rule,
) -> ValidationResult {
    match rule.indexed_columns().first() {
        Some(column) => {
            let column = column.to_string();
            result.at(row_index, column)
        }
        None => result.at_row(row_index),
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(EngineError::Cancelled),
        _ => Ok(()),
    }
}
