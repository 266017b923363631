//! Engine and per-column configuration.
//!
//! [`ValidationConfiguration`] is an immutable value: the engine swaps the
//! whole snapshot under one write lock, so readers never observe a
//! half-updated configuration. [`ColumnValidationConfiguration`] overrides
//! the evaluation behavior for a single column and falls back to values
//! derived from the global configuration when absent.

use crate::LogicalOperator;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The event that initiated a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTrigger {
    /// The user is typing into a cell editor
    OnTextChanged,
    /// A cell editor lost focus
    OnCellExit,
    /// A cell value was committed
    OnCellChanged,
    /// Rows arrived through an import
    Import,
    /// Rows arrived through a clipboard paste
    Paste,
    /// An explicit full-dataset pass was requested
    Bulk,
}

/// Controls whether rule evaluation halts after a result.
///
/// Evaluated after each rule or group result; independent of the logical
/// combinator inside a rule group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnValidationPolicy {
    /// Stop as soon as a result is invalid
    StopOnFirstError,
    /// Stop as soon as a result is valid (for OR-composed acceptance)
    StopOnFirstSuccess,
    /// Run every rule; the global stop-all flag may still demote this to
    /// stop-on-first-error
    #[default]
    ValidateAll,
}

/// How a column's rule list is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// In priority order, honoring the stop policy
    #[default]
    Sequential,
    /// All rules concurrently; results re-ordered by priority
    Parallel,
    /// Sequential, but always stops at the first error
    ShortCircuit,
}

/// Process-wide validation tunables.
///
/// Replaced wholesale on update, never mutated field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfiguration {
    /// Master switch; a disabled engine validates nothing
    pub enabled: bool,

    /// Trigger assumed when the caller supplies no context
    pub default_trigger: ValidationTrigger,

    /// Time budget a single rule is expected to honor
    pub default_timeout: Duration,

    /// Concurrency cap for the parallel evaluation strategy
    pub max_concurrent_validations: usize,

    /// Demotes `ValidateAll` columns to stop-on-first-error
    pub stop_all_on_first_error: bool,

    /// Real-time validation is only attempted at or below this row count
    pub real_time_max_rows: usize,

    /// Real-time validation is only attempted at or below this rule count
    pub real_time_max_rules: usize,

    /// Elapsed-time budget for the real-time path
    pub real_time_max_duration: Duration,

    /// Real-time passes only run rules with priority at or below this
    /// cutoff
    pub real_time_priority_cutoff: u32,
}

impl Default for ValidationConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            default_trigger: ValidationTrigger::OnCellExit,
            default_timeout: Duration::from_secs(30),
            max_concurrent_validations: 4,
            stop_all_on_first_error: false,
            real_time_max_rows: 10,
            real_time_max_rules: 20,
            real_time_max_duration: Duration::from_millis(200),
            real_time_priority_cutoff: 100,
        }
    }
}

impl ValidationConfiguration {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the master switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the default trigger.
    pub fn with_default_trigger(mut self, trigger: ValidationTrigger) -> Self {
        self.default_trigger = trigger;
        self
    }

    /// Sets the default rule timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the parallel-strategy concurrency cap.
    pub fn with_max_concurrent_validations(mut self, max: usize) -> Self {
        self.max_concurrent_validations = max;
        self
    }

    /// Sets the global stop-all-on-first-error override.
    pub fn with_stop_all_on_first_error(mut self, stop: bool) -> Self {
        self.stop_all_on_first_error = stop;
        self
    }

    /// Sets the real-time row threshold.
    pub fn with_real_time_max_rows(mut self, rows: usize) -> Self {
        self.real_time_max_rows = rows;
        self
    }

    /// Sets the real-time rule threshold.
    pub fn with_real_time_max_rules(mut self, rules: usize) -> Self {
        self.real_time_max_rules = rules;
        self
    }

    /// Sets the real-time elapsed-time budget.
    pub fn with_real_time_max_duration(mut self, budget: Duration) -> Self {
        self.real_time_max_duration = budget;
        self
    }

    /// Sets the real-time priority cutoff.
    pub fn with_real_time_priority_cutoff(mut self, cutoff: u32) -> Self {
        self.real_time_priority_cutoff = cutoff;
        self
    }
}

/// Per-column override of the evaluation behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValidationConfiguration {
    /// Stop policy applied after each rule/group result
    pub policy: ColumnValidationPolicy,

    /// How the column's rule list is executed
    pub strategy: EvaluationStrategy,

    /// Combinator assumed for rule groups that do not set one
    pub default_operator: LogicalOperator,

    /// Column-specific timeout; falls back to the global default
    pub timeout: Option<Duration>,

    /// Whether rule groups participate for this column
    pub allow_rule_groups: bool,
}

impl Default for ColumnValidationConfiguration {
    fn default() -> Self {
        Self {
            policy: ColumnValidationPolicy::ValidateAll,
            strategy: EvaluationStrategy::Sequential,
            default_operator: LogicalOperator::And,
            timeout: None,
            allow_rule_groups: true,
        }
    }
}

impl ColumnValidationConfiguration {
    /// Creates the default column configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the fallback configuration for a column with no explicit
    /// override.
    pub fn derived_from(config: &ValidationConfiguration) -> Self {
        Self {
            timeout: Some(config.default_timeout),
            ..Self::default()
        }
    }

    /// Sets the stop policy.
    pub fn with_policy(mut self, policy: ColumnValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the evaluation strategy.
    pub fn with_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the default group combinator.
    pub fn with_default_operator(mut self, operator: LogicalOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Sets the column timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables rule groups for this column.
    pub fn with_allow_rule_groups(mut self, allow: bool) -> Self {
        self.allow_rule_groups = allow;
        self
    }

    /// The timeout to enforce, preferring the column override.
    pub fn effective_timeout(&self, config: &ValidationConfiguration) -> Duration {
        self.timeout.unwrap_or(config.default_timeout)
    }
}
