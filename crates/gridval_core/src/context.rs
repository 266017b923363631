//! Per-operation validation context and scheduling decision.
//!
//! Every validation call derives its own context from current counts; the
//! bulk/real-time decision is a pure function of the context's fields and
//! is recomputed on every access, never cached or persisted.

use crate::{ValidationConfiguration, ValidationTrigger};
use std::sync::Arc;
use std::time::Duration;

/// Descriptor of one validation operation.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// The event that initiated this operation
    pub trigger: ValidationTrigger,

    /// Rows touched by the operation
    pub affected_row_count: usize,

    /// Columns touched by the operation
    pub affected_column_count: usize,

    /// True when rows arrived through an import
    pub is_import_operation: bool,

    /// True when rows arrived through a clipboard paste
    pub is_paste_operation: bool,

    /// True when the user is actively typing
    pub is_user_typing: bool,

    /// Time the caller can spend on this operation, when known
    pub available_time: Option<Duration>,

    /// Registered-rule count at the time the context was built
    pub rule_count: usize,

    /// The active configuration snapshot
    pub config: Arc<ValidationConfiguration>,
}

impl ValidationContext {
    /// Creates a context for a trigger against a configuration snapshot.
    pub fn new(trigger: ValidationTrigger, config: Arc<ValidationConfiguration>) -> Self {
        Self {
            trigger,
            affected_row_count: 1,
            affected_column_count: 1,
            is_import_operation: trigger == ValidationTrigger::Import,
            is_paste_operation: trigger == ValidationTrigger::Paste,
            is_user_typing: trigger == ValidationTrigger::OnTextChanged,
            available_time: None,
            rule_count: 0,
            config,
        }
    }

    /// Sets the affected row count.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.affected_row_count = rows;
        self
    }

    /// Sets the affected column count.
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.affected_column_count = columns;
        self
    }

    /// Flags the operation as an import.
    pub fn with_import(mut self, import: bool) -> Self {
        self.is_import_operation = import;
        self
    }

    /// Flags the operation as a paste.
    pub fn with_paste(mut self, paste: bool) -> Self {
        self.is_paste_operation = paste;
        self
    }

    /// Flags the operation as typing-driven.
    pub fn with_user_typing(mut self, typing: bool) -> Self {
        self.is_user_typing = typing;
        self
    }

    /// Sets the caller's available time budget.
    pub fn with_available_time(mut self, time: Duration) -> Self {
        self.available_time = Some(time);
        self
    }

    /// Records the rule-count snapshot.
    pub fn with_rule_count(mut self, count: usize) -> Self {
        self.rule_count = count;
        self
    }

    /// Whether this operation must take the comprehensive bulk path.
    ///
    /// First true wins: import, paste, row count over the real-time
    /// threshold, rule count over the real-time threshold, an explicit
    /// bulk trigger, or an available-time budget larger than the
    /// real-time budget.
    pub fn should_use_bulk_validation(&self) -> bool {
        self.is_import_operation
            || self.is_paste_operation
            || self.affected_row_count > self.config.real_time_max_rows
            || self.rule_count > self.config.real_time_max_rules
            || self.trigger == ValidationTrigger::Bulk
            || self
                .available_time
                .is_some_and(|time| time > self.config.real_time_max_duration)
    }

    /// Whether this operation qualifies for the cheap real-time path.
    ///
    /// The complement of the bulk decision, further restricted to
    /// typing-driven triggers and the real-time row/rule thresholds.
    pub fn should_use_real_time_validation(&self) -> bool {
        !self.should_use_bulk_validation()
            && (self.is_user_typing
                || matches!(
                    self.trigger,
                    ValidationTrigger::OnTextChanged | ValidationTrigger::OnCellChanged
                ))
            && self.affected_row_count <= self.config.real_time_max_rows
            && self.rule_count <= self.config.real_time_max_rules
    }
}
