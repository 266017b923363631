//! Validation statistics.
//!
//! Scalar counters are lock-free atomics so unbounded concurrent
//! validators can record outcomes without contention; the per-type and
//! per-severity maps sit behind a lock and are copied out on snapshot.
//! Counts are monotonic until an explicit [`reset`](ValidationStatistics::reset).

use chrono::{DateTime, Utc};
use gridval_core::{RuleType, Severity, ValidationResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Atomic counters describing every terminal validation outcome.
#[derive(Debug, Default)]
pub struct ValidationStatistics {
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    timeout: AtomicU64,
    total_micros: AtomicU64,
    by_type: RwLock<HashMap<RuleType, u64>>,
    by_severity: RwLock<HashMap<Severity, u64>>,
    last_run: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of the statistics.
///
/// Concurrent validators may be mid-flight while a snapshot is taken;
/// the scalar counters are each individually consistent but the set is
/// not guaranteed to describe a single instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    /// Terminal outcomes recorded
    pub total_count: u64,

    /// Valid outcomes
    pub success_count: u64,

    /// Invalid outcomes
    pub failure_count: u64,

    /// Outcomes that exceeded their time budget
    pub timeout_count: u64,

    /// Cumulative evaluation time
    pub total_time: Duration,

    /// `total_time / total_count`, zero when nothing was recorded
    pub average_time: Duration,

    /// Outcomes by rule type
    pub by_type: HashMap<RuleType, u64>,

    /// Failures by severity
    pub by_severity: HashMap<Severity, u64>,

    /// When the engine last recorded an outcome
    pub last_run: Option<DateTime<Utc>>,
}

impl ValidationStatistics {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one terminal validation outcome.
    pub fn record(&self, rule_type: RuleType, result: &ValidationResult) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.total_micros
            .fetch_add(result.elapsed.as_micros() as u64, Ordering::Relaxed);

        if result.is_valid {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
            *self
                .by_severity
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(result.severity)
                .or_insert(0) += 1;
        }

        if result.timed_out {
            self.timeout.fetch_add(1, Ordering::Relaxed);
        }

        *self
            .by_type
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(rule_type)
            .or_insert(0) += 1;

        *self.last_run.write().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }

    /// Takes a snapshot copy, computing the running average.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let total_count = self.total.load(Ordering::Relaxed);
        let total_time = Duration::from_micros(self.total_micros.load(Ordering::Relaxed));
        let average_time = if total_count == 0 {
            Duration::ZERO
        } else {
            total_time / total_count as u32
        };

        StatisticsSnapshot {
            total_count,
            success_count: self.success.load(Ordering::Relaxed),
            failure_count: self.failure.load(Ordering::Relaxed),
            timeout_count: self.timeout.load(Ordering::Relaxed),
            total_time,
            average_time,
            by_type: self
                .by_type
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            by_severity: self
                .by_severity
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            last_run: *self.last_run.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Zeroes every counter. Explicit operator action only.
    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.success.store(0, Ordering::Relaxed);
        self.failure.store(0, Ordering::Relaxed);
        self.timeout.store(0, Ordering::Relaxed);
        self.total_micros.store(0, Ordering::Relaxed);
        self.by_type
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.by_severity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.last_run.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
