//! # Grid Validation Core
//!
//! Core rule language and value types for the Grid Validation Engine.
//! This crate provides everything needed to *describe* validation:
//!
//! - Cell values, rows, and datasets ([`CellValue`], [`GridRow`],
//!   [`GridDataset`])
//! - Rules across five capability scopes ([`Rule`], [`RuleKind`]) and
//!   composable AND/OR rule groups ([`RuleGroup`])
//! - Built-in rule constructors ([`rules`])
//! - Result and severity types with the combination rule
//!   ([`ValidationResult`], [`Severity`])
//! - Engine and per-column configuration plus the real-time/bulk
//!   scheduling decision ([`ValidationConfiguration`],
//!   [`ValidationContext`])
//!
//! The machinery that *executes* rules (registry, evaluator, statistics,
//! deletion) lives in the `gridval_engine` crate.
//!
//! ## Example
//!
//! ```rust
//! use gridval_core::{rules, CellValue, GridRow, Severity};
//!
//! let rule = rules::range("Age", 0.0, 120.0).named("age-range");
//!
//! let row = GridRow::new().set("Age", 150i64);
//! let result = rule.evaluate_cell(&CellValue::Int(150), &row);
//!
//! assert!(!result.is_valid);
//! assert_eq!(result.severity, Severity::Error);
//! ```

pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod group;
pub mod result;
pub mod rule;
pub mod rules;

pub use config::*;
pub use context::*;
pub use dataset::*;
pub use error::*;
pub use group::*;
pub use result::*;
pub use rule::*;
