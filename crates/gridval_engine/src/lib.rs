//! # Grid Validation Engine
//!
//! Execution machinery for grid validation: the thread-safe
//! [`RuleRegistry`], the asynchronous cancellable [`Evaluator`],
//! lock-free [`ValidationStatistics`], and the criteria-driven row
//! deletion preview/execute flow.
//!
//! Rule definitions, results, and configuration live in `gridval_core`.
//!
//! ## Example
//!
//! ```rust
//! use gridval_core::{rules, CellValue, GridRow};
//! use gridval_engine::Evaluator;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gridval_core::Result<()> {
//! let evaluator = Evaluator::new();
//! evaluator
//!     .registry()
//!     .register(rules::range("Age", 0.0, 120.0).named("age-range"))?;
//!
//! let row = GridRow::new().set("Age", 150i64);
//! let result = evaluator
//!     .validate_cell(0, "Age", &CellValue::Int(150), &row, None)
//!     .await?;
//!
//! assert!(!result.is_valid);
//! # Ok(())
//! # }
//! ```

pub mod deletion;
pub mod evaluator;
pub mod registry;
pub mod stats;

pub use deletion::*;
pub use evaluator::*;
pub use registry::*;
pub use stats::*;
