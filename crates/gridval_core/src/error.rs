//! Error types for engine administration.
//!
//! Data-level validation failures are never errors; they travel as invalid
//! [`ValidationResult`](crate::ValidationResult)s. This enum covers the
//! code-level taxonomy: registration/argument mistakes, configuration
//! problems, and cancellation.

use thiserror::Error;

/// Result type for engine administration operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by registration, configuration, and evaluation control.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule or group was registered with an empty column binding
    #[error("Rule '{rule}' has an empty column name")]
    EmptyColumnName {
        /// Name of the offending rule or group
        rule: String,
    },

    /// A registration input was structurally invalid
    #[error("Rule registration failed: {0}")]
    Registration(String),

    /// A configuration value was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A pattern rule was built from an unparsable regex
    #[error("Invalid regex pattern for column '{column}': {error}")]
    InvalidRegex {
        /// Column the pattern rule was bound to
        column: String,
        /// The regex compiler's message
        error: String,
    },

    /// The caller's cancellation signal fired; re-raised, never counted as
    /// a validation failure
    #[error("Validation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Creates a registration error.
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration(message.into())
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Creates an empty-column-name error.
    pub fn empty_column(rule: impl Into<String>) -> Self {
        Self::EmptyColumnName { rule: rule.into() }
    }
}
