//! Error types for querysql.

use thiserror::Error;

/// The main error type for filter compilation and configuration.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Leaf references a field outside the configured whitelist.
    #[error("Field name is not in whitelist: {0}")]
    FieldNotAllowed(String),

    /// Operator received the wrong number of values.
    #[error("Operator '{operator}' expects {expected} value(s), got {got}")]
    ArityMismatch {
        operator: String,
        expected: usize,
        got: usize,
    },

    /// Operator is neither built in nor registered as a custom operation.
    #[error("Unknown operation: {0}")]
    UnknownOperator(String),

    /// Failure reported by a custom operation handler.
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Filter tree nests deeper than the caller allows.
    #[error("Filter nests {depth} levels deep, limit is {max}")]
    TooDeep { depth: usize, max: usize },

    /// Malformed filter JSON.
    #[error("Invalid filter JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    /// Create an arity mismatch error for `operator`.
    pub fn arity(operator: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ArityMismatch {
            operator: operator.into(),
            expected,
            got,
        }
    }

    /// Create a custom operation error.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }
}

/// Result type alias for querysql operations.
pub type FilterResult<T> = Result<T, FilterError>;
