//! Error types for cpt
//!
//! Provides a unified error type for all cpt operations.

use thiserror::Error;

/// Result type alias for cpt operations
pub type Result<T> = std::result::Result<T, CptError>;

/// Main error type for cpt operations
#[derive(Debug, Error)]
pub enum CptError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be established
    #[error("Unable to connect to database: {0}")]
    Connection(String),

    /// Database error with operation context
    #[error("Database error: {0}")]
    Database(String),

    /// Operator input rejected before any statement was issued
    #[error("{0}")]
    Validation(String),

    /// Unknown workflow state name or out-of-range state index
    #[error("Invalid state: {0}. Allowed states are: {1}")]
    InvalidState(String, String),

    /// Retention expression could not be parsed
    #[error("Invalid age value {0}. Use valid day(d), hours(h) or timestamp format")]
    AgeFormat(String),

    /// Every id of a cascading operation failed
    #[error("{0}")]
    Batch(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQL error
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl CptError {
    /// Shorthand for a validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<String> for CptError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<&str> for CptError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}
