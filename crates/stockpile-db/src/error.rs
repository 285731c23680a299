//! Store-specific error types and conversions
//!
//! This module provides error types for asset store operations, including
//! connection errors, command errors, and data decoding errors.

use thiserror::Error;

/// Result type alias for store operations
pub type DbResult<T> = Result<T, DbError>;

/// Store-specific errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Connection to the backing store failed
    #[error("Store connection error: {0}")]
    Connection(String),

    /// Store command failed
    #[error("Store command error: {0}")]
    Command(String),

    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Stored data could not be decoded into a record
    #[error("Invalid data format: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Domain error from core crate
    #[error("Domain error: {0}")]
    Domain(#[from] stockpile_core::PoolError),
}

impl DbError {
    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    /// Check if this is a transient error that could be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Connection(_) | DbError::Command(_))
    }
}

/// Convert Redis errors to our error type
impl From<redis::RedisError> for DbError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            DbError::Connection(err.to_string())
        } else if err.is_timeout() {
            DbError::Connection(format!("Timed out: {}", err))
        } else {
            DbError::Command(err.to_string())
        }
    }
}
