//! Error types for the Stockpile domain

use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Main error type for domain validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Asset identifier was empty or malformed
    #[error("Invalid asset id: {0}")]
    InvalidAssetId(String),

    /// Source URL was empty or malformed
    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),
}
