//! Service-layer error types
//!
//! This module defines error types specific to the service layer: the
//! provider condition that refill degrades on, the download failure returned
//! to callers, and the service error that wraps store failures.

use std::path::PathBuf;
use stockpile_core::PoolError;
use stockpile_db::DbError;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Result type alias for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type alias for downloads
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Conditions reported by a provider client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure, timeout, non-2xx response or unreadable body
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The request itself was malformed (empty query, zero limit)
    #[error("Invalid provider request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Whether the provider could not be reached or understood
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Unavailable(format!("request timed out: {}", err))
        } else if err.is_decode() {
            ProviderError::Unavailable(format!("undecodable response: {}", err))
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

/// Failure to fetch a claimed asset's bytes
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The source answered with a non-success status
    #[error("Download of {asset_id} failed with status {status}")]
    Failed { asset_id: String, status: u16 },

    /// The source could not be reached
    #[error("Download of {asset_id} failed: {message}")]
    Transport { asset_id: String, message: String },

    /// The bytes could not be written locally
    #[error("Failed to write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The downloader could not be set up
    #[error("Downloader configuration error: {0}")]
    Configuration(String),
}

impl DownloadError {
    /// HTTP status reported by the source, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadError::Failed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Service-layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Store failure
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// Provider failure surfaced by an explicit refill
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Whether the error is a missing-asset store error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Store(err) if err.is_not_found())
    }

    /// Whether the error came from the provider
    pub fn is_provider(&self) -> bool {
        matches!(self, ServiceError::Provider(_))
    }
}

impl From<PoolError> for ServiceError {
    fn from(err: PoolError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}
