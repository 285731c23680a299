//! Provider client abstraction
//!
//! A provider turns a search term into a batch of candidate assets. It holds
//! no state; the freshness cache decides what to do with the candidates.

use async_trait::async_trait;
use stockpile_core::{CandidateRecord, ProviderStatus};

use crate::error::{ProviderError, ProviderResult};

/// Result of one provider search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Candidates in provider rank order, at most `limit` of them
    pub candidates: Vec<CandidateRecord>,

    /// Status mirrored from the provider response
    pub status: ProviderStatus,
}

impl FetchOutcome {
    /// Outcome carrying candidates and a success status
    pub fn ok(candidates: Vec<CandidateRecord>) -> Self {
        Self {
            candidates,
            status: ProviderStatus::OK,
        }
    }

    /// Outcome for a non-success status: no candidates
    pub fn empty(status: ProviderStatus) -> Self {
        Self {
            candidates: Vec::new(),
            status,
        }
    }
}

/// Trait for upstream search providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Search for up to `limit` candidates matching `query`
    ///
    /// # Returns
    /// * `Ok(FetchOutcome)` - Candidates and the provider status; a non-success
    ///   status comes back with an empty candidate list
    /// * `Err(ProviderError::Unavailable)` - Transport failure or timeout
    /// * `Err(ProviderError::InvalidRequest)` - Empty query or zero limit
    async fn fetch(&self, query: &str, limit: usize) -> ProviderResult<FetchOutcome>;
}

/// Reject requests no provider can serve
pub fn validate_request(query: &str, limit: usize) -> ProviderResult<()> {
    if query.trim().is_empty() {
        return Err(ProviderError::InvalidRequest(
            "Search query cannot be empty".to_string(),
        ));
    }
    if limit == 0 {
        return Err(ProviderError::InvalidRequest(
            "Limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}
