//! Asset records and provider candidates
//!
//! An [`AssetRecord`] is the durable entry kept by the store. It is created
//! only from a [`CandidateRecord`] returned by the provider, and its only
//! mutation is the one-way `consumed` transition. A [`ClaimedAsset`] is what a
//! caller receives once a record has been claimed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::types::AssetId;

/// Candidate asset returned by the upstream search provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Provider-issued identifier
    pub id: AssetId,

    /// Direct-download location of the highest-fidelity variant
    pub source_url: String,
}

impl CandidateRecord {
    /// Create a candidate, validating the id and URL
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Result<Self> {
        let id = AssetId::new(id)?;
        let source_url = source_url.into();
        if source_url.trim().is_empty() {
            return Err(PoolError::InvalidSourceUrl(format!(
                "Source URL for asset {} cannot be empty",
                id
            )));
        }
        Ok(Self { id, source_url })
    }
}

/// Stored asset metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Provider-issued identifier
    pub id: AssetId,

    /// Direct-download location
    pub source_url: String,

    /// Whether the asset has already been handed to a caller
    #[serde(default)]
    pub consumed: bool,

    /// When the record was merged into the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl AssetRecord {
    /// Build a fresh, unconsumed record from a provider candidate
    pub fn from_candidate(candidate: CandidateRecord) -> Self {
        Self {
            id: candidate.id,
            source_url: candidate.source_url,
            consumed: false,
            fetched_at: Some(Utc::now()),
        }
    }

    /// Whether the record may still be claimed
    pub fn is_fresh(&self) -> bool {
        !self.consumed
    }
}

impl From<CandidateRecord> for AssetRecord {
    fn from(candidate: CandidateRecord) -> Self {
        Self::from_candidate(candidate)
    }
}

/// Asset handed to a caller after a successful claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedAsset {
    /// Identifier of the claimed asset
    pub id: AssetId,

    /// Where to download it from
    pub source_url: String,
}

impl From<AssetRecord> for ClaimedAsset {
    fn from(record: AssetRecord) -> Self {
        Self {
            id: record.id,
            source_url: record.source_url,
        }
    }
}
