//! Freshness cache
//!
//! Serves the next unconsumed asset from the store, refilling the pool from
//! the provider when it runs dry. A miss triggers at most two refills: one
//! with the caller's query and the default batch size, then one with a
//! broader fallback query and a smaller batch. If neither produces an
//! unconsumed record the caller gets [`NextAsset::Exhausted`].
//!
//! Provider failures never abort a request. They are logged, counted as an
//! empty batch, and the chain moves on to the next tier.

use std::sync::Arc;
use std::time::Duration;
use stockpile_core::{AssetRecord, CandidateRecord, ClaimedAsset, ProviderStatus};
use stockpile_db::{AssetStore, PoolStats};
use tracing::{debug, info, instrument, warn};

use crate::error::{ProviderError, ServiceError, ServiceResult};
use crate::provider::ProviderClient;

/// Default fallback search term
pub const DEFAULT_FALLBACK_QUERY: &str = "trending";

/// Default batch size for the primary refill
pub const DEFAULT_LIMIT: usize = 25;

/// Default batch size for the fallback refill
pub const DEFAULT_FALLBACK_LIMIT: usize = 5;

/// Default budget for a single provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Refill policy
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    /// Broad query used once the primary query yields nothing fresh
    pub fallback_query: String,

    /// Batch size for the primary refill
    pub default_limit: usize,

    /// Batch size for the fallback refill
    pub fallback_limit: usize,

    /// Budget for each provider call
    pub provider_timeout: Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            fallback_query: DEFAULT_FALLBACK_QUERY.to_string(),
            default_limit: DEFAULT_LIMIT,
            fallback_limit: DEFAULT_FALLBACK_LIMIT,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl FreshnessConfig {
    /// Create the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback query
    pub fn with_fallback_query(mut self, query: impl Into<String>) -> Self {
        self.fallback_query = query.into();
        self
    }

    /// Set the primary batch size
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the fallback batch size
    pub fn with_fallback_limit(mut self, limit: usize) -> Self {
        self.fallback_limit = limit;
        self
    }

    /// Set the provider call budget
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Check the policy is usable
    pub fn validate(&self) -> ServiceResult<()> {
        if self.fallback_query.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Fallback query cannot be empty".to_string(),
            ));
        }
        if self.default_limit == 0 || self.fallback_limit == 0 {
            return Err(ServiceError::InvalidInput(
                "Refill limits must be at least 1".to_string(),
            ));
        }
        if self.provider_timeout.is_zero() {
            return Err(ServiceError::InvalidInput(
                "Provider timeout must be positive".to_string(),
            ));
        }
        if self.fallback_limit > self.default_limit {
            warn!(
                default_limit = self.default_limit,
                fallback_limit = self.fallback_limit,
                "Fallback batch is larger than the primary batch"
            );
        }
        Ok(())
    }
}

/// Outcome of [`FreshnessCache::get_next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAsset {
    /// A fresh asset, already marked consumed
    Found(ClaimedAsset),

    /// Neither refill tier produced an unconsumed asset
    Exhausted,
}

impl NextAsset {
    /// Whether both refill tiers came up empty
    pub fn is_exhausted(&self) -> bool {
        matches!(self, NextAsset::Exhausted)
    }

    /// The claimed asset, if any
    pub fn into_found(self) -> Option<ClaimedAsset> {
        match self {
            NextAsset::Found(asset) => Some(asset),
            NextAsset::Exhausted => None,
        }
    }
}

/// Summary of one refill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Query sent to the provider
    pub query: String,

    /// Status mirrored from the provider
    pub status: ProviderStatus,

    /// Candidates returned by the provider
    pub fetched: usize,

    /// Candidates that were new to the store
    pub inserted: usize,

    /// Candidates whose id was already present
    pub duplicates: usize,
}

/// Orchestrates claims and refills over an injected store and provider
#[derive(Clone)]
pub struct FreshnessCache {
    store: Arc<dyn AssetStore>,
    provider: Arc<dyn ProviderClient>,
    config: FreshnessConfig,
}

impl std::fmt::Debug for FreshnessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FreshnessCache {
    /// Create a cache, validating the refill policy
    pub fn new(
        store: Arc<dyn AssetStore>,
        provider: Arc<dyn ProviderClient>,
        config: FreshnessConfig,
    ) -> ServiceResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            provider,
            config,
        })
    }

    /// Refill policy in effect
    pub fn config(&self) -> &FreshnessConfig {
        &self.config
    }

    /// Claim the next unconsumed asset, refilling the pool if needed
    ///
    /// # Returns
    /// * `Ok(NextAsset::Found)` - A fresh asset, now marked consumed
    /// * `Ok(NextAsset::Exhausted)` - Both refill tiers produced nothing fresh
    /// * `Err(ServiceError)` - Empty query or a store failure
    #[instrument(skip(self))]
    pub async fn get_next(&self, primary_query: &str) -> ServiceResult<NextAsset> {
        if primary_query.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Primary query cannot be empty".to_string(),
            ));
        }

        if let Some(asset) = self.claim().await? {
            return Ok(NextAsset::Found(asset));
        }

        info!("Pool has no fresh assets, refilling with primary query");
        self.refill_tier(primary_query, self.config.default_limit).await?;
        if let Some(asset) = self.claim().await? {
            return Ok(NextAsset::Found(asset));
        }

        info!(
            fallback_query = %self.config.fallback_query,
            "Primary refill produced nothing fresh, refilling with fallback query"
        );
        self.refill_tier(&self.config.fallback_query, self.config.fallback_limit).await?;
        if let Some(asset) = self.claim().await? {
            return Ok(NextAsset::Found(asset));
        }

        warn!("Pool exhausted after both refill tiers");
        Ok(NextAsset::Exhausted)
    }

    /// Fetch a batch from the provider and merge the novel candidates
    ///
    /// Unlike the refills inside [`get_next`](Self::get_next), provider
    /// failures are returned to the caller.
    #[instrument(skip(self))]
    pub async fn refill(&self, query: &str, limit: usize) -> ServiceResult<MergeReport> {
        let call = self.provider.fetch(query, limit);
        let outcome = match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::Unavailable(format!(
                    "no response within {:?}",
                    self.config.provider_timeout
                ))
                .into())
            }
        };

        if !outcome.status.is_success() {
            warn!(status = outcome.status.code(), "Provider reported failure status");
        }

        let fetched = outcome.candidates.len();
        let (inserted, duplicates) = self.merge(outcome.candidates).await?;

        info!(fetched, inserted, duplicates, "Refill merged");

        Ok(MergeReport {
            query: query.to_string(),
            status: outcome.status,
            fetched,
            inserted,
            duplicates,
        })
    }

    /// Pool counters from the store
    pub async fn stats(&self) -> ServiceResult<PoolStats> {
        Ok(self.store.stats().await?)
    }

    /// One refill tier of `get_next`: provider failures count as an empty batch
    async fn refill_tier(&self, query: &str, limit: usize) -> ServiceResult<()> {
        match self.refill(query, limit).await {
            Ok(_) => Ok(()),
            Err(ServiceError::Provider(e)) => {
                warn!(query, error = %e, "Provider refill failed, treating as empty batch");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn claim(&self) -> ServiceResult<Option<ClaimedAsset>> {
        let claimed = self.store.claim_unconsumed().await?;
        if let Some(record) = &claimed {
            debug!(asset_id = %record.id, "Serving fresh asset");
        }
        Ok(claimed.map(ClaimedAsset::from))
    }

    async fn merge(&self, candidates: Vec<CandidateRecord>) -> ServiceResult<(usize, usize)> {
        let mut inserted = 0;
        let mut duplicates = 0;

        for candidate in candidates {
            if self.store.exists(&candidate.id).await? {
                duplicates += 1;
                continue;
            }
            // insert is itself insert-if-absent, so a racing refill cannot
            // overwrite a record claimed in between
            if self.store.insert(AssetRecord::from_candidate(candidate)).await? {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        Ok((inserted, duplicates))
    }
}
