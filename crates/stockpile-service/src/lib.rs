//! Service layer for Stockpile
//!
//! This crate sits between the asset store and the callers that need fresh
//! assets. It provides:
//!
//! - **ProviderClient**: the seam to the upstream search API, with
//!   [`GiphyClient`] as the HTTP implementation
//! - **FreshnessCache**: claims the next unconsumed asset and refills the pool
//!   through a primary and a fallback query when it runs dry
//! - **Downloader**: fetches a claimed asset to local storage
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stockpile_db::MemoryAssetStore;
//! use stockpile_service::{FreshnessCache, FreshnessConfig, GiphyClient, GiphyConfig, NextAsset};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryAssetStore::new());
//! let provider = Arc::new(GiphyClient::new(GiphyConfig::new("api-key"))?);
//! let cache = FreshnessCache::new(store, provider, FreshnessConfig::default())?;
//!
//! match cache.get_next("aesthetic anime").await? {
//!     NextAsset::Found(asset) => println!("{} -> {}", asset.id, asset.source_url),
//!     NextAsset::Exhausted => println!("nothing fresh right now"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod download;
pub mod error;
pub mod freshness;
pub mod giphy;
pub mod provider;

// Re-export main types for convenience
pub use download::{Downloader, HttpDownloader};
pub use error::{
    DownloadError, DownloadResult, ProviderError, ProviderResult, ServiceError, ServiceResult,
};
pub use freshness::{FreshnessCache, FreshnessConfig, MergeReport, NextAsset};
pub use giphy::{GiphyClient, GiphyConfig};
pub use provider::{FetchOutcome, ProviderClient};
