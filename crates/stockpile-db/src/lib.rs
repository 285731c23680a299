//! Asset store layer for Stockpile
//!
//! This crate owns all durable state of the asset pool:
//! - The [`AssetStore`] trait: existence checks, insert-if-absent, cursor scans,
//!   the consumed transition and the atomic claim built on top of them
//! - [`RedisAssetStore`]: one Redis hash per asset, Lua scripts for atomic transitions
//! - [`MemoryAssetStore`]: an in-process implementation for tests and local runs
//!
//! # Example
//!
//! ```rust,no_run
//! use stockpile_db::{AssetStore, RedisAssetStore, RedisStoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RedisStoreConfig::new("redis://localhost:6379").with_key_prefix("gif");
//! let store = RedisAssetStore::connect(config).await?;
//!
//! if let Some(record) = store.claim_unconsumed().await? {
//!     println!("next asset: {} -> {}", record.id, record.source_url);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use stockpile_core;

// Public modules
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

// Re-exports for convenience
pub use error::{DbError, DbResult};
pub use memory::MemoryAssetStore;
pub use redis_store::{mask_redis_url, RedisAssetStore, RedisStoreConfig};
pub use store::{AssetStore, PoolStats, ScanCursor, ScanPage, MAX_SCAN_PAGES};

/// Store layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
