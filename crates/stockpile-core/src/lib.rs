//! Core domain models and types for Stockpile
//!
//! This crate contains the data structures shared by the store, provider and
//! cache layers: asset identifiers, stored asset records, provider candidates
//! and the result of a successful claim.

pub mod asset;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use asset::{AssetRecord, CandidateRecord, ClaimedAsset};
pub use error::{PoolError, Result};
pub use types::{AssetId, ProviderStatus};
