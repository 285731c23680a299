//! Asset store trait abstraction
//!
//! This module defines the AssetStore trait that abstracts the durable
//! key-value state behind the freshness cache, allowing for different
//! implementations (Redis, in-memory, etc.).
//!
//! Implementations only provide primitive operations plus a cursor-based
//! [`AssetStore::scan`]. The predicate scans and the atomic claim are built
//! on top of those primitives as provided methods.

use async_trait::async_trait;
use std::collections::HashSet;
use stockpile_core::{AssetId, AssetRecord};
use tracing::{debug, warn};

use crate::error::DbResult;

/// Upper bound on pages visited by a single scan pass.
///
/// A pass normally ends when the cursor wraps back to [`ScanCursor::START`];
/// the bound only matters when inserts keep extending the keyspace faster
/// than the pass can walk it.
pub const MAX_SCAN_PAGES: usize = 10_000;

/// Resumable position within a store's keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScanCursor(pub u64);

impl ScanCursor {
    /// Sentinel that both starts and ends a scan pass
    pub const START: ScanCursor = ScanCursor(0);

    /// Whether this cursor is the start/end sentinel
    pub fn is_start(&self) -> bool {
        self.0 == 0
    }
}

/// One batch of records returned by [`AssetStore::scan`]
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Cursor to pass to the next call; [`ScanCursor::START`] ends the pass
    pub next: ScanCursor,

    /// Records found in this batch
    pub records: Vec<AssetRecord>,
}

impl ScanPage {
    /// Whether this page completes the pass
    pub fn is_last(&self) -> bool {
        self.next.is_start()
    }
}

/// Pool size counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Total records in the store
    pub total: usize,

    /// Records that have not been handed out yet
    pub unconsumed: usize,
}

impl PoolStats {
    /// Records that have already been handed out
    pub fn consumed(&self) -> usize {
        self.total - self.unconsumed
    }
}

/// Store trait for asset persistence operations
///
/// Implementations must be thread-safe (Send + Sync) for use in async contexts.
/// `insert` and `try_claim` must be atomic with respect to concurrent callers.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Check whether a record exists, regardless of its consumed state
    async fn exists(&self, id: &AssetId) -> DbResult<bool>;

    /// Insert a record as unconsumed if no record with its id exists
    ///
    /// # Returns
    /// * `Ok(true)` - The record was inserted
    /// * `Ok(false)` - A record with that id already existed and was left untouched
    /// * `Err(DbError)` - For store errors
    async fn insert(&self, record: AssetRecord) -> DbResult<bool>;

    /// Fetch a single record by id
    async fn get(&self, id: &AssetId) -> DbResult<Option<AssetRecord>>;

    /// Read one batch of records starting at `cursor`
    async fn scan(&self, cursor: ScanCursor) -> DbResult<ScanPage>;

    /// Mark a record consumed
    ///
    /// # Returns
    /// * `Ok(())` - The record is now consumed (idempotent)
    /// * `Err(DbError::NotFound)` - If no record with that id exists
    async fn mark_consumed(&self, id: &AssetId) -> DbResult<()>;

    /// Atomically transition a record from unconsumed to consumed
    ///
    /// # Returns
    /// * `Ok(true)` - This caller performed the transition
    /// * `Ok(false)` - The record is absent or was already consumed
    async fn try_claim(&self, id: &AssetId) -> DbResult<bool>;

    /// Find any one unconsumed record without claiming it
    async fn scan_unconsumed(&self) -> DbResult<Option<AssetRecord>> {
        let mut cursor = ScanCursor::START;

        for _ in 0..MAX_SCAN_PAGES {
            let page = self.scan(cursor).await?;
            let last = page.is_last();

            if let Some(record) = page.records.into_iter().find(AssetRecord::is_fresh) {
                return Ok(Some(record));
            }

            if last {
                return Ok(None);
            }
            cursor = page.next;
        }

        warn!("Scan pass hit the page limit ({}) without wrapping", MAX_SCAN_PAGES);
        Ok(None)
    }

    /// Find an unconsumed record and claim it in one step
    ///
    /// Candidates that another caller claims first are skipped, so two
    /// concurrent callers never receive the same record.
    async fn claim_unconsumed(&self) -> DbResult<Option<AssetRecord>> {
        let mut cursor = ScanCursor::START;

        for _ in 0..MAX_SCAN_PAGES {
            let page = self.scan(cursor).await?;
            let last = page.is_last();

            for mut record in page.records.into_iter().filter(AssetRecord::is_fresh) {
                if self.try_claim(&record.id).await? {
                    debug!(asset_id = %record.id, "Claimed asset");
                    record.consumed = true;
                    return Ok(Some(record));
                }
                debug!(asset_id = %record.id, "Lost claim race, continuing scan");
            }

            if last {
                return Ok(None);
            }
            cursor = page.next;
        }

        warn!("Claim scan hit the page limit ({}) without wrapping", MAX_SCAN_PAGES);
        Ok(None)
    }

    /// Count total and unconsumed records with a full scan pass
    ///
    /// A scan may return the same record more than once; each id is counted once.
    async fn stats(&self) -> DbResult<PoolStats> {
        let mut stats = PoolStats::default();
        let mut seen = HashSet::new();
        let mut cursor = ScanCursor::START;

        for _ in 0..MAX_SCAN_PAGES {
            let page = self.scan(cursor).await?;
            for record in &page.records {
                if !seen.insert(record.id.clone()) {
                    continue;
                }
                stats.total += 1;
                if record.is_fresh() {
                    stats.unconsumed += 1;
                }
            }

            if page.is_last() {
                break;
            }
            cursor = page.next;
        }

        Ok(stats)
    }
}
