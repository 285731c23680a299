//! In-process asset store
//!
//! Records live in an insertion-ordered map behind a single async mutex, so
//! every transition is atomic. The scan cursor is a position in insertion
//! order; records are never deleted, which keeps positions stable while
//! refills append to the end.

use async_trait::async_trait;
use std::collections::HashMap;
use stockpile_core::{AssetId, AssetRecord};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::store::{AssetStore, ScanCursor, ScanPage};

/// Default number of records returned per scan page
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Default)]
struct Inner {
    order: Vec<AssetId>,
    records: HashMap<AssetId, AssetRecord>,
}

/// Asset store kept entirely in memory
#[derive(Debug)]
pub struct MemoryAssetStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAssetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the scan page size (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of records held
    pub async fn len(&self) -> usize {
        self.inner.lock().await.order.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn exists(&self, id: &AssetId) -> DbResult<bool> {
        Ok(self.inner.lock().await.records.contains_key(id))
    }

    async fn insert(&self, record: AssetRecord) -> DbResult<bool> {
        let mut inner = self.inner.lock().await;

        if inner.records.contains_key(&record.id) {
            debug!(asset_id = %record.id, "Skipping insert of existing asset");
            return Ok(false);
        }

        let record = AssetRecord {
            consumed: false,
            ..record
        };
        inner.order.push(record.id.clone());
        inner.records.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn get(&self, id: &AssetId) -> DbResult<Option<AssetRecord>> {
        Ok(self.inner.lock().await.records.get(id).cloned())
    }

    async fn scan(&self, cursor: ScanCursor) -> DbResult<ScanPage> {
        let inner = self.inner.lock().await;

        let start = usize::try_from(cursor.0)
            .map_err(|_| DbError::InvalidData(format!("Cursor out of range: {}", cursor.0)))?;
        let len = inner.order.len();
        if start > len {
            return Err(DbError::InvalidData(format!(
                "Cursor {} beyond end of store ({} records)",
                start, len
            )));
        }

        let end = (start + self.page_size).min(len);
        let records = inner.order[start..end]
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect();

        let next = if end >= len {
            ScanCursor::START
        } else {
            ScanCursor(end as u64)
        };

        Ok(ScanPage { next, records })
    }

    async fn mark_consumed(&self, id: &AssetId) -> DbResult<()> {
        let mut inner = self.inner.lock().await;

        match inner.records.get_mut(id) {
            Some(record) => {
                record.consumed = true;
                Ok(())
            }
            None => Err(DbError::NotFound(id.to_string())),
        }
    }

    async fn try_claim(&self, id: &AssetId) -> DbResult<bool> {
        let mut inner = self.inner.lock().await;

        match inner.records.get_mut(id) {
            Some(record) if !record.consumed => {
                record.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use stockpile_core::CandidateRecord;

    fn record(id: &str) -> AssetRecord {
        AssetRecord::from_candidate(
            CandidateRecord::new(id, format!("https://media.example/{}.gif", id)).unwrap(),
        )
    }

    fn id(raw: &str) -> AssetId {
        AssetId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = MemoryAssetStore::new();

        assert!(store.insert(record("g1")).await.unwrap());
        assert!(!store.insert(record("g1")).await.unwrap());
        assert_eq!(store.len().await, 1);
        assert!(store.exists(&id("g1")).await.unwrap());
        assert!(!store.exists(&id("g2")).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_never_resurrects_consumed() {
        let store = MemoryAssetStore::new();
        store.insert(record("g1")).await.unwrap();
        store.mark_consumed(&id("g1")).await.unwrap();

        assert!(!store.insert(record("g1")).await.unwrap());

        let stored = store.get(&id("g1")).await.unwrap().unwrap();
        assert!(stored.consumed);
    }

    #[tokio::test]
    async fn test_insert_forces_unconsumed() {
        let store = MemoryAssetStore::new();
        let mut incoming = record("g1");
        incoming.consumed = true;

        store.insert(incoming).await.unwrap();
        assert!(store.get(&id("g1")).await.unwrap().unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_mark_consumed_missing_is_not_found() {
        let store = MemoryAssetStore::new();
        let err = store.mark_consumed(&id("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_scan_pages_wrap_to_start() {
        let store = MemoryAssetStore::new().with_page_size(2);
        for i in 0..5 {
            store.insert(record(&format!("g{}", i))).await.unwrap();
        }

        let mut cursor = ScanCursor::START;
        let mut seen = Vec::new();
        let mut pages = 0;
        loop {
            let page = store.scan(cursor).await.unwrap();
            pages += 1;
            seen.extend(page.records.iter().map(|r| r.id.to_string()));
            if page.is_last() {
                break;
            }
            cursor = page.next;
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, vec!["g0", "g1", "g2", "g3", "g4"]);
    }

    #[tokio::test]
    async fn test_scan_empty_store_ends_immediately() {
        let store = MemoryAssetStore::new();
        let page = store.scan(ScanCursor::START).await.unwrap();
        assert!(page.is_last());
        assert!(page.records.is_empty());
        assert!(store.scan_unconsumed().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_unconsumed_skips_consumed() {
        let store = MemoryAssetStore::new().with_page_size(1);
        store.insert(record("g1")).await.unwrap();
        store.insert(record("g2")).await.unwrap();
        store.mark_consumed(&id("g1")).await.unwrap();

        let found = store.scan_unconsumed().await.unwrap().unwrap();
        assert_eq!(found.id, id("g2"));
        // scanning does not claim
        assert!(store.get(&id("g2")).await.unwrap().unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_try_claim_only_once() {
        let store = MemoryAssetStore::new();
        store.insert(record("g1")).await.unwrap();

        assert!(store.try_claim(&id("g1")).await.unwrap());
        assert!(!store.try_claim(&id("g1")).await.unwrap());
        assert!(!store.try_claim(&id("missing")).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_unconsumed_drains_store() {
        let store = MemoryAssetStore::new().with_page_size(2);
        for i in 0..3 {
            store.insert(record(&format!("g{}", i))).await.unwrap();
        }

        let mut claimed = HashSet::new();
        while let Some(record) = store.claim_unconsumed().await.unwrap() {
            assert!(record.consumed);
            assert!(claimed.insert(record.id));
        }

        assert_eq!(claimed.len(), 3);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unconsumed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_never_share_a_record() {
        let store = Arc::new(MemoryAssetStore::new().with_page_size(3));
        for i in 0..20 {
            store.insert(record(&format!("g{}", i))).await.unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut mine = Vec::new();
                    while let Some(record) = store.claim_unconsumed().await.unwrap() {
                        mine.push(record.id);
                    }
                    mine
                })
            })
            .collect();

        let mut all = Vec::new();
        for result in futures::future::join_all(handles).await {
            all.extend(result.unwrap());
        }

        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 20);
        assert_eq!(unique.len(), 20);
    }

    #[tokio::test]
    async fn test_scan_rejects_cursor_past_end() {
        let store = MemoryAssetStore::new();
        store.insert(record("g1")).await.unwrap();
        assert!(store.scan(ScanCursor(5)).await.is_err());
    }
}
