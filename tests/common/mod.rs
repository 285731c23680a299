//! Common test utilities and helpers
//!
//! Shared scaffolding for the integration tests: a scripted provider that
//! records every call, and helpers for building a cache over the in-memory
//! store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stockpile_core::CandidateRecord;
use stockpile_db::MemoryAssetStore;
use stockpile_service::{
    FetchOutcome, FreshnessCache, FreshnessConfig, ProviderClient, ProviderError, ProviderResult,
};

pub mod fixtures;

/// Scripted reply for one query
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return these candidates
    Candidates(Vec<CandidateRecord>),
    /// Fail as if the provider were down
    Unavailable,
}

/// Provider that answers from a per-query script and records its calls
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `reply` from now on
    pub fn on(self, query: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(query.to_string(), reply);
        self
    }

    /// Replace the reply for `query`
    pub fn set(&self, query: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(query.to_string(), reply);
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn fetch(&self, query: &str, limit: usize) -> ProviderResult<FetchOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), limit));

        let reply = self.replies.lock().unwrap().get(query).cloned();
        match reply {
            Some(Reply::Candidates(candidates)) => Ok(FetchOutcome::ok(
                candidates.into_iter().take(limit).collect(),
            )),
            Some(Reply::Unavailable) => {
                Err(ProviderError::Unavailable("scripted outage".to_string()))
            }
            None => Ok(FetchOutcome::ok(vec![])),
        }
    }
}

/// Test harness: cache plus handles on its collaborators
pub struct TestPool {
    pub store: Arc<MemoryAssetStore>,
    pub provider: Arc<ScriptedProvider>,
    pub cache: FreshnessCache,
}

impl TestPool {
    pub fn new(provider: ScriptedProvider) -> Self {
        Self::with_store(MemoryAssetStore::new(), provider)
    }

    pub fn with_store(store: MemoryAssetStore, provider: ScriptedProvider) -> Self {
        let store = Arc::new(store);
        let provider = Arc::new(provider);
        let cache = FreshnessCache::new(
            store.clone(),
            provider.clone(),
            FreshnessConfig::default(),
        )
        .expect("default config is valid");

        Self {
            store,
            provider,
            cache,
        }
    }
}
