//! Redis-backed asset store
//!
//! Each asset is a Redis hash stored at `{key_prefix}:{asset_id}` with the
//! fields `source_url`, `consumed` (`0`/`1`) and `fetched_at` (RFC 3339).
//! Scans walk the keyspace with `SCAN ... MATCH {key_prefix}:*`, and the
//! insert-if-absent and claim transitions run as Lua scripts so they are
//! atomic on the server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use std::collections::HashMap;
use stockpile_core::{AssetId, AssetRecord};
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::store::{AssetStore, ScanCursor, ScanPage};

/// Default key prefix marking asset records
pub const DEFAULT_KEY_PREFIX: &str = "gif";

/// Default `COUNT` hint passed to `SCAN`
pub const DEFAULT_SCAN_COUNT: usize = 100;

const FIELD_SOURCE_URL: &str = "source_url";
const FIELD_CONSUMED: &str = "consumed";
const FIELD_FETCHED_AT: &str = "fetched_at";

// KEYS[1] = asset key, ARGV[1] = source url, ARGV[2] = fetched_at
const INSERT_IF_ABSENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], 'source_url', ARGV[1], 'consumed', '0', 'fetched_at', ARGV[2])
return 1
"#;

// KEYS[1] = asset key
const CLAIM_IF_UNCONSUMED: &str = r#"
if redis.call('HGET', KEYS[1], 'consumed') == '0' then
    redis.call('HSET', KEYS[1], 'consumed', '1')
    return 1
end
return 0
"#;

// KEYS[1] = asset key
const MARK_IF_PRESENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'consumed', '1')
return 1
"#;

/// Redis store configuration
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// Key prefix for namespacing asset records
    pub key_prefix: String,

    /// `COUNT` hint for each `SCAN` call
    pub scan_count: usize,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}

impl RedisStoreConfig {
    /// Create new store configuration
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Default::default()
        }
    }

    /// Set key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the `SCAN` count hint (minimum 1)
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }
}

/// Asset store backed by Redis hashes
#[derive(Clone)]
pub struct RedisAssetStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
    insert_script: Script,
    claim_script: Script,
    mark_script: Script,
}

impl std::fmt::Debug for RedisAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisAssetStore")
            .field("redis_url", &mask_redis_url(&self.config.redis_url))
            .field("key_prefix", &self.config.key_prefix)
            .field("scan_count", &self.config.scan_count)
            .finish()
    }
}

impl RedisAssetStore {
    /// Connect to Redis and create a store
    pub async fn connect(config: RedisStoreConfig) -> DbResult<Self> {
        info!("Connecting to Redis at {}", mask_redis_url(&config.redis_url));

        let client = Client::open(config.redis_url.clone())
            .map_err(|e| DbError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DbError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        info!("Successfully connected to Redis");

        Ok(Self {
            connection,
            config,
            insert_script: Script::new(INSERT_IF_ABSENT),
            claim_script: Script::new(CLAIM_IF_UNCONSUMED),
            mark_script: Script::new(MARK_IF_PRESENT),
        })
    }

    /// Store configuration
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    /// Build the key for an asset record
    fn asset_key(&self, id: &AssetId) -> String {
        asset_key(&self.config.key_prefix, id)
    }

    /// Pattern matching every asset record
    fn match_pattern(&self) -> String {
        format!("{}:*", self.config.key_prefix)
    }
}

#[async_trait]
impl AssetStore for RedisAssetStore {
    async fn exists(&self, id: &AssetId) -> DbResult<bool> {
        let key = self.asset_key(id);
        let mut conn = self.connection.clone();

        let exists: bool = conn.exists(&key).await.map_err(|e| {
            warn!("EXISTS failed for key {}: {}", key, e);
            DbError::from(e)
        })?;
        Ok(exists)
    }

    async fn insert(&self, record: AssetRecord) -> DbResult<bool> {
        let key = self.asset_key(&record.id);
        let fetched_at = record.fetched_at.unwrap_or_else(Utc::now).to_rfc3339();
        let mut conn = self.connection.clone();

        let inserted: i64 = self
            .insert_script
            .key(&key)
            .arg(&record.source_url)
            .arg(fetched_at)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Insert failed for key {}: {}", key, e);
                DbError::from(e)
            })?;

        if inserted == 1 {
            debug!("Inserted asset record {}", key);
        } else {
            debug!("Asset record {} already present, left untouched", key);
        }
        Ok(inserted == 1)
    }

    async fn get(&self, id: &AssetId) -> DbResult<Option<AssetRecord>> {
        let key = self.asset_key(id);
        let mut conn = self.connection.clone();

        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_record(id.clone(), &fields).map(Some)
    }

    async fn scan(&self, cursor: ScanCursor) -> DbResult<ScanPage> {
        let mut conn = self.connection.clone();

        let command = scan_command(cursor, &self.match_pattern(), self.config.scan_count);
        let (next, keys): (u64, Vec<String>) =
            command.query_async(&mut conn).await.map_err(|e| {
                error!("SCAN failed at cursor {}: {}", cursor.0, e);
                DbError::from(e)
            })?;

        debug!("SCAN cursor {} -> {} ({} keys)", cursor.0, next, keys.len());

        let mut records = Vec::with_capacity(keys.len());
        if !keys.is_empty() {
            let mut pipe = redis::pipe();
            for key in &keys {
                pipe.hgetall(key);
            }
            let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

            for (key, fields) in keys.iter().zip(hashes) {
                // keys can disappear between SCAN and HGETALL
                if fields.is_empty() {
                    continue;
                }
                let Some(id) = id_from_key(&self.config.key_prefix, key) else {
                    warn!("Skipping key outside the asset namespace: {}", key);
                    continue;
                };
                match decode_record(id, &fields) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Skipping undecodable asset record {}: {}", key, e),
                }
            }
        }

        Ok(ScanPage {
            next: ScanCursor(next),
            records,
        })
    }

    async fn mark_consumed(&self, id: &AssetId) -> DbResult<()> {
        let key = self.asset_key(id);
        let mut conn = self.connection.clone();

        let marked: i64 = self
            .mark_script
            .key(&key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Mark consumed failed for key {}: {}", key, e);
                DbError::from(e)
            })?;

        if marked == 0 {
            return Err(DbError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn try_claim(&self, id: &AssetId) -> DbResult<bool> {
        let key = self.asset_key(id);
        let mut conn = self.connection.clone();

        let claimed: i64 = self
            .claim_script
            .key(&key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Claim failed for key {}: {}", key, e);
                DbError::from(e)
            })?;

        Ok(claimed == 1)
    }
}

/// `SCAN` restricted to hash keys; other types under the prefix are never
/// passed to `HGETALL` (requires Redis 6)
fn scan_command(cursor: ScanCursor, pattern: &str, count: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(cursor.0)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(count)
        .arg("TYPE")
        .arg("hash");
    cmd
}

/// Build the key for an asset record under a prefix
pub fn asset_key(prefix: &str, id: &AssetId) -> String {
    format!("{}:{}", prefix, id)
}

/// Recover the asset id from a namespaced key
fn id_from_key(prefix: &str, key: &str) -> Option<AssetId> {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|raw| AssetId::new(raw).ok())
}

/// Decode a hash into a record
fn decode_record(id: AssetId, fields: &HashMap<String, String>) -> DbResult<AssetRecord> {
    let source_url = fields
        .get(FIELD_SOURCE_URL)
        .filter(|url| !url.is_empty())
        .cloned()
        .ok_or_else(|| DbError::InvalidData(format!("Asset {} has no {}", id, FIELD_SOURCE_URL)))?;

    let consumed = match fields.get(FIELD_CONSUMED).map(String::as_str) {
        Some("0") => false,
        Some("1") => true,
        other => {
            return Err(DbError::InvalidData(format!(
                "Asset {} has invalid {} flag: {:?}",
                id, FIELD_CONSUMED, other
            )))
        }
    };

    let fetched_at = fields
        .get(FIELD_FETCHED_AT)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Ok(AssetRecord {
        id,
        source_url,
        consumed,
        fetched_at,
    })
}

/// Mask sensitive parts of Redis URL for logging
pub fn mask_redis_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else {
        // If parsing fails, just show the host part
        url.split('@')
            .last()
            .map(|s| format!("***@{}", s))
            .unwrap_or_else(|| "***".to_string())
    }
}
