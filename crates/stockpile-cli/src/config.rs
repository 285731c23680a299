//! CLI configuration
//!
//! This module handles hierarchical configuration loading from multiple sources:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments (applied by `main`)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stockpile_db::RedisStoreConfig;
use stockpile_service::{FreshnessConfig, GiphyConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Redis store settings
    #[serde(default)]
    pub redis: RedisSettings,

    /// Search provider settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Pool refill policy
    #[serde(default)]
    pub pool: PoolSettings,

    /// Download settings
    #[serde(default)]
    pub download: DownloadSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redis store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Key prefix marking asset records
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// `SCAN` count hint
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    stockpile_db::redis_store::DEFAULT_KEY_PREFIX.to_string()
}

fn default_scan_count() -> usize {
    stockpile_db::redis_store::DEFAULT_SCAN_COUNT
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            scan_count: default_scan_count(),
        }
    }
}

/// Search provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Search endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API credential
    #[serde(default)]
    pub api_key: String,

    /// Content rating filter
    #[serde(default = "default_rating")]
    pub rating: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    stockpile_service::giphy::GIPHY_SEARCH_ENDPOINT.to_string()
}

fn default_rating() -> String {
    stockpile_service::giphy::DEFAULT_RATING.to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            rating: default_rating(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("rating", &self.rating)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Pool refill configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Query used for the first refill tier
    #[serde(default = "default_primary_query")]
    pub primary_query: String,

    /// Query used for the second refill tier
    #[serde(default = "default_fallback_query")]
    pub fallback_query: String,

    /// Batch size for the first tier
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Batch size for the second tier
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,
}

fn default_primary_query() -> String {
    "aesthetic anime".to_string()
}

fn default_fallback_query() -> String {
    stockpile_service::freshness::DEFAULT_FALLBACK_QUERY.to_string()
}

fn default_limit() -> usize {
    stockpile_service::freshness::DEFAULT_LIMIT
}

fn default_fallback_limit() -> usize {
    stockpile_service::freshness::DEFAULT_FALLBACK_LIMIT
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            primary_query: default_primary_query(),
            fallback_query: default_fallback_query(),
            default_limit: default_limit(),
            fallback_limit: default_fallback_limit(),
        }
    }
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Directory downloaded assets are written to
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,

    /// Per-download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub timeout_seconds: u64,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./media/gifs")
}

fn default_download_timeout() -> u64 {
    60
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            timeout_seconds: default_download_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include the emitting module in log lines
    #[serde(default = "default_include_target")]
    pub include_target: bool,
}

fn default_include_target() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_target: default_include_target(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml)
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (STOCKPILE__*)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, parsed or validated
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            // e.g., STOCKPILE__POOL__PRIMARY_QUERY="lofi"
            .add_source(
                Environment::with_prefix("STOCKPILE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "provider.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.download.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "download.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration with defaults if files don't exist
    pub fn load_or_default(config_dir: impl Into<PathBuf>, environment: &str) -> Self {
        Self::load(config_dir, environment).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load configuration: {}", e);
            eprintln!("Using default configuration");
            Self::default()
        })
    }

    /// Redis store configuration
    pub fn store_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::new(&self.redis.url)
            .with_key_prefix(&self.redis.key_prefix)
            .with_scan_count(self.redis.scan_count)
    }

    /// Provider client configuration
    pub fn provider_config(&self) -> GiphyConfig {
        GiphyConfig::new(&self.provider.api_key)
            .with_endpoint(&self.provider.endpoint)
            .with_rating(&self.provider.rating)
            .with_timeout(Duration::from_secs(self.provider.timeout_seconds))
    }

    /// Refill policy
    ///
    /// The cache-level budget is slightly larger than the HTTP timeout so the
    /// client reports its own timeout first.
    pub fn freshness_config(&self) -> FreshnessConfig {
        FreshnessConfig::new()
            .with_fallback_query(&self.pool.fallback_query)
            .with_default_limit(self.pool.default_limit)
            .with_fallback_limit(self.pool.fallback_limit)
            .with_provider_timeout(Duration::from_secs(self.provider.timeout_seconds + 5))
    }
}
