//! Stockpile CLI
//!
//! Main entry point for working with the asset pool: claim (and download) the
//! next fresh asset, pre-warm the pool with a refill, or inspect its counters.

mod config;
mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use stockpile_db::{mask_redis_url, AssetStore, RedisAssetStore};
use stockpile_service::{
    Downloader, FreshnessCache, GiphyClient, HttpDownloader, NextAsset, ProviderClient,
};
use tracing::{error, info};

use config::AppConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Redis URL
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Search provider API key
    #[arg(long, env = "GIPHY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Claim the next fresh asset and download it
    Next {
        /// Search term for the primary refill tier
        #[arg(short, long)]
        query: Option<String>,

        /// Print the claimed asset instead of downloading it
        #[arg(long)]
        no_download: bool,
    },

    /// Fetch a batch from the provider and merge new assets into the pool
    Refill {
        /// Search term (defaults to the primary query)
        #[arg(short, long)]
        query: Option<String>,

        /// Batch size (defaults to the primary batch size)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show pool counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config_dir, &args.environment);

    // Override with command-line arguments
    if let Some(redis_url) = args.redis_url {
        config.redis.url = redis_url;
    }
    if let Some(api_key) = args.api_key {
        config.provider.api_key = api_key;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    telemetry::init_with_config(
        telemetry::TelemetryConfig::new()
            .with_log_level(config.logging.level.clone())
            .with_json_format(config.logging.json_format)
            .with_target(config.logging.include_target),
    );

    info!("Environment: {}", args.environment);
    info!("Redis: {}", mask_redis_url(&config.redis.url));

    let store: Arc<dyn AssetStore> = Arc::new(
        RedisAssetStore::connect(config.store_config())
            .await
            .context("Failed to connect to the asset store")?,
    );

    match args.command {
        Command::Next { query, no_download } => {
            let cache = build_cache(&config, store)?;
            let query = query.unwrap_or_else(|| config.pool.primary_query.clone());
            run_next(&config, &cache, &query, no_download).await
        }
        Command::Refill { query, limit } => {
            let cache = build_cache(&config, store)?;
            let query = query.unwrap_or_else(|| config.pool.primary_query.clone());
            let limit = limit.unwrap_or(config.pool.default_limit);

            let report = cache
                .refill(&query, limit)
                .await
                .with_context(|| format!("Refill for {:?} failed", query))?;
            println!(
                "query={:?} status={} fetched={} inserted={} duplicates={}",
                report.query, report.status, report.fetched, report.inserted, report.duplicates
            );
            Ok(())
        }
        Command::Status => {
            let stats = store.stats().await.context("Failed to read pool counters")?;
            println!(
                "total={} unconsumed={} consumed={}",
                stats.total,
                stats.unconsumed,
                stats.consumed()
            );
            Ok(())
        }
    }
}

/// Wire the cache to the store and the configured provider
fn build_cache(config: &AppConfig, store: Arc<dyn AssetStore>) -> Result<FreshnessCache> {
    if config.provider.api_key.trim().is_empty() {
        bail!("No provider API key configured (set GIPHY_API_KEY or provider.api_key)");
    }

    let provider: Arc<dyn ProviderClient> = Arc::new(
        GiphyClient::new(config.provider_config()).context("Invalid provider configuration")?,
    );

    FreshnessCache::new(store, provider, config.freshness_config())
        .context("Invalid pool configuration")
}

/// Claim the next asset and optionally download it
async fn run_next(
    config: &AppConfig,
    cache: &FreshnessCache,
    query: &str,
    no_download: bool,
) -> Result<()> {
    let asset = match cache.get_next(query).await? {
        NextAsset::Found(asset) => asset,
        NextAsset::Exhausted => {
            bail!("Pool exhausted: no fresh asset for {:?} or the fallback query", query)
        }
    };

    if no_download {
        println!("{}\t{}", asset.id, asset.source_url);
        return Ok(());
    }

    let downloader = HttpDownloader::new(
        &config.download.directory,
        Duration::from_secs(config.download.timeout_seconds),
    )?;

    match downloader.download(&asset).await {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            // the asset stays consumed; the next run picks a different one
            error!(asset_id = %asset.id, "Download failed: {}", e);
            Err(e.into())
        }
    }
}
