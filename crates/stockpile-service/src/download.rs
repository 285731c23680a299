//! Asset downloader
//!
//! Fetches the bytes of a claimed asset and writes them under a local
//! directory. A failed download is a typed error, never a path; the claimed
//! asset stays consumed either way.

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockpile_core::ClaimedAsset;
use tracing::{info, instrument, warn};

use crate::error::{DownloadError, DownloadResult};

/// User agent sent with download requests; some CDNs reject bare clients
pub const DOWNLOAD_USER_AGENT: &str = "Mozilla/5.0";

/// Default file extension for downloaded assets
pub const DEFAULT_EXTENSION: &str = "gif";

/// Trait for fetching a claimed asset to local storage
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download the asset and return the local path it was written to
    async fn download(&self, asset: &ClaimedAsset) -> DownloadResult<PathBuf>;
}

/// Downloader writing `{directory}/{asset_id}.{extension}` over HTTP
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    directory: PathBuf,
    extension: String,
}

impl HttpDownloader {
    /// Create a downloader writing into `directory`
    pub fn new(directory: impl Into<PathBuf>, timeout: Duration) -> DownloadResult<Self> {
        if timeout.is_zero() {
            return Err(DownloadError::Configuration(
                "Download timeout must be greater than 0".to_string(),
            ));
        }

        let directory = directory.into();
        let client = Client::builder()
            .user_agent(DOWNLOAD_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Configuration(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            directory,
            extension: DEFAULT_EXTENSION.to_string(),
        })
    }

    /// Set the file extension used for written files
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Target directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Where an asset will be written
    pub fn target_path(&self, asset: &ClaimedAsset) -> PathBuf {
        let file_stem: String = asset
            .id
            .as_str()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '.') { '_' } else { c })
            .collect();
        self.directory
            .join(format!("{}.{}", file_stem, self.extension))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[instrument(skip(self, asset), fields(asset_id = %asset.id))]
    async fn download(&self, asset: &ClaimedAsset) -> DownloadResult<PathBuf> {
        let asset_id = asset.id.to_string();

        let response = self
            .client
            .get(&asset.source_url)
            .send()
            .await
            .map_err(|e| {
                warn!("Download request failed: {}", e);
                DownloadError::Transport {
                    asset_id: asset_id.clone(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Download rejected by source");
            return Err(DownloadError::Failed {
                asset_id,
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DownloadError::Transport {
            asset_id: asset_id.clone(),
            message: format!("Failed to read body: {}", e),
        })?;

        let path = self.target_path(asset);
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| DownloadError::Io {
                path: self.directory.clone(),
                message: e.to_string(),
            })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| DownloadError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;

        info!(path = %path.display(), bytes = bytes.len(), "Asset saved");
        Ok(path)
    }
}
