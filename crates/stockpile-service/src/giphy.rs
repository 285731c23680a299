//! Giphy search client
//!
//! Implements [`ProviderClient`] against the Giphy search endpoint. Each
//! result carries several size variants; the client keeps the `original`
//! variant and falls back to the largest variant by pixel area.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;
use stockpile_core::{CandidateRecord, ProviderStatus};
use tracing::{debug, instrument, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{validate_request, FetchOutcome, ProviderClient};

/// Default Giphy search endpoint
pub const GIPHY_SEARCH_ENDPOINT: &str = "https://api.giphy.com/v1/gifs/search";

/// Default content rating filter
pub const DEFAULT_RATING: &str = "pg-13";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ORIGINAL_VARIANT: &str = "original";

/// Giphy client configuration
#[derive(Clone)]
pub struct GiphyConfig {
    /// Search endpoint URL
    pub endpoint: String,

    /// API key sent as `api_key`
    pub api_key: String,

    /// Content rating filter sent as `rating`
    pub rating: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GiphyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GiphyConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("rating", &self.rating)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GiphyConfig {
    /// Create configuration for the public endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: GIPHY_SEARCH_ENDPOINT.to_string(),
            api_key: api_key.into(),
            rating: DEFAULT_RATING.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the search endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the rating filter
    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = rating.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Provider client for the Giphy search API
#[derive(Debug, Clone)]
pub struct GiphyClient {
    client: Client,
    config: GiphyConfig,
}

impl GiphyClient {
    /// Build a client from configuration
    pub fn new(config: GiphyConfig) -> ProviderResult<Self> {
        url::Url::parse(&config.endpoint).map_err(|e| {
            ProviderError::InvalidRequest(format!("Invalid endpoint {}: {}", config.endpoint, e))
        })?;
        if config.timeout.is_zero() {
            return Err(ProviderError::InvalidRequest(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::InvalidRequest(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Client configuration
    pub fn config(&self) -> &GiphyConfig {
        &self.config
    }
}

#[async_trait]
impl ProviderClient for GiphyClient {
    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    async fn fetch(&self, query: &str, limit: usize) -> ProviderResult<FetchOutcome> {
        validate_request(query, limit)?;

        let limit_param = limit.to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("q", query),
                ("api_key", self.config.api_key.as_str()),
                ("rating", self.config.rating.as_str()),
                ("limit", limit_param.as_str()),
            ])
            .send()
            .await?;

        let http_status = response.status();
        if !http_status.is_success() {
            warn!(status = http_status.as_u16(), "Giphy search returned HTTP error");
            return Err(ProviderError::Unavailable(format!(
                "HTTP {} from search endpoint",
                http_status.as_u16()
            )));
        }

        let body: SearchResponse = response.json().await?;
        let status = body
            .meta
            .map(|meta| ProviderStatus(meta.status))
            .unwrap_or(ProviderStatus(http_status.as_u16()));

        if !status.is_success() {
            warn!(status = status.code(), "Giphy search reported failure status");
            return Ok(FetchOutcome::empty(status));
        }

        let returned = body.data.len();
        let candidates: Vec<CandidateRecord> = body
            .data
            .into_iter()
            .filter_map(GifObject::decode)
            .filter_map(GifObject::into_candidate)
            .take(limit)
            .collect();

        debug!(
            returned,
            usable = candidates.len(),
            status = status.code(),
            "Giphy search completed"
        );

        Ok(FetchOutcome { candidates, status })
    }
}

/// Entries in `data` are decoded one by one; malformed ones are skipped
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    status: u16,
}

#[derive(Debug, Deserialize)]
struct GifObject {
    #[serde(default)]
    id: String,
    #[serde(default)]
    images: HashMap<String, ImageVariant>,
}

#[derive(Debug, Deserialize)]
struct ImageVariant {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    width: u64,
    #[serde(default, deserialize_with = "lenient_dimension")]
    height: u64,
}

impl ImageVariant {
    fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }

    fn area(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }
}

impl GifObject {
    fn decode(value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(object) => Some(object),
            Err(e) => {
                debug!("Skipping malformed search result: {}", e);
                None
            }
        }
    }

    /// Pick the highest-fidelity variant and build a candidate from it
    fn into_candidate(self) -> Option<CandidateRecord> {
        let url = self
            .images
            .get(ORIGINAL_VARIANT)
            .and_then(ImageVariant::usable_url)
            .or_else(|| {
                self.images
                    .values()
                    .filter(|variant| variant.usable_url().is_some())
                    .max_by_key(|variant| variant.area())
                    .and_then(ImageVariant::usable_url)
            })?;

        match CandidateRecord::new(self.id.as_str(), url) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!("Skipping unusable search result {:?}: {}", self.id, e);
                None
            }
        }
    }
}

/// Giphy encodes dimensions as strings; accept numbers too
fn lenient_dimension<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Dimension {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Dimension>::deserialize(deserializer)? {
        Some(Dimension::Number(n)) => n,
        Some(Dimension::Text(s)) => s.trim().parse().unwrap_or(0),
        None => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gif(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "images": {
                "original": { "url": format!("https://media.example/{}/giphy.gif", id), "width": "480", "height": "270" },
                "fixed_height_small": { "url": format!("https://media.example/{}/100.gif", id), "width": "178", "height": "100" }
            }
        })
    }

    async fn client_for(server: &MockServer) -> GiphyClient {
        let config = GiphyConfig::new("test-key")
            .with_endpoint(format!("{}/v1/gifs/search", server.uri()))
            .with_timeout(Duration::from_secs(2));
        GiphyClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_search_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/gifs/search"))
            .and(query_param("q", "aesthetic anime"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("rating", "pg-13"))
            .and(query_param("limit", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [gif("g1"), gif("g2")],
                "meta": { "status": 200, "msg": "OK" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.fetch("aesthetic anime", 25).await.unwrap();

        assert_eq!(outcome.status, ProviderStatus(200));
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].id.as_str(), "g1");
        assert_eq!(
            outcome.candidates[0].source_url,
            "https://media.example/g1/giphy.gif"
        );
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_largest_variant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "g3",
                    "images": {
                        "fixed_width": { "url": "https://media.example/g3/200w.gif", "width": "200", "height": "113" },
                        "downsized_large": { "url": "https://media.example/g3/large.gif", "width": 640, "height": 360 },
                        "still": { "width": "1280", "height": "720" }
                    }
                }],
                "meta": { "status": 200 }
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.fetch("trending", 5).await.unwrap();
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(
            outcome.candidates[0].source_url,
            "https://media.example/g3/large.gif"
        );
    }

    #[tokio::test]
    async fn test_fetch_skips_results_without_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "g4", "images": {} }, { "id": "", "images": {} }, gif("g5")],
                "meta": { "status": 200 }
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.fetch("trending", 5).await.unwrap();
        let ids: Vec<_> = outcome.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["g5"]);
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "g1", "images": null },
                    { "id": "g6", "images": { "original": "not-an-object" } },
                    { "id": "g2", "images": { "original": { "url": "https://media.example/g2.gif" } } }
                ],
                "meta": { "status": 200 }
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.fetch("trending", 5).await.unwrap();
        let ids: Vec<_> = outcome.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["g2"]);
        assert_eq!(outcome.candidates[0].source_url, "https://media.example/g2.gif");
    }

    #[tokio::test]
    async fn test_fetch_truncates_to_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [gif("a"), gif("b"), gif("c")],
                "meta": { "status": 200 }
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.fetch("trending", 2).await.unwrap();
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_non_success_meta_status_yields_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [gif("g1")],
                "meta": { "status": 429, "msg": "Too many requests" }
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.fetch("trending", 5).await.unwrap();
        assert_eq!(outcome.status, ProviderStatus(429));
        assert!(outcome.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch("trending", 5).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_garbage_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch("trending", 5).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [], "meta": { "status": 200 } }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = GiphyConfig::new("test-key")
            .with_endpoint(format!("{}/v1/gifs/search", server.uri()))
            .with_timeout(Duration::from_millis(50));
        let client = GiphyClient::new(config).unwrap();

        let err = client.fetch("trending", 5).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_invalid_request_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.fetch("", 5).await,
            Err(ProviderError::InvalidRequest(_))
        ));
        assert!(matches!(
            client.fetch("trending", 0).await,
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = GiphyConfig::new("k").with_endpoint("not a url");
        assert!(GiphyClient::new(config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = GiphyConfig::new("k").with_timeout(Duration::ZERO);
        assert!(matches!(
            GiphyClient::new(config),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = GiphyConfig::new("super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
