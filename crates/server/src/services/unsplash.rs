//! Unsplash API client for car image lookups.
//!
//! Each lookup asks the photo search endpoint for a single result and uses its
//! `small` rendition. Lookups share a process-wide concurrency limit and an
//! optional `moka` cache of successful hits.

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::instrument;
use url::Url;

use crate::config::{OutboundConfig, UnsplashConfig};

use super::{ImageSource, endpoint};

/// Max distinct queries held in the image cache.
const CACHE_CAPACITY: u64 = 1000;

/// Errors that can occur when interacting with the Unsplash API.
#[derive(Debug, Error)]
pub enum ImageSearchError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The outbound request pool was shut down.
    #[error("Outbound request pool closed")]
    PoolClosed,

    /// The configured base URL cannot be extended with the search path.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// Unsplash API client.
///
/// Cheaply cloneable; clones share the HTTP client, concurrency pool and cache.
#[derive(Clone)]
pub struct UnsplashClient {
    inner: Arc<UnsplashClientInner>,
}

struct UnsplashClientInner {
    client: reqwest::Client,
    search_url: Url,
    access_key: SecretString,
    placeholder_image: String,
    permits: Semaphore,
    cache: Option<Cache<String, String>>,
}

impl UnsplashClient {
    /// Create a new Unsplash API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the base URL is unusable.
    pub fn new(config: &UnsplashConfig, outbound: &OutboundConfig) -> Result<Self, ImageSearchError> {
        let client = reqwest::Client::builder()
            .timeout(outbound.timeout)
            .build()?;

        let cache = outbound.image_cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(UnsplashClientInner {
                client,
                search_url: endpoint(&config.base_url, &["search", "photos"])
                    .ok_or_else(|| ImageSearchError::InvalidUrl(config.base_url.to_string()))?,
                access_key: config.access_key.clone(),
                placeholder_image: config.placeholder_image.clone(),
                permits: Semaphore::new(outbound.max_concurrency),
                cache,
            }),
        })
    }

    /// The image returned when a lookup finds nothing.
    #[must_use]
    pub fn placeholder_image(&self) -> &str {
        &self.inner.placeholder_image
    }

    /// Search for a single photo matching `query`.
    ///
    /// Returns `Ok(None)` when the search succeeds but has no usable result.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, or the API responds
    /// with a non-success status.
    #[instrument(skip(self))]
    pub async fn search_photo(&self, query: &str) -> Result<Option<String>, ImageSearchError> {
        let mut url = self.inner.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("per_page", "1")
            .append_pair("client_id", self.inner.access_key.expose_secret());

        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| ImageSearchError::PoolClosed)?;

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageSearchError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body: SearchPhotosResponse = response
            .json()
            .await
            .map_err(|e| ImageSearchError::Parse(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .next()
            .and_then(|photo| photo.urls.small)
            .filter(|small| !small.trim().is_empty()))
    }
}

impl ImageSource for UnsplashClient {
    async fn resolve_image(&self, query: &str) -> String {
        let key = query.trim().to_lowercase();

        if let Some(cache) = &self.inner.cache
            && let Some(hit) = cache.get(&key).await
        {
            tracing::debug!(query, "Image cache hit");
            return hit;
        }

        match self.search_photo(query).await {
            Ok(Some(url)) => {
                if let Some(cache) = &self.inner.cache {
                    cache.insert(key, url.clone()).await;
                }
                url
            }
            Ok(None) => {
                tracing::debug!(query, "No Unsplash result, using placeholder");
                self.inner.placeholder_image.clone()
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "Unsplash lookup failed, using placeholder");
                self.inner.placeholder_image.clone()
            }
        }
    }
}

/// Response from `GET /search/photos`.
#[derive(Debug, Deserialize)]
struct SearchPhotosResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

/// A single photo search result.
#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

/// Rendition URLs of a photo. Only `small` is used.
#[derive(Debug, Deserialize)]
struct PhotoUrls {
    small: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(base_url: &str) -> UnsplashConfig {
        UnsplashConfig {
            base_url: Url::parse(base_url).unwrap(),
            access_key: SecretString::from("test-access-key"),
            placeholder_image: "/images/default.jpg".to_string(),
        }
    }

    #[test]
    fn test_search_url_joins_base() {
        let client =
            UnsplashClient::new(&config("https://api.unsplash.com"), &OutboundConfig::default())
                .unwrap();
        assert_eq!(
            client.inner.search_url.as_str(),
            "https://api.unsplash.com/search/photos"
        );
    }

    #[test]
    fn test_search_url_keeps_base_path() {
        let client = UnsplashClient::new(
            &config("https://proxy.example.com/unsplash"),
            &OutboundConfig::default(),
        )
        .unwrap();
        assert_eq!(
            client.inner.search_url.as_str(),
            "https://proxy.example.com/unsplash/search/photos"
        );
    }

    #[test]
    fn test_cache_disabled_without_ttl() {
        let outbound = OutboundConfig {
            image_cache_ttl: None,
            ..OutboundConfig::default()
        };
        let client = UnsplashClient::new(&config("https://api.unsplash.com"), &outbound).unwrap();
        assert!(client.inner.cache.is_none());
    }

    #[test]
    fn test_parse_search_response() {
        let body: SearchPhotosResponse = serde_json::from_str(
            r#"{"total":1,"results":[{"id":"abc","urls":{"raw":"r","small":"https://images.unsplash.com/s.jpg"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            body.results[0].urls.small.as_deref(),
            Some("https://images.unsplash.com/s.jpg")
        );

        let error_body: SearchPhotosResponse =
            serde_json::from_str(r#"{"errors":["OAuth error"]}"#).unwrap();
        assert!(error_body.results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_yields_placeholder() {
        // Port 9 (discard) is closed on loopback, so the connection is refused
        let outbound = OutboundConfig {
            timeout: Duration::from_secs(2),
            ..OutboundConfig::default()
        };
        let client = UnsplashClient::new(&config("http://127.0.0.1:9"), &outbound).unwrap();

        assert_eq!(client.resolve_image("Toyota Corolla").await, "/images/default.jpg");
        assert_eq!(client.placeholder_image(), "/images/default.jpg");
    }
}
