//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::dataset::Dataset;
use crate::services::{
    ApiNinjasClient, CatalogError, ImageSearchError, ListingService, UnsplashClient,
};

/// The listing engine wired to the real upstream clients.
pub type CarListing = ListingService<UnsplashClient, ApiNinjasClient>;

/// Error building the upstream clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build Unsplash client: {0}")]
    Unsplash(#[from] ImageSearchError),
    #[error("failed to build API Ninjas client: {0}")]
    ApiNinjas(#[from] CatalogError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// listing engine.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    listing: CarListing,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `dataset` - The loaded car dataset
    ///
    /// # Errors
    ///
    /// Returns an error if either upstream client cannot be built.
    pub fn new(config: &ServerConfig, dataset: Dataset) -> Result<Self, StateError> {
        let images = UnsplashClient::new(&config.unsplash, &config.outbound)?;
        let catalog = ApiNinjasClient::new(&config.api_ninjas, &config.outbound, images.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                listing: ListingService::new(dataset, images, catalog),
            }),
        })
    }

    /// Get a reference to the listing engine.
    #[must_use]
    pub fn listing(&self) -> &CarListing {
        &self.inner.listing
    }

    /// Get a reference to the car dataset.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        self.inner.listing.dataset()
    }
}

/// State over the bundled dataset with both upstreams unreachable.
///
/// Image lookups resolve to the placeholder and the catalog is always empty.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_state() -> AppState {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/cars.json");
    let dataset = Dataset::load(&path).unwrap();
    test_state_with(dataset)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_state_with(dataset: Dataset) -> AppState {
    use std::time::Duration;

    use secrecy::SecretString;
    use url::Url;

    use crate::config::{ApiNinjasConfig, OutboundConfig, UnsplashConfig};

    // Port 9 (discard) is closed on loopback, so every call is refused
    let offline = Url::parse("http://127.0.0.1:9").unwrap();
    let config = ServerConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        dataset_path: std::path::PathBuf::from("data/cars.json"),
        unsplash: UnsplashConfig {
            base_url: offline.clone(),
            access_key: SecretString::from("test-access-key"),
            placeholder_image: "/images/default.jpg".to_string(),
        },
        api_ninjas: ApiNinjasConfig {
            base_url: offline,
            api_key: SecretString::from("test-api-key"),
        },
        outbound: OutboundConfig {
            timeout: Duration::from_secs(2),
            max_concurrency: 8,
            image_cache_ttl: None,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };

    AppState::new(&config, dataset).unwrap()
}
