//! Integration tests for Car Finder.
//!
//! Each [`TestContext`] runs the real application router on a loopback port,
//! wired to stub Unsplash and API Ninjas servers that also run on loopback.
//! No network access or API keys are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p car-finder-integration-tests
//! ```
//!
//! # Stub Behavior
//!
//! Unsplash (`GET /search/photos`):
//! - a query containing `broken` answers `500`
//! - a query containing `nothing` answers with no results
//! - anything else answers with `https://images.test/<query with dashes>`
//!
//! API Ninjas (`GET /v1/cars`):
//! - requests without the expected `X-Api-Key` answer `401`
//! - make `pagani` answers with two vehicles
//! - make `broken` answers `500`
//! - anything else answers with an empty list

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use car_finder_server::config::{ApiNinjasConfig, OutboundConfig, ServerConfig, UnsplashConfig};
use car_finder_server::dataset::Dataset;
use car_finder_server::state::AppState;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

/// Unsplash access key the stub expects as `client_id`.
pub const UNSPLASH_KEY: &str = "stub-unsplash-access-key";

/// API Ninjas key the stub expects in `X-Api-Key`.
pub const API_NINJAS_KEY: &str = "stub-api-ninjas-key";

/// Placeholder image configured for the app under test.
pub const PLACEHOLDER_IMAGE: &str = "/images/default.jpg";

/// Prefix of every image URL the Unsplash stub hands out.
pub const STUB_IMAGE_PREFIX: &str = "https://images.test/";

/// Running app plus handles on its upstream stubs.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    unsplash_calls: Arc<AtomicUsize>,
    ninjas_calls: Arc<AtomicUsize>,
}

impl TestContext {
    /// Start the app with the image cache disabled.
    pub async fn new() -> Self {
        Self::with_outbound(OutboundConfig {
            timeout: Duration::from_secs(5),
            max_concurrency: 4,
            image_cache_ttl: None,
        })
        .await
    }

    /// Start the app with custom outbound limits.
    ///
    /// # Panics
    ///
    /// Panics if a loopback listener cannot be bound or the app fails to start.
    pub async fn with_outbound(outbound: OutboundConfig) -> Self {
        let unsplash_calls = Arc::new(AtomicUsize::new(0));
        let ninjas_calls = Arc::new(AtomicUsize::new(0));

        let unsplash_url = spawn(stub_unsplash(Arc::clone(&unsplash_calls))).await;
        let ninjas_url = spawn(stub_api_ninjas(Arc::clone(&ninjas_calls))).await;

        let config = ServerConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            dataset_path: dataset_path(),
            unsplash: UnsplashConfig {
                base_url: Url::parse(&unsplash_url).expect("stub URL is valid"),
                access_key: SecretString::from(UNSPLASH_KEY),
                placeholder_image: PLACEHOLDER_IMAGE.to_string(),
            },
            api_ninjas: ApiNinjasConfig {
                base_url: Url::parse(&ninjas_url).expect("stub URL is valid"),
                api_key: SecretString::from(API_NINJAS_KEY),
            },
            outbound,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let dataset = Dataset::load(&config.dataset_path).expect("bundled dataset loads");
        let state = AppState::new(&config, dataset).expect("app state builds");
        let base_url = spawn(car_finder_server::app(state)).await;

        Self {
            client: reqwest::Client::new(),
            base_url,
            unsplash_calls,
            ninjas_calls,
        }
    }

    /// Absolute URL for `path` on the app under test.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path` and decode the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn get_json(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("request succeeds");
        let status = StatusCode::from_u16(response.status().as_u16())
            .expect("reqwest status is a valid HTTP status");
        let body = response.json().await.expect("body is JSON");
        (status, body)
    }

    /// Requests received by the Unsplash stub.
    #[must_use]
    pub fn unsplash_calls(&self) -> usize {
        self.unsplash_calls.load(Ordering::SeqCst)
    }

    /// Requests received by the API Ninjas stub.
    #[must_use]
    pub fn ninjas_calls(&self) -> usize {
        self.ninjas_calls.load(Ordering::SeqCst)
    }
}

/// Image URL the Unsplash stub returns for `query`.
#[must_use]
pub fn stub_image(query: &str) -> String {
    format!("{STUB_IMAGE_PREFIX}{}", query.replace(' ', "-"))
}

/// Path to the dataset bundled with the server crate.
#[must_use]
pub fn dataset_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../server/data/cars.json")
}

/// Serve `router` on an ephemeral loopback port and return its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("server runs");
    });

    format!("http://{addr}")
}

fn stub_unsplash(calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/search/photos", get(search_photos))
        .with_state(calls)
}

async fn search_photos(
    State(calls): State<Arc<AtomicUsize>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    calls.fetch_add(1, Ordering::SeqCst);

    if params.get("client_id").map(String::as_str) != Some(UNSPLASH_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"errors": ["OAuth error"]})));
    }

    let query = params.get("query").cloned().unwrap_or_default();
    if query.contains("broken") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"errors": ["boom"]})),
        );
    }
    if query.contains("nothing") {
        return (StatusCode::OK, Json(json!({"total": 0, "results": []})));
    }

    (
        StatusCode::OK,
        Json(json!({
            "total": 1,
            "results": [{"id": "stub", "urls": {"raw": "raw", "small": stub_image(&query)}}]
        })),
    )
}

fn stub_api_ninjas(calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/v1/cars", get(vehicles))
        .with_state(calls)
}

async fn vehicles(
    State(calls): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    calls.fetch_add(1, Ordering::SeqCst);

    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key != Some(API_NINJAS_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid API Key."})),
        );
    }

    match params.get("make").map(String::as_str) {
        Some("pagani") => (
            StatusCode::OK,
            Json(json!([
                {"make": "pagani", "model": "zonda", "fuel_type": "gas", "year": 2005, "class": "two seater"},
                {"make": "pagani", "model": "huayra", "year": 2013}
            ])),
        ),
        Some("broken") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "upstream failure"})),
        ),
        _ => (StatusCode::OK, Json(json!([]))),
    }
}
