//! HTTP route handlers for the car API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (dataset loaded)
//!
//! # Cars (rate limited)
//! GET  /cars                   - Filtered, sorted, paginated listing
//! GET  /cars/{id}              - Single dataset record
//! ```

pub mod cars;
pub mod health;

use axum::{Router, routing::get};

use crate::middleware::api_rate_limiter;
use crate::state::AppState;

/// Create the health check routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create the car routes router.
pub fn car_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cars::index))
        .route("/{id}", get(cars::show))
}

/// Create all routes for the API.
///
/// The car routes are rate limited per client IP, so the router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()` unless a
/// proxy sets `X-Forwarded-For`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .nest("/cars", car_routes().layer(api_rate_limiter()))
}
