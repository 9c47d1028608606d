//! Business logic services for the car listing API.
//!
//! # Services
//!
//! - `unsplash` - Image search, used to backfill missing car images
//! - `api_ninjas` - External vehicle catalog, used when the dataset has no match
//! - `listing` - The listing query engine tying the dataset and both clients together
//!
//! The engine depends on the two upstream clients only through the
//! [`ImageSource`] and [`VehicleCatalog`] traits, so it can be exercised with
//! in-process stubs.

pub mod api_ninjas;
pub mod listing;
pub mod unsplash;

use std::future::Future;

use car_finder_core::Car;
use url::Url;

pub use api_ninjas::{ApiNinjasClient, CatalogError};
pub use listing::ListingService;
pub use unsplash::{ImageSearchError, UnsplashClient};

/// Resolves a free-text query to a single image URL.
pub trait ImageSource: Send + Sync {
    /// Best-guess image for `query`.
    ///
    /// Never fails: any upstream problem yields a placeholder image.
    fn resolve_image(&self, query: &str) -> impl Future<Output = String> + Send;
}

/// Looks up vehicles that are not in the local dataset.
pub trait VehicleCatalog: Send + Sync {
    /// Vehicles matching `make` and `model`, as car records with images.
    ///
    /// Never fails: any upstream problem yields an empty list.
    fn lookup(&self, make: &str, model: &str) -> impl Future<Output = Vec<Car>> + Send;
}

/// Append `segments` to the path of `base`.
///
/// Unlike [`Url::join`], a base without a trailing slash keeps its last
/// segment, so `https://proxy/unsplash` becomes `https://proxy/unsplash/search/photos`.
/// Returns `None` for bases that cannot carry a path (`mailto:` and the like).
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn join(base: &str, segments: &[&str]) -> Option<String> {
        endpoint(&Url::parse(base).unwrap(), segments).map(String::from)
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        assert_eq!(
            join("https://api.unsplash.com", &["search", "photos"]).as_deref(),
            Some("https://api.unsplash.com/search/photos")
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_without_trailing_slash() {
        assert_eq!(
            join("https://proxy.example.com/unsplash", &["search", "photos"]).as_deref(),
            Some("https://proxy.example.com/unsplash/search/photos")
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_with_trailing_slash() {
        assert_eq!(
            join("https://proxy.example.com/ninjas/", &["v1", "cars"]).as_deref(),
            Some("https://proxy.example.com/ninjas/v1/cars")
        );
    }

    #[test]
    fn test_endpoint_rejects_cannot_be_a_base() {
        assert_eq!(join("mailto:cars@example.com", &["v1", "cars"]), None);
    }
}
