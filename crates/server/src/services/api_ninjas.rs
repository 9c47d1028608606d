//! API Ninjas client for vehicles missing from the local dataset.
//!
//! Vehicles returned by `GET /v1/cars` are mapped to car records with ids
//! allocated from the external range (see [`CarId::external`]), default
//! seating and price, and an image looked up through Unsplash.

use std::sync::Arc;

use car_finder_core::{Car, CarId, FALLBACK_FUEL, Price};
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::{ApiNinjasConfig, OutboundConfig};

use super::unsplash::UnsplashClient;
use super::{ImageSource, VehicleCatalog, endpoint};

/// Seating reported for external vehicles, which the API does not provide.
const DEFAULT_SEATING: u32 = 5;

/// Errors that can occur when interacting with API Ninjas.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured base URL cannot be extended with the cars path.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// API Ninjas vehicle catalog client.
#[derive(Clone)]
pub struct ApiNinjasClient {
    inner: Arc<ApiNinjasClientInner>,
}

struct ApiNinjasClientInner {
    client: reqwest::Client,
    cars_url: Url,
    images: UnsplashClient,
}

impl ApiNinjasClient {
    /// Create a new API Ninjas client.
    ///
    /// Images for returned vehicles are resolved through `images`.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value, the HTTP
    /// client fails to build, or the base URL is unusable.
    pub fn new(
        config: &ApiNinjasConfig,
        outbound: &OutboundConfig,
        images: UnsplashClient,
    ) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| CatalogError::Parse(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("X-Api-Key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(outbound.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiNinjasClientInner {
                client,
                cars_url: endpoint(&config.base_url, &["v1", "cars"])
                    .ok_or_else(|| CatalogError::InvalidUrl(config.base_url.to_string()))?,
                images,
            }),
        })
    }

    /// Fetch raw vehicle records for `make` and `model`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, the API responds with
    /// a non-success status, or the body is not a list of vehicles.
    #[instrument(skip(self))]
    pub async fn fetch_vehicles(
        &self,
        make: &str,
        model: &str,
    ) -> Result<Vec<Vehicle>, CatalogError> {
        let mut url = self.inner.cars_url.clone();
        url.query_pairs_mut()
            .append_pair("make", make)
            .append_pair("model", model);

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Map vehicles to car records, resolving images concurrently.
    async fn build_cars(&self, vehicles: Vec<Vehicle>) -> Vec<Car> {
        let lookups = vehicles
            .into_iter()
            .enumerate()
            .filter_map(|(index, vehicle)| CarId::external(index).map(|id| (id, vehicle)))
            .map(|(id, vehicle)| async move {
                let image = self
                    .inner
                    .images
                    .resolve_image(&format!("{} {}", vehicle.make, vehicle.model))
                    .await;
                vehicle.into_car(id, image)
            });

        join_all(lookups).await
    }
}

impl VehicleCatalog for ApiNinjasClient {
    async fn lookup(&self, make: &str, model: &str) -> Vec<Car> {
        match self.fetch_vehicles(make, model).await {
            Ok(vehicles) => {
                tracing::debug!(make, model, count = vehicles.len(), "API Ninjas lookup");
                self.build_cars(vehicles).await
            }
            Err(e) => {
                tracing::warn!(make, model, error = %e, "API Ninjas lookup failed");
                Vec::new()
            }
        }
    }
}

/// Vehicle record from `GET /v1/cars`.
///
/// Only the fields used for mapping are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub class: Option<String>,
}

impl Vehicle {
    /// `"<year> <make> <model>, <class>"`, leaving out missing parts.
    #[must_use]
    pub fn description(&self) -> String {
        let mut description = String::new();
        if let Some(year) = self.year {
            description.push_str(&format!("{year} "));
        }
        description.push_str(&format!("{} {}", self.make, self.model));
        if let Some(class) = self.class.as_deref().filter(|c| !c.is_empty()) {
            description.push_str(&format!(", {class}"));
        }
        description
    }

    /// Build a car record with the given external id and image.
    #[must_use]
    pub fn into_car(self, id: CarId, image: String) -> Car {
        let description = self.description();
        let fuel = self
            .fuel_type
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| FALLBACK_FUEL.to_string());

        Car {
            id,
            brand: self.make,
            name: self.model,
            fuel,
            seating: DEFAULT_SEATING,
            price: Price::ZERO,
            image,
            description: Some(description),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vehicle_list() {
        let vehicles: Vec<Vehicle> = serde_json::from_str(
            r#"[
                {"city_mpg":11,"class":"two seater","combination_mpg":13,"cylinders":12,
                 "displacement":7.3,"drive":"rwd","fuel_type":"gas","highway_mpg":17,
                 "make":"pagani","model":"zonda","transmission":"m","year":2005}
            ]"#,
        )
        .unwrap();

        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].make, "pagani");
        assert_eq!(vehicles[0].year, Some(2005));
    }

    #[test]
    fn test_into_car_maps_fields() {
        let vehicle = Vehicle {
            make: "pagani".to_string(),
            model: "zonda".to_string(),
            fuel_type: Some("gas".to_string()),
            year: Some(2005),
            class: Some("two seater".to_string()),
        };

        let car = vehicle.into_car(CarId::external(2).unwrap(), "https://img/z.jpg".to_string());
        assert_eq!(car.id.as_u32(), 10_002);
        assert_eq!(car.brand, "pagani");
        assert_eq!(car.name, "zonda");
        assert_eq!(car.fuel, "gas");
        assert_eq!(car.seating, 5);
        assert_eq!(car.price, Price::ZERO);
        assert_eq!(car.image, "https://img/z.jpg");
        assert_eq!(car.description.as_deref(), Some("2005 pagani zonda, two seater"));
    }

    #[test]
    fn test_into_car_defaults_missing_fuel() {
        let vehicle = Vehicle {
            make: "rimac".to_string(),
            model: "nevera".to_string(),
            fuel_type: Some(String::new()),
            ..Vehicle::default()
        };

        let car = vehicle.into_car(CarId::external(0).unwrap(), String::new());
        assert_eq!(car.fuel, "Unknown");
        assert_eq!(car.description.as_deref(), Some("rimac nevera"));
    }

    fn images() -> UnsplashClient {
        UnsplashClient::new(
            &crate::config::UnsplashConfig {
                base_url: Url::parse("https://api.unsplash.com").unwrap(),
                access_key: secrecy::SecretString::from("k"),
                placeholder_image: "/images/default.jpg".to_string(),
            },
            &OutboundConfig::default(),
        )
        .unwrap()
    }

    fn build(base_url: &str) -> Result<ApiNinjasClient, CatalogError> {
        ApiNinjasClient::new(
            &ApiNinjasConfig {
                base_url: Url::parse(base_url).unwrap(),
                api_key: secrecy::SecretString::from("k"),
            },
            &OutboundConfig::default(),
            images(),
        )
    }

    #[test]
    fn test_cars_url_joins_base() {
        assert_eq!(
            build("https://api.api-ninjas.com").unwrap().inner.cars_url.as_str(),
            "https://api.api-ninjas.com/v1/cars"
        );
    }

    #[test]
    fn test_cars_url_keeps_base_path() {
        assert_eq!(
            build("https://proxy.example.com/ninjas").unwrap().inner.cars_url.as_str(),
            "https://proxy.example.com/ninjas/v1/cars"
        );
    }

    #[test]
    fn test_cannot_be_a_base_url_rejected() {
        assert!(matches!(
            build("mailto:cars@example.com"),
            Err(CatalogError::InvalidUrl(_))
        ));
    }
}
