//! Car listing route handlers.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, RawQuery, State, rejection::PathRejection},
};
use car_finder_core::{Car, CarFilters, CarId, CarPage, ListingRequest, Pagination, SortOrder};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Raw query parameters for `GET /cars`.
///
/// Everything is taken as text so malformed numbers can be ignored instead
/// of rejecting the request.
#[derive(Debug, Default)]
pub struct CarsQuery {
    pub brand: Option<String>,
    pub fuel: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub seating: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl CarsQuery {
    /// Read the known keys from a URL-encoded query string.
    ///
    /// Unknown keys are skipped and a repeated key keeps its first value.
    #[must_use]
    pub fn from_query_str(raw: &str) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                "brand" => &mut query.brand,
                "fuel" => &mut query.fuel,
                "minPrice" => &mut query.min_price,
                "maxPrice" => &mut query.max_price,
                "seating" => &mut query.seating,
                "sort" => &mut query.sort,
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }

    /// Normalize into a listing request.
    ///
    /// Empty values count as absent and unparseable numbers are dropped.
    #[must_use]
    pub fn into_request(self) -> ListingRequest {
        let min_price = parse(self.min_price);
        let max_price = parse(self.max_price);
        let seating = parse(self.seating);
        let page = parse(self.page);
        let limit = parse(self.limit);

        ListingRequest {
            filters: CarFilters {
                brand: present(self.brand),
                fuel: present(self.fuel),
                min_price,
                max_price,
                seating,
            },
            sort: present(self.sort).map_or_else(SortOrder::default, |s| SortOrder::parse(&s)),
            pagination: Pagination::new(page, limit),
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    present(value).and_then(|v| v.trim().parse().ok())
}

/// List cars, with filters, sorting, pagination and image enrichment.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Json<CarPage> {
    let request = CarsQuery::from_query_str(raw.as_deref().unwrap_or_default()).into_request();
    Json(state.listing().query(&request).await)
}

/// A single dataset record, as stored.
#[instrument(skip(state, path))]
pub async fn show(
    State(state): State<AppState>,
    path: std::result::Result<Path<u32>, PathRejection>,
) -> Result<Json<Car>> {
    let Path(id) = path.map_err(|rejection| match rejection {
        PathRejection::FailedToDeserializePathParams(_) => {
            AppError::BadRequest("invalid car id".to_string())
        }
        other => AppError::Internal(other.body_text()),
    })?;

    state
        .listing()
        .get(CarId::new(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("car {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    fn query(pairs: &[(&str, &str)]) -> CarsQuery {
        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        CarsQuery::from_query_str(&encoded)
    }

    #[test]
    fn test_into_request_parses_all_fields() {
        let request = query(&[
            ("brand", "toyota"),
            ("fuel", "Petrol"),
            ("minPrice", "15000"),
            ("maxPrice", "25000.50"),
            ("seating", "5"),
            ("sort", "price_desc"),
            ("page", "2"),
            ("limit", "5"),
        ])
        .into_request();

        assert_eq!(request.filters.brand.as_deref(), Some("toyota"));
        assert_eq!(request.filters.fuel.as_deref(), Some("Petrol"));
        assert_eq!(request.filters.min_price, Some(Decimal::from(15_000)));
        assert_eq!(
            request.filters.max_price,
            Some(Decimal::from_str("25000.50").unwrap())
        );
        assert_eq!(request.filters.seating, Some(5));
        assert_eq!(request.sort, SortOrder::PriceDesc);
        assert_eq!(request.pagination, Pagination::new(Some(2), Some(5)));
    }

    #[test]
    fn test_into_request_ignores_malformed_values() {
        let request = query(&[
            ("brand", ""),
            ("minPrice", "cheap"),
            ("seating", "five"),
            ("sort", "newest"),
            ("page", "abc"),
            ("limit", "-3"),
        ])
        .into_request();

        assert_eq!(request, ListingRequest::default());
    }

    #[test]
    fn test_repeated_key_keeps_first_value() {
        let request = query(&[
            ("fuel", "Petrol"),
            ("fuel", "Diesel"),
            ("limit", "3"),
            ("limit", "x"),
        ])
        .into_request();

        assert_eq!(request.filters.fuel.as_deref(), Some("Petrol"));
        assert_eq!(request.pagination, Pagination::new(None, Some(3)));
    }

    #[test]
    fn test_from_query_str_decodes_and_skips_unknown_keys() {
        let query = CarsQuery::from_query_str("brand=Land+Rover&color=red&minPrice=%31000");

        assert_eq!(query.brand.as_deref(), Some("Land Rover"));
        assert_eq!(query.min_price.as_deref(), Some("1000"));
        assert!(query.fuel.is_none());
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/cars", get(index))
            .route("/cars/{id}", get(show))
            .with_state(state)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_index_returns_page_envelope() {
        let (status, json) = get_json(app(test_state()), "/cars?sort=price_asc&limit=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["page"], 1);
        assert!(json["total"].as_u64().unwrap() >= 2);
        assert!(json["totalPages"].as_u64().unwrap() >= 1);

        let first = json["data"][0]["price"].as_f64().unwrap();
        let second = json["data"][1]["price"].as_f64().unwrap();
        assert!(first <= second);
    }

    #[tokio::test]
    async fn test_index_accepts_repeated_filter() {
        let (status, json) =
            get_json(app(test_state()), "/cars?fuel=Petrol&fuel=Diesel&limit=100").await;

        assert_eq!(status, StatusCode::OK);
        let cars = json["data"].as_array().unwrap();
        assert!(!cars.is_empty());
        assert!(cars.iter().all(|car| car["fuel"] == "Petrol"));
    }

    #[tokio::test]
    async fn test_index_without_query_string() {
        let (status, json) = get_json(app(test_state()), "/cars").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["page"], 1);
    }

    #[tokio::test]
    async fn test_show_returns_record() {
        let (status, json) = get_json(app(test_state()), "/cars/1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], 1);
    }

    #[tokio::test]
    async fn test_show_unknown_id_is_not_found() {
        let (status, json) = get_json(app(test_state()), "/cars/0").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Not found: car 0");
    }

    #[tokio::test]
    async fn test_show_non_numeric_id_is_bad_request() {
        let (status, json) = get_json(app(test_state()), "/cars/corolla").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Bad request: invalid car id");
    }
}
