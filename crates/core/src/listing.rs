//! Filter, sort, and paginate over the car dataset.
//!
//! This is the pure half of the listing pipeline. Steps run strictly in this
//! order against the full dataset:
//!
//! 1. Brand/name text filter
//! 2. Fuel filter
//! 3. Price bounds
//! 4. Seating filter
//! 5. Stable sort by price
//! 6. Page slicing
//!
//! Image enrichment and the empty-result fallback need network access and
//! live in the server crate.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::Car;

/// Page used when the request does not name a valid one.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when the request does not name a valid one.
pub const DEFAULT_LIMIT: usize = 10;

/// Largest page size a request may ask for.
pub const MAX_LIMIT: usize = 100;

/// Filters narrowing the dataset. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarFilters {
    /// Case-insensitive substring of `"<brand> <name>"`.
    pub brand: Option<String>,
    /// Case-insensitive exact fuel category.
    pub fuel: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub seating: Option<u32>,
}

impl CarFilters {
    /// Check a single record against every supplied filter.
    #[must_use]
    pub fn matches(&self, car: &Car) -> bool {
        if let Some(brand) = &self.brand
            && !car
                .search_text()
                .to_lowercase()
                .contains(&brand.to_lowercase())
        {
            return false;
        }

        if let Some(fuel) = &self.fuel
            && car.fuel.to_lowercase() != fuel.to_lowercase()
        {
            return false;
        }

        if let Some(min) = self.min_price
            && car.price.amount() < min
        {
            return false;
        }

        if let Some(max) = self.max_price
            && car.price.amount() > max
        {
            return false;
        }

        if let Some(seating) = self.seating
            && car.seating != seating
        {
            return false;
        }

        true
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Keep dataset order.
    #[default]
    None,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    /// Parse a query-string value. Unrecognized values mean [`SortOrder::None`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            _ => Self::None,
        }
    }

    /// Sort in place. Records with equal prices keep their relative order.
    pub fn apply(self, cars: &mut [&Car]) {
        match self {
            Self::None => {}
            Self::PriceAsc => cars.sort_by(|a, b| a.price.cmp(&b.price)),
            Self::PriceDesc => cars.sort_by(|a, b| b.price.cmp(&a.price)),
        }
    }
}

/// A validated page request.
///
/// Out-of-range input is clamped rather than rejected: a missing or
/// non-positive page becomes [`DEFAULT_PAGE`], a missing or non-positive
/// limit becomes [`DEFAULT_LIMIT`], and limits above [`MAX_LIMIT`] are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Build a pagination from raw request values.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .and_then(|p| usize::try_from(p).ok())
            .unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l >= 1)
            .and_then(|l| usize::try_from(l).ok())
            .map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT));

        Self { page, limit }
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Records per page.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// `ceil(total / limit)`.
    #[must_use]
    pub const fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.limit)
    }

    /// The slice of `items` on this page. Pages past the end are empty.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1).saturating_mul(self.limit);
        let end = start.saturating_add(self.limit).min(items.len());
        items.get(start..end).unwrap_or(&[])
    }
}

/// Everything the listing endpoint was asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRequest {
    pub filters: CarFilters,
    pub sort: SortOrder,
    pub pagination: Pagination,
}

impl ListingRequest {
    /// Run the pure pipeline over `cars`.
    ///
    /// The returned page holds clones of the matching records; `cars` is
    /// never modified.
    #[must_use]
    pub fn select(&self, cars: &[Car]) -> CarPage {
        let mut matched: Vec<&Car> = cars.iter().filter(|c| self.filters.matches(c)).collect();
        self.sort.apply(&mut matched);

        let total = matched.len();
        let data = self
            .pagination
            .slice(&matched)
            .iter()
            .map(|&c| c.clone())
            .collect();

        CarPage {
            data,
            total,
            page: self.pagination.page(),
            total_pages: self.pagination.total_pages(total),
        }
    }
}

/// One page of listing results, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPage {
    pub data: Vec<Car>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl CarPage {
    /// A one-record, one-page result.
    #[must_use]
    pub fn single(car: Car) -> Self {
        Self {
            data: vec![car],
            total: 1,
            page: 1,
            total_pages: 1,
        }
    }

    /// First page of an out-of-dataset result set.
    ///
    /// `total` counts every record in `cars`, but only the first `limit` are
    /// returned.
    #[must_use]
    pub fn first_page(mut cars: Vec<Car>, pagination: Pagination) -> Self {
        let total = cars.len();
        cars.truncate(pagination.limit());

        Self {
            data: cars,
            total,
            page: 1,
            total_pages: pagination.total_pages(total),
        }
    }
}
