//! Listing query engine.
//!
//! Runs the pure filter/sort/page pipeline from `car_finder_core` over the
//! dataset, then either fills in missing images on the page or, when a brand
//! search found nothing locally, falls back to the external catalog and
//! finally to a single placeholder record.

use car_finder_core::{Car, CarId, CarPage, ListingRequest};
use futures::future::join_all;
use tracing::instrument;

use crate::dataset::Dataset;

use super::{ImageSource, VehicleCatalog};

/// Answers listing queries against the dataset and the upstream services.
pub struct ListingService<I, C> {
    dataset: Dataset,
    images: I,
    catalog: C,
}

impl<I, C> ListingService<I, C>
where
    I: ImageSource,
    C: VehicleCatalog,
{
    /// Create a new listing service.
    #[must_use]
    pub const fn new(dataset: Dataset, images: I, catalog: C) -> Self {
        Self {
            dataset,
            images,
            catalog,
        }
    }

    /// The underlying dataset.
    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Look up a single dataset record by id.
    ///
    /// Records are returned as stored; no image enrichment is applied.
    #[must_use]
    pub fn get(&self, id: CarId) -> Option<&Car> {
        self.dataset.get(id)
    }

    /// Answer a listing request.
    ///
    /// Never fails. Upstream problems degrade to placeholder images or an
    /// empty fallback, and the dataset itself is never modified.
    #[instrument(skip(self))]
    pub async fn query(&self, request: &ListingRequest) -> CarPage {
        let mut page = request.select(self.dataset.cars());

        if page.data.is_empty()
            && let Some(brand) = request.filters.brand.as_deref()
        {
            tracing::info!(brand, "No local matches, trying external catalog");
            return self.fallback(brand, request).await;
        }

        self.backfill_images(&mut page.data).await;
        page
    }

    /// External catalog lookup, then the placeholder record.
    async fn fallback(&self, brand: &str, request: &ListingRequest) -> CarPage {
        let external = self.catalog.lookup(&brand.to_lowercase(), "").await;

        if external.is_empty() {
            tracing::info!(brand, "External catalog empty, returning placeholder");
            let image = self.images.resolve_image(brand).await;
            return CarPage::single(Car::placeholder(brand, image));
        }

        CarPage::first_page(external, request.pagination)
    }

    /// Resolve images for page records that lack one, concurrently.
    async fn backfill_images(&self, cars: &mut [Car]) {
        let lookups = cars
            .iter_mut()
            .filter(|car| car.needs_image())
            .map(|car| async move {
                car.image = self.images.resolve_image(&car.search_text()).await;
            });

        join_all(lookups).await;
    }
}
