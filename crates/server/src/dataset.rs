//! The local car dataset.
//!
//! Loaded once at startup from a JSON array of car records and never mutated
//! afterwards. Loading validates the id-range invariants so records built
//! later by the external catalog can never collide with local ones.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use car_finder_core::{Car, CarId};
use thiserror::Error;

/// Errors that can occur when loading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset is not a valid JSON array of car records.
    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two records share an id.
    #[error("duplicate car id {0}")]
    DuplicateId(CarId),

    /// A record uses an id reserved for the placeholder or external records.
    #[error("car id {0} is outside the local range 1..{max}", max = CarId::EXTERNAL_BASE)]
    ReservedId(CarId),
}

/// The read-only, in-memory car dataset.
///
/// Cheaply cloneable; all clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    cars: Arc<[Car]>,
}

impl Dataset {
    /// Build a dataset from records, validating ids.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::ReservedId` or `DatasetError::DuplicateId` if
    /// any record breaks the id invariants.
    pub fn new(cars: Vec<Car>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::with_capacity(cars.len());
        for car in &cars {
            if !car.id.is_local() {
                return Err(DatasetError::ReservedId(car.id));
            }
            if !seen.insert(car.id) {
                return Err(DatasetError::DuplicateId(car.id));
            }
        }

        Ok(Self { cars: cars.into() })
    }

    /// Parse a dataset from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed (including negative prices)
    /// or if ids are invalid.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let cars: Vec<Car> = serde_json::from_str(json)?;
        Self::new(cars)
    }

    /// Load a dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let json = std::fs::read_to_string(path)?;
        let dataset = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), cars = dataset.len(), "Dataset loaded");
        Ok(dataset)
    }

    /// All records in dataset order.
    #[must_use]
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: CarId) -> Option<&Car> {
        self.cars.iter().find(|c| c.id == id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cars.len()
    }

    /// True if the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }
}
