//! Car record type.

use serde::{Deserialize, Serialize};

use super::id::CarId;
use super::price::Price;

/// Fuel category used when the source does not provide one.
pub const FALLBACK_FUEL: &str = "Unknown";

/// A car listing.
///
/// Dataset records are immutable for the lifetime of the process; records
/// built from the external catalog or the placeholder exist only for the
/// request that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub brand: String,
    pub name: String,
    /// Free-form category, compared case-insensitively.
    pub fuel: String,
    pub seating: u32,
    pub price: Price,
    /// Image URL. Empty means "needs enrichment".
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Car {
    /// The `"<brand> <name>"` text used for searching and image lookups.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {}", self.brand, self.name)
    }

    /// True when the image is missing or whitespace-only.
    #[must_use]
    pub fn needs_image(&self) -> bool {
        self.image.trim().is_empty()
    }

    /// Build the synthetic record returned when nothing matches `brand`
    /// locally or in the external catalog.
    #[must_use]
    pub fn placeholder(brand: &str, image: String) -> Self {
        Self {
            id: CarId::FALLBACK,
            brand: brand.to_string(),
            name: brand.to_string(),
            fuel: FALLBACK_FUEL.to_string(),
            seating: 0,
            price: Price::ZERO,
            image,
            description: Some(format!(
                "No results found for \"{brand}\". Here's a preview from Unsplash."
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_dataset_record() {
        let json = r#"{
            "id": 3,
            "brand": "Toyota",
            "name": "Corolla",
            "fuel": "Petrol",
            "seating": 5,
            "price": 20000,
            "image": "https://images.unsplash.com/corolla.jpg",
            "description": "Reliable compact sedan"
        }"#;

        let car: Car = serde_json::from_str(json).unwrap();
        assert_eq!(car.id, CarId::new(3));
        assert_eq!(car.search_text(), "Toyota Corolla");
        assert!(!car.needs_image());
    }

    #[test]
    fn test_missing_image_and_description() {
        let json = r#"{"id":1,"brand":"Kia","name":"Rio","fuel":"Petrol","seating":5,"price":1}"#;
        let car: Car = serde_json::from_str(json).unwrap();
        assert!(car.needs_image());
        assert!(car.description.is_none());

        let out = serde_json::to_value(&car).unwrap();
        assert!(out.get("description").is_none());
    }

    #[test]
    fn test_whitespace_image_needs_enrichment() {
        let json = r#"{"id":1,"brand":"Kia","name":"Rio","fuel":"Petrol","seating":5,"price":1,"image":"   "}"#;
        let car: Car = serde_json::from_str(json).unwrap();
        assert!(car.needs_image());
    }

    #[test]
    fn test_placeholder() {
        let car = Car::placeholder("Zonda", "/images/default.jpg".to_string());
        assert!(car.id.is_fallback());
        assert_eq!(car.brand, "Zonda");
        assert_eq!(car.name, "Zonda");
        assert_eq!(car.fuel, "Unknown");
        assert_eq!(car.seating, 0);
        assert_eq!(car.price, Price::ZERO);
        assert_eq!(
            car.description.as_deref(),
            Some("No results found for \"Zonda\". Here's a preview from Unsplash.")
        );
    }
}
