//! Car identifiers and the reserved id ranges.
//!
//! Ids are partitioned into three ranges:
//!
//! | Range | Owner |
//! |-------|-------|
//! | `0` | The synthetic "no results" placeholder |
//! | `1..10000` | Records from the local dataset |
//! | `10000..` | Records built from the external vehicle catalog |
//!
//! The dataset loader rejects local ids outside their range, and the catalog
//! client allocates ids with [`CarId::external`], so the two sources can never
//! collide.

use serde::{Deserialize, Serialize};

/// A car record identifier.
///
/// Serializes as a bare integer.
///
/// ```
/// use car_finder_core::CarId;
///
/// assert!(CarId::FALLBACK.is_fallback());
/// assert!(CarId::new(42).is_local());
/// assert_eq!(CarId::external(3), Some(CarId::new(10_003)));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CarId(u32);

impl CarId {
    /// Id of the synthetic placeholder record.
    pub const FALLBACK: Self = Self(0);

    /// First id handed out to externally fetched records.
    pub const EXTERNAL_BASE: u32 = 10_000;

    /// Create a new ID from a u32 value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Id for the record at `index` in an external catalog response.
    ///
    /// Returns `None` if the id would overflow.
    #[must_use]
    pub fn external(index: usize) -> Option<Self> {
        u32::try_from(index)
            .ok()
            .and_then(|i| Self::EXTERNAL_BASE.checked_add(i))
            .map(Self)
    }

    /// Get the underlying u32 value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// True for the placeholder id.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.0 == 0
    }

    /// True for ids owned by the local dataset.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.0 > 0 && self.0 < Self::EXTERNAL_BASE
    }
}

impl ::core::fmt::Display for CarId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_disjoint() {
        assert!(CarId::FALLBACK.is_fallback());
        assert!(!CarId::FALLBACK.is_local());

        let local = CarId::new(9_999);
        assert!(local.is_local());

        let external = CarId::new(10_000);
        assert!(!external.is_local());
    }

    #[test]
    fn test_external_allocation() {
        assert_eq!(CarId::external(0), Some(CarId::new(10_000)));
        assert_eq!(CarId::external(7).unwrap().as_u32(), 10_007);
        assert!(CarId::external(usize::MAX).is_none());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&CarId::new(12)).unwrap();
        assert_eq!(json, "12");

        let parsed: CarId = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, CarId::new(12));
    }
}
