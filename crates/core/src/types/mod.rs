//! Core types for Car Finder.
//!
//! This module provides type-safe wrappers for the catalog's domain concepts.

pub mod car;
pub mod id;
pub mod price;

pub use car::{Car, FALLBACK_FUEL};
pub use id::CarId;
pub use price::{Price, PriceError};
