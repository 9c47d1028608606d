//! Car Finder Core - Shared types library.
//!
//! This crate provides the types used across all Car Finder components:
//! - `server` - JSON listing API and its upstream clients
//! - `integration-tests` - End-to-end tests against the real router
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. The filter/sort/paginate half of the listing pipeline lives here
//! so it can be reasoned about and tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Car records, reserved id ranges, and non-negative prices
//! - [`listing`] - Filters, sort orders, pagination, and the response page

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod listing;
pub mod types;

pub use listing::{CarFilters, CarPage, ListingRequest, Pagination, SortOrder};
pub use types::*;
