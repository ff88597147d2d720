//! Core types for GeoArt.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod category;
pub mod id;
pub mod price;
pub mod status;

pub use address::{AddressError, ShippingAddress};
pub use category::{CatalogMapping, CategoryError, ProductCategory};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::OrderStatus;
