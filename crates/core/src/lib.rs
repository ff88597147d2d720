//! GeoArt Core - Shared domain types.
//!
//! Types used by every GeoArt component:
//! - `storefront` - checkout, webhook and fulfillment service
//! - `cli` - migrations and catalog tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, product categories, addresses, statuses
//! - [`pricing`] - Retail price computation from the base-cost table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{DEFAULT_BASE_COST_CENTS, retail_price, retail_price_for_name};
pub use types::*;
