//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types, which live next to the queries in [`crate::db`].

pub mod cart;
pub mod order;
pub mod snapshot;

pub use cart::{CartLineItem, NewCartItem};
pub use order::{NewOrder, OrderRecord};
pub use snapshot::{CheckoutSnapshot, NewSnapshot, SnapshotTotals};
