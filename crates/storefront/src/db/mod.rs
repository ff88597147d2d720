//! Database operations for the GeoArt `PostgreSQL` store.
//!
//! # Database: `geoart`
//!
//! ## Tables
//!
//! - `cart_items` - Live cart line items, keyed by owner
//! - `checkout_snapshots` - Cart copies taken when checkout starts
//! - `orders` - One record per dispatched payment
//! - `processed_webhook_events` - Payment provider event ids claimed, and when they completed
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p geoart-cli -- migrate
//! ```
//!
//! Services only see the store traits below, so the pipeline can run against
//! in-memory implementations in tests.

pub mod carts;
pub mod orders;
pub mod snapshots;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use geoart_core::{CartItemId, SnapshotId, UserId, VariantId};

use crate::models::{
    CartLineItem, CheckoutSnapshot, NewCartItem, NewOrder, NewSnapshot, OrderRecord,
};

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use snapshots::SnapshotRepository;

/// Result of claiming a payment provider event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClaim {
    /// First delivery of this event.
    Claimed,
    /// Claimed earlier but never completed, e.g. the process died mid-dispatch.
    Pending,
    /// An earlier delivery already finished this event.
    Completed,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence for live cart line items.
///
/// Every method that touches an existing item takes the owner as well; rows
/// belonging to anyone else behave as if they did not exist.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// All items owned by `user_id`, oldest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CartLineItem>, RepositoryError>;

    /// A single item, if it exists and is owned by `user_id`.
    async fn get(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLineItem>, RepositoryError>;

    async fn insert(&self, item: NewCartItem) -> Result<CartLineItem, RepositoryError>;

    async fn update_quantity(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, RepositoryError>;

    async fn update_variant(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        variant_id: VariantId,
    ) -> Result<CartLineItem, RepositoryError>;

    /// Delete one item. `NotFound` if it does not exist for this owner.
    async fn delete(&self, user_id: &UserId, item_id: CartItemId) -> Result<(), RepositoryError>;

    /// Delete several items at once, returning how many were removed.
    async fn delete_many(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, RepositoryError>;
}

/// Persistence for checkout snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert(&self, snapshot: NewSnapshot) -> Result<CheckoutSnapshot, RepositoryError>;

    async fn get(&self, id: SnapshotId) -> Result<Option<CheckoutSnapshot>, RepositoryError>;

    /// Mark a snapshot consumed.
    ///
    /// Returns `false` if it was already consumed (or does not exist).
    async fn mark_consumed(&self, id: SnapshotId) -> Result<bool, RepositoryError>;
}

/// Persistence for order records and webhook event bookkeeping.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError>;

    /// The user's orders, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, RepositoryError>;

    /// Claim a payment provider event id before dispatching it.
    async fn claim_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<EventClaim, RepositoryError>;

    /// Mark a claimed event finished; later deliveries see `Completed`.
    async fn complete_event(&self, event_id: &str) -> Result<(), RepositoryError>;

    /// Forget a claimed event id so a redelivery is processed again.
    async fn release_event(&self, event_id: &str) -> Result<(), RepositoryError>;
}

/// Readiness probe for the backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[async_trait]
impl HealthCheck for PgPool {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored quantity back to the domain type.
pub(crate) fn quantity_from_db(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid quantity: {value}")))
}

/// Convert a domain quantity for storage.
pub(crate) fn quantity_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {value} is out of range")))
}
