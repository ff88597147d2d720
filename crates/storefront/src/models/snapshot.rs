//! Checkout snapshot types.
//!
//! A snapshot is the durable copy of a cart taken when checkout starts. The
//! payment webhook finds it again through the session metadata, so edits made
//! to the live cart after that point never reach the paid order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use geoart_core::{Price, ShippingAddress, SnapshotId, UserId};

use super::CartLineItem;

/// Amounts charged for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTotals {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

/// A persisted checkout snapshot (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSnapshot {
    pub id: SnapshotId,
    pub user_id: UserId,
    /// Line items as they were when checkout started.
    pub items: Vec<CartLineItem>,
    pub totals: SnapshotTotals,
    /// Address supplied by the front end, if any.
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    /// Set once a completion event has been dispatched for this snapshot.
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Draft for a new snapshot.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub user_id: UserId,
    pub items: Vec<CartLineItem>,
    pub totals: SnapshotTotals,
    pub shipping_address: Option<ShippingAddress>,
}
