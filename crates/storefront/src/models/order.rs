//! Local order records.
//!
//! Production and shipping progress is tracked by the print vendor; the
//! local record only says whether the hand-off succeeded.

use chrono::{DateTime, Utc};
use serde::Serialize;

use geoart_core::{OrderId, OrderStatus, Price, SnapshotId, UserId};

/// One dispatched payment (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub snapshot_id: Option<SnapshotId>,
    /// Payment provider event that triggered the order.
    pub event_id: Option<String>,
    /// Token sent to the vendor as `external_id`.
    pub external_id: Option<String>,
    /// Order id assigned by the vendor.
    pub vendor_order_id: Option<String>,
    pub total: Price,
    pub status: OrderStatus,
    /// Why submission failed, for operator reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Draft for a new order record.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub snapshot_id: Option<SnapshotId>,
    pub event_id: Option<String>,
    pub external_id: Option<String>,
    pub vendor_order_id: Option<String>,
    pub total: Price,
    pub status: OrderStatus,
    pub failure_detail: Option<String>,
}
