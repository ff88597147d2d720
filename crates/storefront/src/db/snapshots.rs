//! Checkout snapshot repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use geoart_core::{Price, ShippingAddress, SnapshotId, UserId};

use super::{RepositoryError, SnapshotStore};
use crate::models::{CartLineItem, CheckoutSnapshot, NewSnapshot, SnapshotTotals};

const SNAPSHOT_COLUMNS: &str =
    "id, user_id, items, subtotal, shipping, total, shipping_address, created_at, consumed_at";

/// Repository for checkout snapshots.
#[derive(Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    /// Create a new snapshot repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    user_id: String,
    items: Json<Vec<CartLineItem>>,
    subtotal: Decimal,
    shipping: Decimal,
    total: Decimal,
    shipping_address: Option<Json<ShippingAddress>>,
    created_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl From<SnapshotRow> for CheckoutSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            id: SnapshotId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: row.items.0,
            totals: SnapshotTotals {
                subtotal: Price::new(row.subtotal),
                shipping: Price::new(row.shipping),
                total: Price::new(row.total),
            },
            shipping_address: row.shipping_address.map(|json| json.0),
            created_at: row.created_at,
            consumed_at: row.consumed_at,
        }
    }
}

#[async_trait]
impl SnapshotStore for SnapshotRepository {
    async fn insert(&self, snapshot: NewSnapshot) -> Result<CheckoutSnapshot, RepositoryError> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            r"
            INSERT INTO checkout_snapshots
                (id, user_id, items, subtotal, shipping, total, shipping_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SNAPSHOT_COLUMNS}
            "
        ))
        .bind(SnapshotId::generate().as_uuid())
        .bind(snapshot.user_id.as_str())
        .bind(Json(&snapshot.items))
        .bind(snapshot.totals.subtotal.amount())
        .bind(snapshot.totals.shipping.amount())
        .bind(snapshot.totals.total.amount())
        .bind(snapshot.shipping_address.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: SnapshotId) -> Result<Option<CheckoutSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM checkout_snapshots WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CheckoutSnapshot::from))
    }

    async fn mark_consumed(&self, id: SnapshotId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE checkout_snapshots SET consumed_at = now() WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
