//! Order repository and webhook event bookkeeping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use geoart_core::{OrderId, OrderStatus, Price, SnapshotId, UserId};

use super::{EventClaim, OrderStore, RepositoryError};
use crate::models::{NewOrder, OrderRecord};

const ORDER_COLUMNS: &str = "id, user_id, snapshot_id, event_id, external_id, vendor_order_id, \
     total, status, failure_detail, created_at";

/// Repository for order records.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    snapshot_id: Option<Uuid>,
    event_id: Option<String>,
    external_id: Option<String>,
    vendor_order_id: Option<String>,
    total: Decimal,
    status: String,
    failure_detail: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            snapshot_id: row.snapshot_id.map(SnapshotId::new),
            event_id: row.event_id,
            external_id: row.external_id,
            vendor_order_id: row.vendor_order_id,
            total: Price::new(row.total),
            status,
            failure_detail: row.failure_detail,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders
                (id, user_id, snapshot_id, event_id, external_id, vendor_order_id,
                 total, status, failure_detail)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(OrderId::generate().as_uuid())
        .bind(order.user_id.as_str())
        .bind(order.snapshot_id.map(|id| id.as_uuid()))
        .bind(order.event_id.as_deref())
        .bind(order.external_id.as_deref())
        .bind(order.vendor_order_id.as_deref())
        .bind(order.total.amount())
        .bind(order.status.as_str())
        .bind(order.failure_detail.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("external id already recorded".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRecord::try_from).collect()
    }

    async fn claim_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<EventClaim, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO processed_webhook_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            ",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(EventClaim::Claimed);
        }

        let completed_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT completed_at FROM processed_webhook_events WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        // A row released between the two statements counts as unfinished
        Ok(match completed_at {
            Some(Some(_)) => EventClaim::Completed,
            _ => EventClaim::Pending,
        })
    }

    async fn complete_event(&self, event_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE processed_webhook_events SET completed_at = now() WHERE event_id = $1",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_event(&self, event_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
