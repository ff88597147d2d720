//! Cart repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use geoart_core::{CartItemId, Price, ProductCategory, UserId, VariantId};

use super::{CartStore, RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{CartLineItem, NewCartItem};

const CART_COLUMNS: &str = "id, user_id, product_category, product_name, image_url, \
     vendor_product_id, price, quantity, variant_id, created_at";

/// Repository for cart line items.
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    user_id: String,
    product_category: String,
    product_name: String,
    image_url: String,
    vendor_product_id: Option<String>,
    price: Decimal,
    quantity: i32,
    variant_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartLineItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let product_category = row.product_category.parse::<ProductCategory>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category in database: {e}"))
        })?;

        Ok(Self {
            id: CartItemId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_category,
            product_name: row.product_name,
            image_url: row.image_url,
            vendor_product_id: row.vendor_product_id,
            price: Price::new(row.price),
            quantity: quantity_from_db(row.quantity)?,
            variant_id: row.variant_id.map(VariantId::new),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CartLineItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLineItem::try_from).collect()
    }

    async fn get(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLineItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1 AND user_id = $2"
        ))
        .bind(item_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartLineItem::try_from).transpose()
    }

    async fn insert(&self, item: NewCartItem) -> Result<CartLineItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            INSERT INTO cart_items
                (id, user_id, product_category, product_name, image_url,
                 vendor_product_id, price, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(CartItemId::generate().as_uuid())
        .bind(item.user_id.as_str())
        .bind(item.product_category.name())
        .bind(&item.product_name)
        .bind(&item.image_url)
        .bind(item.vendor_product_id.as_deref())
        .bind(item.price.amount())
        .bind(quantity_to_db(item.quantity)?)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            UPDATE cart_items SET quantity = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(item_id.as_uuid())
        .bind(user_id.as_str())
        .bind(quantity_to_db(quantity)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn update_variant(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        variant_id: VariantId,
    ) -> Result<CartLineItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            UPDATE cart_items SET variant_id = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(item_id.as_uuid())
        .bind(user_id.as_str())
        .bind(variant_id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete(&self, user_id: &UserId, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id.as_uuid())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_many(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        let ids: Vec<Uuid> = item_ids.iter().map(CartItemId::as_uuid).collect();
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id.as_str())
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
