//! Cart store accessor.
//!
//! The only path from HTTP handlers to cart rows. Ownership is checked here
//! on every call: an item owned by someone else is reported as not found, the
//! same as an item that does not exist.

use std::sync::Arc;

use thiserror::Error;

use geoart_core::{CartItemId, ProductCategory, UserId, VariantId, retail_price};

use crate::db::{CartStore, RepositoryError};
use crate::models::{CartLineItem, NewCartItem};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("cart item {0} not found")]
    NotFound(CartItemId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What a caller supplies when adding a mockup to the cart.
///
/// Carries no price; [`CartService::add_item`] computes it.
#[derive(Debug, Clone)]
pub struct CartItemDraft {
    pub product_category: ProductCategory,
    pub product_name: String,
    pub image_url: String,
    pub vendor_product_id: Option<String>,
    pub quantity: Option<u32>,
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }

    /// All of the caller's cart items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartLineItem>, CartError> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// Add an item priced by the retail pricing rule.
    ///
    /// # Errors
    ///
    /// Returns `CartError::MissingField` for a blank name or image, and
    /// `CartError::InvalidQuantity` for a zero quantity.
    #[tracing::instrument(skip(self, draft), fields(user_id = %user_id, category = %draft.product_category))]
    pub async fn add_item(
        &self,
        user_id: &UserId,
        draft: CartItemDraft,
    ) -> Result<CartLineItem, CartError> {
        if draft.product_name.trim().is_empty() {
            return Err(CartError::MissingField("productName"));
        }
        if draft.image_url.trim().is_empty() {
            return Err(CartError::MissingField("imageUrl"));
        }
        let quantity = draft.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let item = self
            .store
            .insert(NewCartItem {
                user_id: user_id.clone(),
                product_category: draft.product_category,
                product_name: draft.product_name,
                image_url: draft.image_url,
                vendor_product_id: draft.vendor_product_id.filter(|id| !id.trim().is_empty()),
                price: retail_price(draft.product_category),
                quantity,
            })
            .await?;

        tracing::info!(item_id = %item.id, price = %item.price, "Cart item added");
        Ok(item)
    }

    /// Set the quantity of one of the caller's items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for quantities below 1 and
    /// `CartError::NotFound` if the caller does not own the item.
    pub async fn update_quantity(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        self.ensure_owned(user_id, item_id).await?;
        self.store
            .update_quantity(user_id, item_id, quantity)
            .await
            .map_err(|e| not_found_or(e, item_id))
    }

    /// Choose the vendor variant for one of the caller's items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the caller does not own the item.
    pub async fn set_variant(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        variant_id: VariantId,
    ) -> Result<CartLineItem, CartError> {
        self.ensure_owned(user_id, item_id).await?;
        self.store
            .update_variant(user_id, item_id, variant_id)
            .await
            .map_err(|e| not_found_or(e, item_id))
    }

    /// Remove one of the caller's items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the caller does not own the item.
    pub async fn remove_item(&self, user_id: &UserId, item_id: CartItemId) -> Result<(), CartError> {
        self.ensure_owned(user_id, item_id).await?;
        self.store
            .delete(user_id, item_id)
            .await
            .map_err(|e| not_found_or(e, item_id))
    }

    /// Remove items that were turned into a vendor order.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn remove_consumed(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, CartError> {
        if item_ids.is_empty() {
            return Ok(0);
        }
        Ok(self.store.delete_many(user_id, item_ids).await?)
    }

    async fn ensure_owned(&self, user_id: &UserId, item_id: CartItemId) -> Result<(), CartError> {
        match self.store.get(user_id, item_id).await? {
            Some(item) if item.user_id == *user_id => Ok(()),
            Some(_) => {
                tracing::warn!(item_id = %item_id, user_id = %user_id, "Cart item owner mismatch");
                Err(CartError::NotFound(item_id))
            }
            None => Err(CartError::NotFound(item_id)),
        }
    }
}

fn not_found_or(error: RepositoryError, item_id: CartItemId) -> CartError {
    match error {
        RepositoryError::NotFound => CartError::NotFound(item_id),
        other => CartError::Repository(other),
    }
}
