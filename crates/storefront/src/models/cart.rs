//! Cart line item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use geoart_core::{CartItemId, Price, ProductCategory, UserId, VariantId};

/// One product a user has put in their cart (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Store-assigned identifier.
    pub id: CartItemId,
    /// Owner of the item.
    pub user_id: UserId,
    pub product_category: ProductCategory,
    /// Display label.
    pub product_name: String,
    /// Rendered design or mockup image.
    pub image_url: String,
    /// Print vendor product the design was published as.
    pub vendor_product_id: Option<String>,
    /// Unit price, computed server-side when the item was added.
    pub price: Price,
    pub quantity: u32,
    /// Size/color SKU chosen from the vendor's variant list.
    pub variant_id: Option<VariantId>,
    pub created_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// Draft for a new cart line item; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_category: ProductCategory,
    pub product_name: String,
    pub image_url: String,
    pub vendor_product_id: Option<String>,
    pub price: Price,
    pub quantity: u32,
}
