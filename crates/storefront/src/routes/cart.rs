//! Cart route handlers.
//!
//! Every route is scoped to the authenticated shopper; items owned by
//! someone else answer 404.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use geoart_core::{CartItemId, ProductCategory, VariantId};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::CartLineItem;
use crate::services::CartItemDraft;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineItem>,
}

/// Body of `POST /cart/items`. Any client-supplied price is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_category: String,
    pub product_name: String,
    pub image_url: String,
    #[serde(default, alias = "printifyProductId")]
    pub vendor_product_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRequest {
    #[serde(alias = "variant_id")]
    pub variant_id: VariantId,
}

/// List the caller's cart.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<CartResponse>> {
    let items = state.cart().list_cart(&user_id).await?;
    Ok(Json(CartResponse { items }))
}

/// Add a mockup to the caller's cart, priced server-side.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartLineItem>)> {
    let Json(body) = body?;
    let product_category: ProductCategory = body.product_category.parse()?;

    let item = state
        .cart()
        .add_item(
            &user_id,
            CartItemDraft {
                product_category,
                product_name: body.product_name,
                image_url: body.image_url,
                vendor_product_id: body.vendor_product_id,
                quantity: body.quantity,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Change the quantity of one of the caller's items.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn update_quantity(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    item_id: std::result::Result<Path<CartItemId>, PathRejection>,
    body: std::result::Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<CartLineItem>> {
    let Path(item_id) = item_id?;
    let Json(body) = body?;
    let item = state
        .cart()
        .update_quantity(&user_id, item_id, body.quantity)
        .await?;
    Ok(Json(item))
}

/// Record the variant chosen for one of the caller's items.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn set_variant(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    item_id: std::result::Result<Path<CartItemId>, PathRejection>,
    body: std::result::Result<Json<VariantRequest>, JsonRejection>,
) -> Result<Json<CartLineItem>> {
    let Path(item_id) = item_id?;
    let Json(body) = body?;
    let item = state
        .cart()
        .set_variant(&user_id, item_id, body.variant_id)
        .await?;
    Ok(Json(item))
}

/// Remove one of the caller's items.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    item_id: std::result::Result<Path<CartItemId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(item_id) = item_id?;
    state.cart().remove_item(&user_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
