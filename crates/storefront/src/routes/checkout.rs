//! Checkout session and payment webhook handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use geoart_core::{CartItemId, ShippingAddress};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::payments::SIGNATURE_HEADER;
use crate::services::CheckoutRequest;
use crate::state::AppState;

/// Body of `POST /checkout/create-session`.
///
/// Only the item ids are read from `cartItems`; everything else the client
/// sends about an item is ignored in favour of the stored cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub cart_items: Vec<CartItemRef>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Deserialize)]
pub struct CartItemRef {
    pub id: CartItemId,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub url: String,
}

/// Create a hosted checkout session for the caller's selected items.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: std::result::Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<CreateSessionResponse>> {
    let Json(body) = body?;
    let request = CheckoutRequest {
        item_ids: body.cart_items.into_iter().map(|item| item.id).collect(),
        shipping_address: body.shipping_address,
    };

    let session = state.checkout().create_session(&user_id, request).await?;
    tracing::info!(session_id = %session.id, "Checkout session created");

    Ok(Json(CreateSessionResponse { url: session.url }))
}

/// Receive a payment provider event.
///
/// The raw body is required for signature verification, so it is taken as
/// bytes rather than JSON.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.webhooks().handle(&payload, signature).await?;
    tracing::debug!(outcome = ?outcome, "Webhook processed");

    Ok(Json(json!({ "received": true })))
}
