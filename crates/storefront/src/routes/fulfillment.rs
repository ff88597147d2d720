//! Operator fulfillment handler.
//!
//! Manual entry point for re-submitting an order whose automatic dispatch
//! failed. Lines arrive with their own prices, so every line is validated
//! before the vendor is called.

use std::str::FromStr;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use geoart_core::{Price, ShippingAddress, VariantId};

use crate::error::Result;
use crate::middleware::RequireOperator;
use crate::services::FulfillmentLine;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub cart_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, alias = "printifyProductId")]
    pub vendor_product_id: Option<String>,
    #[serde(default, alias = "variant_id")]
    pub variant_id: Option<VariantId>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Kept raw so a non-numeric price is reported by validation.
    #[serde(default)]
    pub price: Value,
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    pub external_id: String,
    pub total: Price,
}

/// Submit an order to the print vendor.
#[instrument(skip_all, fields(lines = tracing::field::Empty))]
pub async fn create_order(
    State(state): State<AppState>,
    _operator: RequireOperator,
    body: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<CreateOrderResponse>> {
    let Json(body) = body?;
    tracing::Span::current().record("lines", body.cart_items.len());

    let lines: Vec<FulfillmentLine> = body
        .cart_items
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.into_line(index))
        .collect();

    let submitted = state
        .fulfillment()
        .submit_order(&lines, &body.shipping_address)
        .await?;

    tracing::info!(
        vendor_order_id = %submitted.vendor_order_id,
        external_id = %submitted.external_id,
        "Operator order submitted"
    );

    Ok(Json(CreateOrderResponse {
        success: true,
        order: OrderSummary {
            id: submitted.vendor_order_id,
            external_id: submitted.external_id,
            total: submitted.total,
        },
    }))
}

impl OrderItem {
    fn into_line(self, index: usize) -> FulfillmentLine {
        FulfillmentLine {
            reference: self
                .vendor_product_id
                .clone()
                .unwrap_or_else(|| format!("item {}", index + 1)),
            vendor_product_id: self.vendor_product_id,
            variant_id: self.variant_id,
            quantity: self.quantity,
            price: numeric_price(&self.price),
        }
    }
}

/// A JSON number as a price; anything else is `None`.
fn numeric_price(value: &Value) -> Option<Price> {
    let Value::Number(number) = value else {
        return None;
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .map(Price::new)
}
