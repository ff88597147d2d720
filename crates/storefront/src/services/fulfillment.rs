//! Fulfillment order submitter.
//!
//! Validation runs to completion before any network call: an order with a
//! missing variant or a non-positive price never reaches the vendor.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use geoart_core::{AddressError, Price, ShippingAddress, VariantId};

use crate::models::CartLineItem;
use crate::printify::{AddressTo, FulfillmentProvider, OrderLineItem, OrderRequest, PrintifyError};

const EXTERNAL_ID_PREFIX: &str = "geoart_order";

/// Standard shipping tier.
const SHIPPING_METHOD_STANDARD: u32 = 1;

/// Errors that can occur while submitting a fulfillment order.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Missing variant selection for product {0}")]
    MissingVariant(String),

    #[error("Invalid price detected for product {0}")]
    InvalidPrice(String),

    #[error("Missing print product for {0}")]
    MissingProduct(String),

    #[error("Invalid quantity for product {0}")]
    InvalidQuantity(String),

    #[error("Order total is out of range")]
    AmountOverflow,

    #[error(transparent)]
    Address(#[from] AddressError),

    /// The vendor call failed; payment may already have been captured.
    #[error("Failed to create order: {0}")]
    Vendor(#[source] PrintifyError),
}

impl FulfillmentError {
    /// Whether the error was raised before contacting the vendor.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Vendor(_))
    }

    /// Vendor error payload, if the vendor sent one.
    #[must_use]
    pub fn vendor_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Vendor(e) => e.details(),
            _ => None,
        }
    }
}

/// One line of an order to manufacture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentLine {
    /// Human-readable reference used in validation messages.
    pub reference: String,
    pub vendor_product_id: Option<String>,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// `None` when the caller supplied something other than a number.
    pub price: Option<Price>,
}

impl From<&CartLineItem> for FulfillmentLine {
    fn from(item: &CartLineItem) -> Self {
        Self {
            reference: item
                .vendor_product_id
                .clone()
                .unwrap_or_else(|| item.id.to_string()),
            vendor_product_id: item.vendor_product_id.clone(),
            variant_id: item.variant_id,
            quantity: item.quantity,
            price: Some(item.price),
        }
    }
}

/// A line that passed validation.
struct ReadyLine<'a> {
    product_id: &'a str,
    variant_id: VariantId,
    quantity: u32,
    price: Price,
}

/// Check that every line can be manufactured.
///
/// Every line is checked for a variant before any line is checked for a
/// price, so the first missing variant is always the reported error.
///
/// # Errors
///
/// Returns the first problem found, naming the offending line.
pub fn validate_lines(lines: &[FulfillmentLine]) -> Result<(), FulfillmentError> {
    ready_lines(lines).map(|_| ())
}

/// [`validate_lines`] for stored cart items.
///
/// # Errors
///
/// See [`validate_lines`].
pub fn validate_items(items: &[CartLineItem]) -> Result<(), FulfillmentError> {
    let lines: Vec<FulfillmentLine> = items.iter().map(FulfillmentLine::from).collect();
    validate_lines(&lines)
}

fn ready_lines(lines: &[FulfillmentLine]) -> Result<Vec<ReadyLine<'_>>, FulfillmentError> {
    if lines.is_empty() {
        return Err(FulfillmentError::EmptyOrder);
    }
    if let Some(line) = lines.iter().find(|line| line.variant_id.is_none()) {
        return Err(FulfillmentError::MissingVariant(line.reference.clone()));
    }
    if let Some(line) = lines
        .iter()
        .find(|line| !line.price.is_some_and(|price| price.is_positive()))
    {
        return Err(FulfillmentError::InvalidPrice(line.reference.clone()));
    }

    lines
        .iter()
        .map(|line| {
            let product_id = line
                .vendor_product_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| FulfillmentError::MissingProduct(line.reference.clone()))?;
            if line.quantity < 1 {
                return Err(FulfillmentError::InvalidQuantity(line.reference.clone()));
            }
            match (line.variant_id, line.price) {
                (Some(variant_id), Some(price)) => Ok(ReadyLine {
                    product_id,
                    variant_id,
                    quantity: line.quantity,
                    price,
                }),
                (None, _) => Err(FulfillmentError::MissingVariant(line.reference.clone())),
                (_, None) => Err(FulfillmentError::InvalidPrice(line.reference.clone())),
            }
        })
        .collect()
}

/// Fresh vendor-side idempotency token: creation time plus 64 random bits.
#[must_use]
pub fn generate_external_id() -> String {
    format!(
        "{EXTERNAL_ID_PREFIX}_{}_{:016x}",
        Utc::now().timestamp_millis(),
        rand::random::<u64>()
    )
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedOrder {
    pub vendor_order_id: String,
    pub external_id: String,
    pub total: Price,
}

#[derive(Clone)]
pub struct FulfillmentService {
    vendor: Arc<dyn FulfillmentProvider>,
}

impl FulfillmentService {
    #[must_use]
    pub fn new(vendor: Arc<dyn FulfillmentProvider>) -> Self {
        Self { vendor }
    }

    /// Validate and submit an order to the print vendor.
    ///
    /// No retry is attempted; the caller decides how to surface a failure.
    ///
    /// # Errors
    ///
    /// Validation variants before any network call, `Vendor` if the vendor
    /// rejects the order or is unreachable.
    #[tracing::instrument(skip_all, fields(lines = lines.len()))]
    pub async fn submit_order(
        &self,
        lines: &[FulfillmentLine],
        address: &ShippingAddress,
    ) -> Result<SubmittedOrder, FulfillmentError> {
        let ready = ready_lines(lines)?;
        address.validate()?;

        let total = ready
            .iter()
            .try_fold(Price::ZERO, |sum, line| {
                let line_total = line.price.amount().checked_mul(line.quantity.into())?;
                sum.amount().checked_add(line_total).map(Price::new)
            })
            .ok_or(FulfillmentError::AmountOverflow)?;

        let external_id = generate_external_id();
        let order = OrderRequest {
            external_id: external_id.clone(),
            line_items: ready
                .iter()
                .map(|line| OrderLineItem {
                    product_id: line.product_id.to_owned(),
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                })
                .collect(),
            shipping_method: SHIPPING_METHOD_STANDARD,
            send_shipping_notification: true,
            address_to: AddressTo::from(address),
        };

        tracing::info!(external_id = %external_id, total = %total, "Submitting order to print vendor");

        let created = self.vendor.create_order(&order).await.map_err(|e| {
            tracing::error!(
                external_id = %external_id,
                error = %e,
                details = ?e.details(),
                "Print vendor order failed"
            );
            FulfillmentError::Vendor(e)
        })?;

        Ok(SubmittedOrder {
            vendor_order_id: created.id,
            external_id,
            total,
        })
    }
}
