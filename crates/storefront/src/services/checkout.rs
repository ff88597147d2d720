//! Checkout session builder.
//!
//! Turns the caller's stored cart into a hosted payment page:
//!
//! 1. Resolve the requested item ids against the caller's cart.
//! 2. Price every line in integer minor units and add the shipping line.
//! 3. Persist a snapshot, then open the session with the snapshot id as
//!    both the metadata reference and the idempotency key.
//!
//! The snapshot write completes before the session is requested; the webhook
//! that fires after payment depends on finding it.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use geoart_core::{AddressError, CartItemId, Price, ShippingAddress, UserId};

use crate::config::CheckoutSettings;
use crate::db::{CartStore, RepositoryError, SnapshotStore};
use crate::models::{CartLineItem, NewSnapshot, SnapshotTotals};
use crate::payments::{
    CheckoutSessionRequest, CheckoutSessionResponse, PaymentError, PaymentProvider,
    SessionLineItem, SessionMetadata,
};
use crate::services::fulfillment::{FulfillmentError, validate_items};

/// Name of the surcharge line added below the free-shipping threshold.
pub const SHIPPING_LINE_NAME: &str = "Shipping";

/// Errors that can occur while building a checkout session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart cannot be empty")]
    EmptyCart,

    #[error("cart item {0} is not in your cart")]
    UnknownItem(CartItemId),

    #[error("invalid price for cart item {0}")]
    InvalidPrice(CartItemId),

    #[error("invalid quantity for cart item {0}")]
    InvalidQuantity(CartItemId),

    #[error("cart total is out of range")]
    AmountOverflow,

    /// An item is not ready to be manufactured.
    #[error("{0}")]
    Incomplete(#[from] FulfillmentError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("payment provider error: {0}")]
    Payment(#[from] PaymentError),
}

/// Priced lines for one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutQuote {
    pub lines: Vec<SessionLineItem>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
}

impl CheckoutQuote {
    #[must_use]
    pub const fn total_cents(&self) -> i64 {
        self.subtotal_cents + self.shipping_cents
    }

    #[must_use]
    pub fn totals(&self) -> SnapshotTotals {
        SnapshotTotals {
            subtotal: Price::from_minor_units(self.subtotal_cents),
            shipping: Price::from_minor_units(self.shipping_cents),
            total: Price::from_minor_units(self.total_cents()),
        }
    }

    /// Sum of `unit_amount * quantity` over every line, shipping included.
    #[must_use]
    pub fn lines_sum(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| line.unit_amount * i64::from(line.quantity))
            .sum()
    }
}

/// Price a set of cart items.
///
/// Shipping is charged when the subtotal is strictly below the threshold; a
/// subtotal exactly at the threshold ships free.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for no items, and an item-level error
/// for a non-positive price or zero quantity.
pub fn build_quote(
    items: &[CartLineItem],
    settings: &CheckoutSettings,
) -> Result<CheckoutQuote, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(items.len() + 1);
    let mut subtotal_cents: i64 = 0;

    for item in items {
        if item.quantity < 1 {
            return Err(CheckoutError::InvalidQuantity(item.id));
        }
        let unit_amount = item
            .price
            .to_minor_units()
            .filter(|cents| *cents > 0)
            .ok_or(CheckoutError::InvalidPrice(item.id))?;
        let line_amount = unit_amount
            .checked_mul(i64::from(item.quantity))
            .ok_or(CheckoutError::AmountOverflow)?;
        subtotal_cents = subtotal_cents
            .checked_add(line_amount)
            .ok_or(CheckoutError::AmountOverflow)?;

        lines.push(SessionLineItem {
            name: item.product_name.clone(),
            unit_amount,
            quantity: item.quantity,
        });
    }

    let threshold_cents = settings
        .free_shipping_threshold
        .to_minor_units()
        .ok_or(CheckoutError::AmountOverflow)?;
    let flat_cents = settings
        .flat_shipping_rate
        .to_minor_units()
        .ok_or(CheckoutError::AmountOverflow)?;

    let shipping_cents = if subtotal_cents < threshold_cents && flat_cents > 0 {
        lines.push(SessionLineItem {
            name: SHIPPING_LINE_NAME.to_owned(),
            unit_amount: flat_cents,
            quantity: 1,
        });
        flat_cents
    } else {
        0
    };

    subtotal_cents
        .checked_add(shipping_cents)
        .ok_or(CheckoutError::AmountOverflow)?;

    Ok(CheckoutQuote {
        lines,
        subtotal_cents,
        shipping_cents,
    })
}

/// A checkout request after authentication.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Items to buy, by id; values come from the stored cart.
    pub item_ids: Vec<CartItemId>,
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Clone)]
pub struct CheckoutService {
    carts: Arc<dyn CartStore>,
    snapshots: Arc<dyn SnapshotStore>,
    payments: Arc<dyn PaymentProvider>,
    settings: Arc<CheckoutSettings>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartStore>,
        snapshots: Arc<dyn SnapshotStore>,
        payments: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            carts,
            snapshots,
            payments,
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Snapshot the requested items and open a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Validation variants for an empty or unknown selection, an incomplete
    /// item or a bad address; `Repository` or `Payment` when a collaborator
    /// fails.
    #[tracing::instrument(skip(self, request), fields(user_id = %user_id, items = request.item_ids.len()))]
    pub async fn create_session(
        &self,
        user_id: &UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutSessionResponse, CheckoutError> {
        if request.item_ids.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(address) = &request.shipping_address {
            address.validate()?;
        }

        let items = self.resolve_items(user_id, &request.item_ids).await?;
        validate_items(&items)?;
        let quote = build_quote(&items, &self.settings)?;

        let snapshot = self
            .snapshots
            .insert(NewSnapshot {
                user_id: user_id.clone(),
                items,
                totals: quote.totals(),
                shipping_address: request.shipping_address,
            })
            .await?;
        tracing::info!(
            snapshot_id = %snapshot.id,
            total = %snapshot.totals.total,
            "Checkout snapshot stored"
        );

        let session_request = CheckoutSessionRequest {
            currency: self.settings.currency,
            line_items: quote.lines,
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
            metadata: SessionMetadata {
                snapshot_ref: snapshot.id,
                user_id: user_id.clone(),
            },
            allowed_countries: snapshot
                .shipping_address
                .is_none()
                .then(|| self.settings.allowed_countries.clone()),
            idempotency_key: snapshot.id.to_string(),
        };

        let session = self
            .payments
            .create_checkout_session(&session_request)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    snapshot_id = %snapshot.id,
                    error = %e,
                    "Checkout session creation failed"
                );
            })?;

        Ok(session)
    }

    /// Look up each requested id in the caller's stored cart.
    async fn resolve_items(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<Vec<CartLineItem>, CheckoutError> {
        let cart = self.carts.list_for_user(user_id).await?;
        let mut seen = HashSet::with_capacity(item_ids.len());
        let mut items = Vec::with_capacity(item_ids.len());

        for id in item_ids {
            if !seen.insert(*id) {
                continue;
            }
            let item = cart
                .iter()
                .find(|item| item.id == *id)
                .ok_or(CheckoutError::UnknownItem(*id))?;
            items.push(item.clone());
        }

        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use geoart_core::{ProductCategory, VariantId};

    use super::*;

    fn settings() -> CheckoutSettings {
        CheckoutSettings::with_base_url("https://geoart.shop")
    }

    fn item(cents: i64, quantity: u32) -> CartLineItem {
        CartLineItem {
            id: CartItemId::generate(),
            user_id: UserId::new("u1"),
            product_category: ProductCategory::Mugs,
            product_name: "Paris Mug".to_owned(),
            image_url: "https://cdn.geoart.shop/paris.png".to_owned(),
            vendor_product_id: Some("prod_1".to_owned()),
            price: Price::from_minor_units(cents),
            quantity,
            variant_id: Some(VariantId::new(12_345)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_shipping_added_below_threshold() {
        let quote = build_quote(&[item(2000, 2), item(500, 1)], &settings()).unwrap();
        assert_eq!(quote.subtotal_cents, 4500);
        assert_eq!(quote.shipping_cents, 800);
        assert_eq!(quote.total_cents(), 5300);
        assert_eq!(quote.lines.len(), 3);
        let shipping = quote.lines.last().unwrap();
        assert_eq!(shipping.name, SHIPPING_LINE_NAME);
        assert_eq!(shipping.unit_amount, 800);
        assert_eq!(shipping.quantity, 1);
        assert_eq!(quote.lines_sum(), quote.total_cents());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let at = build_quote(&[item(5000, 1)], &settings()).unwrap();
        assert_eq!(at.shipping_cents, 0);
        assert_eq!(at.lines.len(), 1);

        let below = build_quote(&[item(4999, 1)], &settings()).unwrap();
        assert_eq!(below.shipping_cents, 800);
        assert_eq!(below.total_cents(), 5799);
    }

    #[test]
    fn test_line_amounts_sum_to_total() {
        let items = [item(1199, 3), item(1799, 1), item(2999, 2)];
        let quote = build_quote(&items, &settings()).unwrap();
        assert_eq!(quote.lines_sum(), quote.total_cents());
        assert_eq!(quote.totals().total, Price::from_minor_units(quote.total_cents()));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(matches!(
            build_quote(&[], &settings()),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let bad = item(0, 1);
        let id = bad.id;
        assert!(matches!(
            build_quote(&[bad], &settings()),
            Err(CheckoutError::InvalidPrice(found)) if found == id
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let bad = item(1000, 0);
        assert!(matches!(
            build_quote(&[bad], &settings()),
            Err(CheckoutError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_configured_rates() {
        let mut custom = settings();
        custom.free_shipping_threshold = Price::from_minor_units(10_000);
        custom.flat_shipping_rate = Price::from_minor_units(1250);
        let quote = build_quote(&[item(5000, 1)], &custom).unwrap();
        assert_eq!(quote.shipping_cents, 1250);
    }
}
