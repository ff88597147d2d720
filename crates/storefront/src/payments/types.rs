//! Stripe request and event types.

use std::collections::HashMap;

use serde::Deserialize;

use geoart_core::{CurrencyCode, ShippingAddress, SnapshotId, UserId};

/// Event type that triggers fulfillment.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Metadata keys attached to every checkout session.
pub(crate) const METADATA_SNAPSHOT_REF: &str = "snapshot_ref";
pub(crate) const METADATA_USER_ID: &str = "user_id";

/// One priced line on the hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    /// Unit amount in minor units.
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Correlation data carried through the payment provider.
///
/// Only references travel in metadata; the cart itself stays in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub snapshot_ref: SnapshotId,
    pub user_id: UserId,
}

/// Everything needed to open a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub currency: CurrencyCode,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: SessionMetadata,
    /// Countries the hosted page may collect a shipping address for.
    ///
    /// `None` when the address is already known; the page then asks for none.
    pub allowed_countries: Option<Vec<String>>,
    /// Replays with the same key return the original session.
    pub idempotency_key: String,
}

/// A created hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
    pub url: String,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// The event object as a checkout session.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if the object is not a session.
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, serde_json::Error> {
        CheckoutSessionObject::deserialize(&self.data.object)
    }
}

/// The subset of a checkout session object the dispatcher reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Older API versions put collected shipping here.
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
    #[serde(default)]
    pub collected_information: Option<CollectedInformation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<StripeAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedInformation {
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<StripeAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl CheckoutSessionObject {
    /// Whether the session has been paid for.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            Some("paid" | "no_payment_required")
        )
    }

    pub fn snapshot_ref(&self) -> Option<&str> {
        self.metadata.get(METADATA_SNAPSHOT_REF).map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_USER_ID).map(String::as_str)
    }

    /// The shipping address the hosted page collected, if complete.
    ///
    /// Returns `None` rather than filling gaps; an incomplete address must
    /// never reach the print vendor.
    #[must_use]
    pub fn collected_shipping_address(&self) -> Option<ShippingAddress> {
        let details = self
            .collected_information
            .as_ref()
            .and_then(|info| info.shipping_details.as_ref())
            .or(self.shipping_details.as_ref())?;
        let address = details.address.as_ref()?;
        let customer = self.customer_details.as_ref();

        let full_name = details
            .name
            .as_deref()
            .or_else(|| customer.and_then(|c| c.name.as_deref()))?;
        let (first_name, last_name) = ShippingAddress::split_name(full_name);

        let shipping = ShippingAddress {
            first_name,
            last_name,
            email: customer.and_then(|c| c.email.clone())?,
            phone: details
                .phone
                .clone()
                .or_else(|| customer.and_then(|c| c.phone.clone())),
            country: address.country.clone()?,
            region: address.state.clone().unwrap_or_default(),
            address1: address.line1.clone()?,
            address2: address.line2.clone().filter(|line| !line.is_empty()),
            city: address.city.clone()?,
            zip: address.postal_code.clone()?,
        };

        shipping.validate().ok().map(|()| shipping)
    }
}
