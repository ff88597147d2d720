//! Payment provider integration (Stripe).
//!
//! - [`StripeClient`] creates hosted checkout sessions.
//! - [`WebhookVerifier`] authenticates inbound webhook deliveries and parses
//!   them into [`StripeEvent`]s.

mod signature;
mod stripe;
mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use signature::{SIGNATURE_HEADER, SignatureError, WebhookVerifier, compute_signature};
pub use stripe::StripeClient;
pub use types::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSessionObject, CheckoutSessionRequest,
    CheckoutSessionResponse, CollectedInformation, CustomerDetails, EventData, SessionLineItem,
    SessionMetadata, ShippingDetails, StripeAddress, StripeEvent,
};

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed (connection, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Creates hosted payment pages.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionResponse, PaymentError>;
}
