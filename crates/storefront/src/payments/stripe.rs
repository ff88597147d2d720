//! Stripe API client for hosted checkout sessions.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::types::{METADATA_SNAPSHOT_REF, METADATA_USER_ID};
use super::{CheckoutSessionRequest, CheckoutSessionResponse, PaymentError, PaymentProvider};
use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Stripe API version pinned for request and event shapes.
const API_VERSION: &str = "2025-01-27.acacia";

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: SecretString,
    base_url: String,
}

impl StripeClient {
    /// Create a new Stripe client using a shared HTTP client.
    #[must_use]
    pub fn new(config: &StripeConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            secret_key: config.secret_key.clone(),
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Send requests to a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

/// Flatten a session request into Stripe's bracketed form encoding.
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("payment_method_types[0]".to_owned(), "card".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
        (
            format!("metadata[{METADATA_SNAPSHOT_REF}]"),
            request.metadata.snapshot_ref.to_string(),
        ),
        (
            format!("metadata[{METADATA_USER_ID}]"),
            request.metadata.user_id.to_string(),
        ),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.as_str().to_owned(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    if let Some(countries) = &request.allowed_countries {
        for (i, country) in countries.iter().enumerate() {
            form.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                country.clone(),
            ));
        }
    }

    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[tracing::instrument(
        name = "stripe.create_checkout_session",
        skip_all,
        fields(snapshot_ref = %request.metadata.snapshot_ref, lines = request.line_items.len())
    )]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionResponse, PaymentError> {
        let url = format!("{}/checkout/sessions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.secret_key.expose_secret())
            .header("Stripe-Version", API_VERSION)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&session_form(request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Stripe rejected checkout session");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}
