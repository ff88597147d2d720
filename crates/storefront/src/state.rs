//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;

use crate::config::{CheckoutSettings, GeoArtConfig};
use crate::db::{
    CartRepository, CartStore, HealthCheck, OrderRepository, OrderStore, SnapshotRepository,
    SnapshotStore,
};
use crate::identity::{FirebaseVerifier, IdentityVerifier};
use crate::payments::{PaymentProvider, StripeClient, WebhookVerifier};
use crate::printify::{FulfillmentProvider, PrintifyClient};
use crate::services::{
    CartService, CatalogService, CheckoutService, FulfillmentService, WebhookService,
};

/// Error building the shared HTTP client.
#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct StateError(#[from] reqwest::Error);

/// Collaborators the state is assembled from.
///
/// Production code gets these from [`AppState::new`]; tests substitute
/// in-memory stores and fake vendors.
pub struct StateParts {
    pub checkout: CheckoutSettings,
    pub webhook_verifier: WebhookVerifier,
    pub operator_token: Option<SecretString>,
    pub carts: Arc<dyn CartStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub orders: Arc<dyn OrderStore>,
    pub health: Arc<dyn HealthCheck>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub payments: Arc<dyn PaymentProvider>,
    pub fulfillment: Arc<dyn FulfillmentProvider>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the services and collaborators every handler needs.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    operator_token: Option<SecretString>,
    identity: Arc<dyn IdentityVerifier>,
    health: Arc<dyn HealthCheck>,
    orders: Arc<dyn OrderStore>,
    cart: CartService,
    checkout: CheckoutService,
    fulfillment: FulfillmentService,
    webhooks: WebhookService,
    catalog: CatalogService,
}

impl AppState {
    /// Create the production state: `PostgreSQL` stores and live vendor clients.
    ///
    /// # Arguments
    ///
    /// * `config` - GeoArt configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GeoArtConfig, pool: PgPool) -> Result<Self, StateError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self::from_parts(StateParts {
            checkout: config.checkout.clone(),
            webhook_verifier: WebhookVerifier::new(
                config.stripe.webhook_secret.clone(),
                config.stripe.webhook_tolerance,
            ),
            operator_token: config.operator_token.clone(),
            carts: Arc::new(CartRepository::new(pool.clone())),
            snapshots: Arc::new(SnapshotRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            health: Arc::new(pool),
            identity: Arc::new(FirebaseVerifier::new(&config.firebase, http.clone())),
            payments: Arc::new(StripeClient::new(&config.stripe, http.clone())),
            fulfillment: Arc::new(PrintifyClient::new(&config.printify, http)),
        }))
    }

    /// Assemble state from explicit collaborators.
    #[must_use]
    pub fn from_parts(parts: StateParts) -> Self {
        let cart = CartService::new(Arc::clone(&parts.carts));
        let fulfillment = FulfillmentService::new(Arc::clone(&parts.fulfillment));
        let checkout = CheckoutService::new(
            Arc::clone(&parts.carts),
            Arc::clone(&parts.snapshots),
            parts.payments,
            parts.checkout,
        );
        let webhooks = WebhookService::new(
            parts.webhook_verifier,
            parts.snapshots,
            Arc::clone(&parts.orders),
            fulfillment.clone(),
            cart.clone(),
        );
        let catalog = CatalogService::new(parts.fulfillment);

        Self {
            inner: Arc::new(AppStateInner {
                operator_token: parts.operator_token,
                identity: parts.identity,
                health: parts.health,
                orders: parts.orders,
                cart,
                checkout,
                fulfillment,
                webhooks,
                catalog,
            }),
        }
    }

    /// Bearer token for operator endpoints, if enabled.
    #[must_use]
    pub fn operator_token(&self) -> Option<&SecretString> {
        self.inner.operator_token.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityVerifier {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn health(&self) -> &dyn HealthCheck {
        self.inner.health.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.inner.fulfillment
    }

    #[must_use]
    pub fn webhooks(&self) -> &WebhookService {
        &self.inner.webhooks
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
