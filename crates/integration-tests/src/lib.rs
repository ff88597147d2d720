//! Integration tests for GeoArt.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p geoart-integration-tests
//! ```
//!
//! No database or vendor account is needed: the storefront is assembled
//! over the in-memory collaborators below, and the HTTP clients are pointed
//! at `wiremock` servers.
//!
//! # Test Categories
//!
//! - `checkout_pipeline` - cart to snapshot to hosted session
//! - `webhook_dispatch` - signature checks, idempotency, post-payment failures
//! - `fulfillment` - operator order submission and validation
//! - `http_surface` - routing, authentication and response shapes
//! - `vendor_clients` - Stripe, Printify and Firebase clients against mock servers

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use geoart_core::{
    CartItemId, CatalogMapping, OrderId, Price, ProductCategory, ShippingAddress, SnapshotId,
    UserId, VariantId,
};
use geoart_storefront::config::CheckoutSettings;
use geoart_storefront::db::{
    CartStore, EventClaim, HealthCheck, OrderStore, RepositoryError, SnapshotStore,
};
use geoart_storefront::identity::{AuthError, IdentityVerifier};
use geoart_storefront::models::{
    CartLineItem, CheckoutSnapshot, NewCartItem, NewOrder, NewSnapshot, OrderRecord,
};
use geoart_storefront::payments::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSessionRequest, CheckoutSessionResponse, PaymentError,
    PaymentProvider, WebhookVerifier, compute_signature,
};
use geoart_storefront::printify::{
    CreatedOrder, CreatedProduct, FulfillmentProvider, NewProduct, OrderRequest, PrintifyError,
    UploadedImage, Variant,
};
use geoart_storefront::state::{AppState, StateParts};

pub const WEBHOOK_SECRET: &str = "whsec_integration_5f2c9e1a7b3d";
pub const OPERATOR_TOKEN: &str = "op_integration_9d41c7b2e8";
pub const ALICE_TOKEN: &str = "token-alice";
pub const BOB_TOKEN: &str = "token-bob";

pub fn alice() -> UserId {
    UserId::new("alice-uid")
}

pub fn bob() -> UserId {
    UserId::new("bob-uid")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Stores
// ============================================================================

#[derive(Default)]
pub struct MemoryCartStore {
    items: Mutex<Vec<CartLineItem>>,
}

impl MemoryCartStore {
    /// Put an item straight into the store, bypassing the service.
    pub fn seed(&self, item: CartLineItem) {
        lock(&self.items).push(item);
    }

    pub fn items_for(&self, user_id: &UserId) -> Vec<CartLineItem> {
        lock(&self.items)
            .iter()
            .filter(|item| &item.user_id == user_id)
            .cloned()
            .collect()
    }

    fn modify(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        change: impl FnOnce(&mut CartLineItem),
    ) -> Result<CartLineItem, RepositoryError> {
        let mut items = lock(&self.items);
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id && &item.user_id == user_id)
            .ok_or(RepositoryError::NotFound)?;
        change(item);
        Ok(item.clone())
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CartLineItem>, RepositoryError> {
        let mut items = self.items_for(user_id);
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn get(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLineItem>, RepositoryError> {
        Ok(lock(&self.items)
            .iter()
            .find(|item| item.id == item_id && &item.user_id == user_id)
            .cloned())
    }

    async fn insert(&self, item: NewCartItem) -> Result<CartLineItem, RepositoryError> {
        let stored = CartLineItem {
            id: CartItemId::generate(),
            user_id: item.user_id,
            product_category: item.product_category,
            product_name: item.product_name,
            image_url: item.image_url,
            vendor_product_id: item.vendor_product_id,
            price: item.price,
            quantity: item.quantity,
            variant_id: None,
            created_at: Utc::now(),
        };
        lock(&self.items).push(stored.clone());
        Ok(stored)
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, RepositoryError> {
        self.modify(user_id, item_id, |item| item.quantity = quantity)
    }

    async fn update_variant(
        &self,
        user_id: &UserId,
        item_id: CartItemId,
        variant_id: VariantId,
    ) -> Result<CartLineItem, RepositoryError> {
        self.modify(user_id, item_id, |item| item.variant_id = Some(variant_id))
    }

    async fn delete(&self, user_id: &UserId, item_id: CartItemId) -> Result<(), RepositoryError> {
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|item| !(item.id == item_id && &item.user_id == user_id));
        if items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_many(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|item| !(&item.user_id == user_id && item_ids.contains(&item.id)));
        Ok(u64::try_from(before - items.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<Vec<CheckoutSnapshot>>,
    fail_reads: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn all(&self) -> Vec<CheckoutSnapshot> {
        lock(&self.snapshots).clone()
    }

    /// Make `get` fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn insert(&self, snapshot: NewSnapshot) -> Result<CheckoutSnapshot, RepositoryError> {
        let stored = CheckoutSnapshot {
            id: SnapshotId::generate(),
            user_id: snapshot.user_id,
            items: snapshot.items,
            totals: snapshot.totals,
            shipping_address: snapshot.shipping_address,
            created_at: Utc::now(),
            consumed_at: None,
        };
        lock(&self.snapshots).push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: SnapshotId) -> Result<Option<CheckoutSnapshot>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "snapshot store unavailable".to_owned(),
            ));
        }
        Ok(lock(&self.snapshots)
            .iter()
            .find(|snapshot| snapshot.id == id)
            .cloned())
    }

    async fn mark_consumed(&self, id: SnapshotId) -> Result<bool, RepositoryError> {
        let mut snapshots = lock(&self.snapshots);
        match snapshots
            .iter_mut()
            .find(|snapshot| snapshot.id == id && snapshot.consumed_at.is_none())
        {
            Some(snapshot) => {
                snapshot.consumed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<OrderRecord>>,
    /// Event id to whether its dispatch completed.
    events: Mutex<HashMap<String, bool>>,
}

impl MemoryOrderStore {
    pub fn all(&self) -> Vec<OrderRecord> {
        lock(&self.orders).clone()
    }

    pub fn claimed(&self, event_id: &str) -> bool {
        lock(&self.events).contains_key(event_id)
    }

    pub fn completed(&self, event_id: &str) -> bool {
        lock(&self.events).get(event_id).copied().unwrap_or(false)
    }

    /// Leave a claim behind as if a delivery died before finishing.
    pub fn seed_pending_claim(&self, event_id: &str) {
        lock(&self.events).insert(event_id.to_owned(), false);
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError> {
        let mut orders = lock(&self.orders);
        if let Some(external_id) = &order.external_id
            && orders
                .iter()
                .any(|o| o.external_id.as_ref() == Some(external_id))
        {
            return Err(RepositoryError::Conflict(format!(
                "external id {external_id} already recorded"
            )));
        }
        let record = OrderRecord {
            id: OrderId::generate(),
            user_id: order.user_id,
            snapshot_id: order.snapshot_id,
            event_id: order.event_id,
            external_id: order.external_id,
            vendor_order_id: order.vendor_order_id,
            total: order.total,
            status: order.status,
            failure_detail: order.failure_detail,
            created_at: Utc::now(),
        };
        orders.push(record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        let mut orders: Vec<OrderRecord> = lock(&self.orders)
            .iter()
            .filter(|order| &order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn claim_event(
        &self,
        event_id: &str,
        _event_type: &str,
    ) -> Result<EventClaim, RepositoryError> {
        Ok(match lock(&self.events).entry(event_id.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(false);
                EventClaim::Claimed
            }
            Entry::Occupied(slot) if *slot.get() => EventClaim::Completed,
            Entry::Occupied(_) => EventClaim::Pending,
        })
    }

    async fn complete_event(&self, event_id: &str) -> Result<(), RepositoryError> {
        if let Some(done) = lock(&self.events).get_mut(event_id) {
            *done = true;
        }
        Ok(())
    }

    async fn release_event(&self, event_id: &str) -> Result<(), RepositoryError> {
        lock(&self.events).remove(event_id);
        Ok(())
    }
}

pub struct MemoryHealth {
    healthy: AtomicBool,
}

impl Default for MemoryHealth {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
        }
    }
}

impl MemoryHealth {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthCheck for MemoryHealth {
    async fn ping(&self) -> Result<(), RepositoryError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::DataCorruption("database unreachable".to_owned()))
        }
    }
}

// ============================================================================
// Vendors
// ============================================================================

/// Maps fixed bearer tokens to users; can simulate a key-fetch outage.
pub struct StaticIdentity {
    users: HashMap<String, UserId>,
    unavailable: AtomicBool,
}

impl StaticIdentity {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        Self {
            users: HashMap::from([
                (ALICE_TOKEN.to_owned(), alice()),
                (BOB_TOKEN.to_owned(), bob()),
            ]),
            unavailable: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentity {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::KeysUnavailable(
                "jwks fetch timed out".to_owned(),
            ));
        }
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown test token".to_owned()))
    }
}

/// Records every session request; optionally fails them.
#[derive(Default)]
pub struct RecordingPayments {
    requests: Mutex<Vec<CheckoutSessionRequest>>,
    fail: AtomicBool,
}

impl RecordingPayments {
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        lock(&self.requests).clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProvider for RecordingPayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionResponse, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 402,
                message: "sk_test_secret_detail: card_declined".to_owned(),
            });
        }
        let mut requests = lock(&self.requests);
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSessionResponse {
            url: format!("https://checkout.stripe.test/c/pay/{id}"),
            id,
        })
    }
}

/// Records vendor calls; variant listing returns two fixed variants.
#[derive(Default)]
pub struct RecordingPrintify {
    orders: Mutex<Vec<OrderRequest>>,
    products: Mutex<Vec<NewProduct>>,
    uploads: AtomicUsize,
    variant_calls: AtomicUsize,
    reject_orders: Mutex<Option<Value>>,
}

impl RecordingPrintify {
    pub fn orders(&self) -> Vec<OrderRequest> {
        lock(&self.orders).clone()
    }

    pub fn products(&self) -> Vec<NewProduct> {
        lock(&self.products).clone()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Total vendor calls of any kind.
    pub fn calls(&self) -> usize {
        self.uploads()
            + self.variant_calls.load(Ordering::SeqCst)
            + lock(&self.orders).len()
            + lock(&self.products).len()
    }

    /// Reject every order with a 422 carrying `body`.
    pub fn reject_orders_with(&self, body: Value) {
        *lock(&self.reject_orders) = Some(body);
    }
}

#[async_trait]
impl FulfillmentProvider for RecordingPrintify {
    async fn list_variants(&self, mapping: CatalogMapping) -> Result<Vec<Variant>, PrintifyError> {
        self.variant_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Variant {
                id: VariantId::new(mapping.blueprint_id * 100 + 1),
                title: "11oz / White".to_owned(),
                options: json!({ "size": "11oz", "color": "White" }),
            },
            Variant {
                id: VariantId::new(mapping.blueprint_id * 100 + 2),
                title: "15oz / White".to_owned(),
                options: json!({ "size": "15oz", "color": "White" }),
            },
        ])
    }

    async fn upload_image(
        &self,
        _file_name: &str,
        _url: &str,
    ) -> Result<UploadedImage, PrintifyError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(UploadedImage {
            id: format!("img_{n}"),
        })
    }

    async fn create_product(&self, product: &NewProduct) -> Result<CreatedProduct, PrintifyError> {
        let mut products = lock(&self.products);
        products.push(product.clone());
        Ok(CreatedProduct {
            id: format!("prod_{}", products.len()),
            title: product.title.clone(),
        })
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, PrintifyError> {
        if let Some(body) = lock(&self.reject_orders).clone() {
            return Err(PrintifyError::Api { status: 422, body });
        }
        let mut orders = lock(&self.orders);
        orders.push(order.clone());
        Ok(CreatedOrder {
            id: format!("po_{}", orders.len()),
        })
    }
}

// ============================================================================
// Assembled application
// ============================================================================

/// A storefront over in-memory collaborators, with handles to inspect them.
pub struct TestApp {
    pub state: AppState,
    pub carts: Arc<MemoryCartStore>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub orders: Arc<MemoryOrderStore>,
    pub health: Arc<MemoryHealth>,
    pub identity: Arc<StaticIdentity>,
    pub payments: Arc<RecordingPayments>,
    pub printify: Arc<RecordingPrintify>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let carts = Arc::new(MemoryCartStore::default());
        let snapshots = Arc::new(MemorySnapshotStore::default());
        let orders = Arc::new(MemoryOrderStore::default());
        let health = Arc::new(MemoryHealth::default());
        let identity = Arc::new(StaticIdentity::default());
        let payments = Arc::new(RecordingPayments::default());
        let printify = Arc::new(RecordingPrintify::default());

        let state = AppState::from_parts(StateParts {
            checkout: CheckoutSettings::with_base_url("https://geoart.test"),
            webhook_verifier: WebhookVerifier::new(
                SecretString::from(WEBHOOK_SECRET),
                Duration::from_secs(300),
            ),
            operator_token: Some(SecretString::from(OPERATOR_TOKEN)),
            carts: Arc::clone(&carts) as Arc<dyn CartStore>,
            snapshots: Arc::clone(&snapshots) as Arc<dyn SnapshotStore>,
            orders: Arc::clone(&orders) as Arc<dyn OrderStore>,
            health: Arc::clone(&health) as Arc<dyn HealthCheck>,
            identity: Arc::clone(&identity) as Arc<dyn IdentityVerifier>,
            payments: Arc::clone(&payments) as Arc<dyn PaymentProvider>,
            fulfillment: Arc::clone(&printify) as Arc<dyn FulfillmentProvider>,
        });

        Self {
            state,
            carts,
            snapshots,
            orders,
            health,
            identity,
            payments,
            printify,
        }
    }

    /// The HTTP router over this app's state.
    #[must_use]
    pub fn router(&self) -> Router {
        geoart_storefront::app(self.state.clone())
    }

    /// Seed a cart item that is ready for fulfillment.
    pub fn seed_item(&self, user_id: &UserId, price_cents: i64, quantity: u32) -> CartLineItem {
        let item = ready_item(user_id, price_cents, quantity);
        self.carts.seed(item.clone());
        item
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A cart line with a variant and vendor product chosen.
#[must_use]
pub fn ready_item(user_id: &UserId, price_cents: i64, quantity: u32) -> CartLineItem {
    let id = CartItemId::generate();
    CartLineItem {
        id,
        user_id: user_id.clone(),
        product_category: ProductCategory::Mugs,
        product_name: format!("Skyline Mug {id}"),
        image_url: "https://images.geoart.test/mockups/skyline.png".to_owned(),
        vendor_product_id: Some(format!("prod_{id}")),
        price: Price::from_minor_units(price_cents),
        quantity,
        variant_id: Some(VariantId::new(68_001)),
        created_at: Utc::now(),
    }
}

#[must_use]
pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        email: "ada@example.com".to_owned(),
        phone: None,
        country: "US".to_owned(),
        region: "NY".to_owned(),
        address1: "1 Main St".to_owned(),
        address2: None,
        city: "Springfield".to_owned(),
        zip: "10001".to_owned(),
    }
}

/// A paid `checkout.session.completed` event body.
#[must_use]
pub fn completed_event(event_id: &str, snapshot_id: SnapshotId, user_id: &UserId) -> Vec<u8> {
    session_event(
        event_id,
        CHECKOUT_SESSION_COMPLETED,
        json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": "paid",
            "amount_total": 5300,
            "metadata": {
                "snapshot_ref": snapshot_id.to_string(),
                "user_id": user_id.to_string(),
            },
        }),
    )
}

/// An event body of any type wrapping `object`.
#[must_use]
pub fn session_event(event_id: &str, event_type: &str, object: Value) -> Vec<u8> {
    json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "data": { "object": object },
    })
    .to_string()
    .into_bytes()
}

/// A valid `Stripe-Signature` header for `payload`, signed now.
#[must_use]
pub fn sign(payload: &[u8]) -> String {
    sign_at(payload, Utc::now().timestamp())
}

/// A `Stripe-Signature` header for `payload` at `timestamp`.
#[must_use]
pub fn sign_at(payload: &[u8], timestamp: i64) -> String {
    let signature = compute_signature(WEBHOOK_SECRET, timestamp, payload)
        .unwrap_or_else(|e| panic!("test secret must key the MAC: {e}"));
    format!("t={timestamp},v1={signature}")
}

// ============================================================================
// HTTP
// ============================================================================

/// A response with its body parsed as JSON (or kept as a JSON string).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Build a request with an optional bearer token and JSON body.
#[must_use]
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder
        .body(body)
        .unwrap_or_else(|e| panic!("invalid test request: {e}"))
}

/// Send one request through the router.
pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router
        .oneshot(request)
        .await
        .unwrap_or_else(|e| match e {});
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|e| panic!("unreadable response body: {e}"));
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    TestResponse {
        status,
        headers,
        body,
    }
}
