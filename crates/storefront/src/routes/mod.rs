//! HTTP route handlers for the GeoArt service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Liveness
//! GET    /health/ready                 - Readiness (database reachable)
//!
//! # Cart (requires auth)
//! GET    /cart                         - Caller's cart
//! POST   /cart/items                   - Add item (priced server-side)
//! PATCH  /cart/items/{id}/quantity     - Change quantity
//! PATCH  /cart/items/{id}/variant      - Choose variant
//! DELETE /cart/items/{id}              - Remove item
//!
//! # Checkout
//! POST   /checkout/create-session      - Hosted checkout session (requires auth)
//! POST   /checkout/webhook             - Payment provider events (signed)
//!
//! # Catalog
//! GET    /catalog/variants             - Variants for ?productCategory=
//! POST   /catalog/products             - Publish a design (requires auth)
//!
//! # Orders (requires auth)
//! GET    /orders                       - Caller's orders
//!
//! # Operator
//! POST   /fulfillment/create-order     - Manual vendor order (operator token)
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod fulfillment;
pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::state::AppState;

/// Create the cart item routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(cart::add_item))
        .route("/items/{id}", delete(cart::remove_item))
        .route("/items/{id}/quantity", patch(cart::update_quantity))
        .route("/items/{id}/variant", patch(cart::set_variant))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/create-session", post(checkout::create_session))
        .route("/webhook", post(checkout::webhook))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/variants", get(catalog::variants))
        .route("/products", post(catalog::create_product))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/cart", get(cart::list))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/catalog", catalog_routes())
        .route("/orders", get(orders::list))
        .route("/fulfillment/create-order", post(fulfillment::create_order))
}
