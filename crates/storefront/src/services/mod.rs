//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Cart store accessor (ownership-checked line item CRUD)
//! - `checkout` - Checkout session builder and the pure quote calculation
//! - `fulfillment` - Fulfillment order validation and submission
//! - `webhook` - Payment webhook verification and dispatch
//! - `catalog` - Vendor variants and product publishing

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod fulfillment;
pub mod webhook;

pub use cart::{CartError, CartItemDraft, CartService};
pub use catalog::{CatalogError, CatalogService, PricedVariant};
pub use checkout::{CheckoutError, CheckoutQuote, CheckoutRequest, CheckoutService, build_quote};
pub use fulfillment::{
    FulfillmentError, FulfillmentLine, FulfillmentService, SubmittedOrder, generate_external_id,
    validate_items, validate_lines,
};
pub use webhook::{WebhookError, WebhookOutcome, WebhookService};
