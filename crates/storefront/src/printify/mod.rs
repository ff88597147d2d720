//! Print-on-demand vendor integration (Printify).
//!
//! All calls are authenticated with one static token scoped to the
//! storefront's account and go to the configured shop.

mod client;
mod types;

use async_trait::async_trait;
use thiserror::Error;

use geoart_core::CatalogMapping;

pub use client::PrintifyClient;
pub use types::{
    AddressTo, CreatedOrder, CreatedProduct, NewProduct, OrderLineItem, OrderRequest, PlacedImage,
    Placeholder, PrintArea, ProductVariant, UploadedImage, Variant,
};

/// Errors that can occur when interacting with the Printify API.
#[derive(Debug, Error)]
pub enum PrintifyError {
    /// HTTP request failed (connection, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status; `body` is the vendor payload.
    #[error("API error: {status} - {body}")]
    Api {
        status: u16,
        body: serde_json::Value,
    },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl PrintifyError {
    /// Vendor error payload, when the vendor sent one.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Api { body, .. } => Some(body.clone()),
            Self::Http(_) | Self::Parse(_) => None,
        }
    }
}

/// Catalog, product and order operations against the print vendor.
#[async_trait]
pub trait FulfillmentProvider: Send + Sync {
    /// Variants a print provider offers for a blueprint.
    async fn list_variants(&self, mapping: CatalogMapping) -> Result<Vec<Variant>, PrintifyError>;

    /// Register an image with the vendor by URL.
    async fn upload_image(&self, file_name: &str, url: &str)
    -> Result<UploadedImage, PrintifyError>;

    async fn create_product(&self, product: &NewProduct) -> Result<CreatedProduct, PrintifyError>;

    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, PrintifyError>;
}
