//! Printify request and response payloads.

use serde::{Deserialize, Serialize};

use geoart_core::{ShippingAddress, VariantId};

/// A SKU variant of a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    /// Vendor-defined option map (size, color, ...).
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariantsResponse {
    pub variants: Vec<Variant>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadImageRequest<'a> {
    pub file_name: &'a str,
    pub url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    pub id: String,
}

/// Product creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub blueprint_id: i64,
    pub print_provider_id: i64,
    pub variants: Vec<ProductVariant>,
    pub print_areas: Vec<PrintArea>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductVariant {
    pub id: VariantId,
    /// Retail price in minor units.
    pub price: i64,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintArea {
    pub variant_ids: Vec<VariantId>,
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Placeholder {
    pub position: String,
    pub images: Vec<PlacedImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedImage {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub angle: i32,
}

impl PlacedImage {
    /// Image centered on the print area at full scale.
    #[must_use]
    pub fn centered(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            angle: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedProduct {
    pub id: String,
    pub title: String,
}

/// Order creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub external_id: String,
    pub line_items: Vec<OrderLineItem>,
    /// 1 = standard shipping.
    pub shipping_method: u32,
    pub send_shipping_notification: bool,
    pub address_to: AddressTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineItem {
    pub product_id: String,
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Shipping address in the vendor's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressTo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub country: String,
    pub region: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub zip: String,
}

impl From<&ShippingAddress> for AddressTo {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            email: address.email.clone(),
            phone: address.phone.clone(),
            country: address.country.to_ascii_uppercase(),
            region: address.region.clone(),
            address1: address.address1.clone(),
            address2: address.address2.clone(),
            city: address.city.clone(),
            zip: address.zip.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
}
