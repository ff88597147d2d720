//! Catalog operations backed by the print vendor.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use geoart_core::{CatalogMapping, Price, ProductCategory, VariantId, retail_price};

use crate::printify::{
    CreatedProduct, FulfillmentProvider, NewProduct, PlacedImage, Placeholder, PrintArea,
    PrintifyError, ProductVariant,
};

const PRODUCT_DESCRIPTION: &str = "A unique GeoArt design inspired by cityscapes.";

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product category not supported: {0}")]
    Unsupported(ProductCategory),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Retail price is out of range")]
    PriceOutOfRange,

    #[error("print vendor error: {0}")]
    Vendor(#[from] PrintifyError),
}

/// A vendor variant with the storefront's retail price attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedVariant {
    pub id: VariantId,
    pub title: String,
    pub options: serde_json::Value,
    pub price: Price,
}

#[derive(Clone)]
pub struct CatalogService {
    vendor: Arc<dyn FulfillmentProvider>,
}

impl CatalogService {
    #[must_use]
    pub fn new(vendor: Arc<dyn FulfillmentProvider>) -> Self {
        Self { vendor }
    }

    /// Every variant of the category's blueprint, at the category's retail price.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the category has no blueprint, `Vendor` when the
    /// vendor call fails.
    pub async fn variants(
        &self,
        category: ProductCategory,
    ) -> Result<Vec<PricedVariant>, CatalogError> {
        let mapping = mapping_for(category)?;
        let price = retail_price(category);
        let variants = self.vendor.list_variants(mapping).await?;

        Ok(variants
            .into_iter()
            .map(|variant| PricedVariant {
                id: variant.id,
                title: variant.title,
                options: variant.options,
                price,
            })
            .collect())
    }

    /// Publish a design as a vendor product with every variant enabled.
    ///
    /// # Errors
    ///
    /// `Unsupported` for a category without a blueprint, `MissingField` for a
    /// blank image URL, `Vendor` when any vendor call fails.
    #[tracing::instrument(skip(self, design_image_url), fields(category = %category))]
    pub async fn create_product(
        &self,
        category: ProductCategory,
        design_image_url: &str,
    ) -> Result<CreatedProduct, CatalogError> {
        if design_image_url.trim().is_empty() {
            return Err(CatalogError::MissingField("designImageUrl"));
        }
        let mapping = mapping_for(category)?;
        let price_cents = retail_price(category)
            .to_minor_units()
            .ok_or(CatalogError::PriceOutOfRange)?;

        let file_name = design_image_url
            .rsplit('/')
            .next()
            .and_then(|name| name.split('?').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("design.png");
        let image = self.vendor.upload_image(file_name, design_image_url).await?;
        let variants = self.vendor.list_variants(mapping).await?;
        let variant_ids: Vec<VariantId> = variants.iter().map(|v| v.id).collect();

        let product = NewProduct {
            title: format!("{category} - Custom GeoArt"),
            description: PRODUCT_DESCRIPTION.to_owned(),
            blueprint_id: mapping.blueprint_id,
            print_provider_id: mapping.print_provider_id,
            variants: variant_ids
                .iter()
                .map(|id| ProductVariant {
                    id: *id,
                    price: price_cents,
                    is_enabled: true,
                })
                .collect(),
            print_areas: vec![PrintArea {
                variant_ids,
                placeholders: vec![Placeholder {
                    position: "front".to_owned(),
                    images: vec![PlacedImage::centered(image.id)],
                }],
            }],
        };

        let created = self.vendor.create_product(&product).await?;
        tracing::info!(product_id = %created.id, "Vendor product created");
        Ok(created)
    }
}

fn mapping_for(category: ProductCategory) -> Result<CatalogMapping, CatalogError> {
    category
        .catalog_mapping()
        .ok_or(CatalogError::Unsupported(category))
}
