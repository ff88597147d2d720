//! Catalog route handlers.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use geoart_core::ProductCategory;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::PricedVariant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantsQuery {
    pub product_category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VariantsResponse {
    pub variants: Vec<PricedVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub product_category: String,
    pub design_image_url: String,
}

/// List a category's variants at the storefront's retail price.
#[instrument(skip_all)]
pub async fn variants(
    State(state): State<AppState>,
    query: std::result::Result<Query<VariantsQuery>, QueryRejection>,
) -> Result<Json<VariantsResponse>> {
    let Query(query) = query?;
    let category = parse_category(query.product_category.as_deref())?;
    let variants = state.catalog().variants(category).await?;
    Ok(Json(VariantsResponse { variants }))
}

/// Publish a design as a vendor product.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: std::result::Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = body?;
    let category = parse_category(Some(&body.product_category))?;
    let product = state
        .catalog()
        .create_product(category, &body.design_image_url)
        .await?;

    Ok(Json(
        json!({ "product": { "id": product.id, "title": product.title } }),
    ))
}

fn parse_category(raw: Option<&str>) -> Result<ProductCategory> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation("productCategory is required".to_owned()))?;
    Ok(raw.parse()?)
}
