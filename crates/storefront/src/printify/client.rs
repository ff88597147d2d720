//! Printify REST client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use geoart_core::CatalogMapping;

use super::types::{UploadImageRequest, VariantsResponse};
use super::{
    CreatedOrder, CreatedProduct, FulfillmentProvider, NewProduct, OrderRequest, PrintifyError,
    UploadedImage, Variant,
};
use crate::config::PrintifyConfig;

/// Printify API base URL.
const BASE_URL: &str = "https://api.printify.com/v1";

const CLIENT_USER_AGENT: &str = "GeoArt-App";

/// Printify API client bound to one shop.
#[derive(Clone)]
pub struct PrintifyClient {
    client: reqwest::Client,
    api_token: SecretString,
    shop_id: String,
    base_url: String,
}

impl PrintifyClient {
    /// Create a new Printify client using a shared HTTP client.
    #[must_use]
    pub fn new(config: &PrintifyConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_token: config.api_token.clone(),
            shop_id: config.shop_id.clone(),
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Send requests to a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PrintifyError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(self.api_token.expose_secret())
            .headers(Self::headers())
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, PrintifyError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.api_token.expose_secret())
            .headers(Self::headers())
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PrintifyError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            return Err(PrintifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PrintifyError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FulfillmentProvider for PrintifyClient {
    #[tracing::instrument(
        name = "printify.list_variants",
        skip(self),
        fields(blueprint_id = mapping.blueprint_id, print_provider_id = mapping.print_provider_id)
    )]
    async fn list_variants(&self, mapping: CatalogMapping) -> Result<Vec<Variant>, PrintifyError> {
        let path = format!(
            "/catalog/blueprints/{}/print_providers/{}/variants.json",
            mapping.blueprint_id, mapping.print_provider_id
        );
        let response: VariantsResponse = self.get(&path).await?;
        Ok(response.variants)
    }

    #[tracing::instrument(name = "printify.upload_image", skip(self, url))]
    async fn upload_image(
        &self,
        file_name: &str,
        url: &str,
    ) -> Result<UploadedImage, PrintifyError> {
        self.post("/uploads/images.json", &UploadImageRequest { file_name, url })
            .await
    }

    #[tracing::instrument(name = "printify.create_product", skip_all, fields(title = %product.title))]
    async fn create_product(&self, product: &NewProduct) -> Result<CreatedProduct, PrintifyError> {
        let path = format!("/shops/{}/products.json", self.shop_id);
        self.post(&path, product).await
    }

    #[tracing::instrument(
        name = "printify.create_order",
        skip_all,
        fields(external_id = %order.external_id, lines = order.line_items.len())
    )]
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, PrintifyError> {
        let path = format!("/shops/{}/orders.json", self.shop_id);
        let created: CreatedOrder = self.post(&path, order).await?;
        tracing::info!(vendor_order_id = %created.id, "Printify order created");
        Ok(created)
    }
}
