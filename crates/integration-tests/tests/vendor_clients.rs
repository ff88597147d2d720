//! HTTP clients for the payment, print and identity vendors against mock servers.
//!
//! Run with: cargo test -p geoart-integration-tests --test vendor_clients

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use geoart_core::{CurrencyCode, ProductCategory, SnapshotId, VariantId};
use geoart_integration_tests::{alice, shipping_address};
use geoart_storefront::config::{FirebaseConfig, PrintifyConfig, StripeConfig};
use geoart_storefront::identity::{AuthError, FirebaseVerifier, IdentityVerifier};
use geoart_storefront::payments::{
    CheckoutSessionRequest, PaymentError, PaymentProvider, SessionLineItem, SessionMetadata,
    StripeClient,
};
use geoart_storefront::printify::{
    AddressTo, FulfillmentProvider, OrderLineItem, OrderRequest, PrintifyClient, PrintifyError,
};

const SHOP_ID: &str = "shop-778";

fn stripe(server: &MockServer) -> StripeClient {
    let config = StripeConfig {
        secret_key: SecretString::from("sk_test_mock"),
        webhook_secret: SecretString::from("whsec_mock"),
        webhook_tolerance: Duration::from_secs(300),
    };
    StripeClient::new(&config, reqwest::Client::new()).with_base_url(server.uri())
}

fn printify(server: &MockServer) -> PrintifyClient {
    let config = PrintifyConfig {
        api_token: SecretString::from("pt_mock"),
        shop_id: SHOP_ID.to_owned(),
    };
    PrintifyClient::new(&config, reqwest::Client::new()).with_base_url(server.uri())
}

fn session_request() -> CheckoutSessionRequest {
    let snapshot_ref = SnapshotId::generate();
    CheckoutSessionRequest {
        currency: CurrencyCode::Usd,
        line_items: vec![SessionLineItem {
            name: "Skyline Mug".to_owned(),
            unit_amount: 1199,
            quantity: 1,
        }],
        success_url: "https://geoart.test/checkout/success".to_owned(),
        cancel_url: "https://geoart.test/checkout/cancel".to_owned(),
        metadata: SessionMetadata {
            snapshot_ref,
            user_id: alice(),
        },
        allowed_countries: Some(vec!["US".to_owned()]),
        idempotency_key: snapshot_ref.to_string(),
    }
}

fn order_request() -> OrderRequest {
    OrderRequest {
        external_id: "geoart_order_1_00000000000000ff".to_owned(),
        line_items: vec![OrderLineItem {
            product_id: "prod_a".to_owned(),
            variant_id: VariantId::new(47_801),
            quantity: 2,
        }],
        shipping_method: 1,
        send_shipping_notification: true,
        address_to: AddressTo::from(&shipping_address()),
    }
}

#[tokio::test]
async fn test_stripe_creates_session() {
    let server = MockServer::start().await;
    let request = session_request();

    Mock::given(method("POST"))
        .and(path("/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_mock"))
        .and(header("idempotency-key", request.idempotency_key.as_str()))
        .and(body_string_contains("mode=payment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_a1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_a1",
            "object": "checkout.session"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = stripe(&server)
        .create_checkout_session(&request)
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_a1");
    assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_a1");
}

#[tokio::test]
async fn test_stripe_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "type": "invalid_request_error", "message": "No such price" }
        })))
        .mount(&server)
        .await;

    let err = stripe(&server)
        .create_checkout_session(&session_request())
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::Api { status: 400, ref message } if message.contains("No such price")));
}

#[tokio::test]
async fn test_printify_creates_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/shops/{SHOP_ID}/orders.json")))
        .and(header("authorization", "Bearer pt_mock"))
        .and(body_partial_json(json!({
            "external_id": "geoart_order_1_00000000000000ff",
            "shipping_method": 1,
            "send_shipping_notification": true,
            "line_items": [{ "product_id": "prod_a", "variant_id": 47801, "quantity": 2 }],
            "address_to": { "first_name": "Ada", "last_name": "Lovelace", "zip": "10001" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "5a96f649b2439217d070f507" })))
        .expect(1)
        .mount(&server)
        .await;

    let created = printify(&server).create_order(&order_request()).await.unwrap();

    assert_eq!(created.id, "5a96f649b2439217d070f507");
}

#[tokio::test]
async fn test_printify_rejection_keeps_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/shops/{SHOP_ID}/orders.json")))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": "error",
            "code": 8502,
            "errors": { "reason": "Variant is disabled" }
        })))
        .mount(&server)
        .await;

    let err = printify(&server)
        .create_order(&order_request())
        .await
        .unwrap_err();

    assert!(matches!(err, PrintifyError::Api { status: 422, .. }));
    assert_eq!(
        err.details().unwrap()["errors"]["reason"],
        "Variant is disabled"
    );
}

#[tokio::test]
async fn test_printify_lists_variants() {
    let server = MockServer::start().await;
    let mapping = ProductCategory::Mugs.catalog_mapping().unwrap();

    Mock::given(method("GET"))
        .and(path(format!(
            "/catalog/blueprints/{}/print_providers/{}/variants.json",
            mapping.blueprint_id, mapping.print_provider_id
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": mapping.print_provider_id,
            "title": "Print Provider",
            "variants": [
                { "id": 47801, "title": "11oz", "options": { "size": "11oz" } },
                { "id": 47802, "title": "15oz", "options": { "size": "15oz" } }
            ]
        })))
        .mount(&server)
        .await;

    let variants = printify(&server).list_variants(mapping).await.unwrap();

    assert_eq!(variants.len(), 2);
    assert_eq!(variants.first().unwrap().id, VariantId::new(47_801));
    assert_eq!(variants.last().unwrap().title, "15oz");
}

#[tokio::test]
async fn test_firebase_keys_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let verifier = FirebaseVerifier::new(
        &FirebaseConfig {
            project_id: "geoart-test".to_owned(),
        },
        reqwest::Client::new(),
    )
    .with_jwks_url(format!("{}/jwks", server.uri()));

    // RS256 header with kid "key-1"; the signature is never checked
    let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6ImtleS0xIiwidHlwIjoiSldUIn0.eyJzdWIiOiJhYmMifQ.c2ln";
    let err = verifier.verify(token).await.unwrap_err();

    assert!(matches!(err, AuthError::KeysUnavailable(_)));
}

#[tokio::test]
async fn test_firebase_unknown_key_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .mount(&server)
        .await;

    let verifier = FirebaseVerifier::new(
        &FirebaseConfig {
            project_id: "geoart-test".to_owned(),
        },
        reqwest::Client::new(),
    )
    .with_jwks_url(format!("{}/jwks", server.uri()));

    let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6ImtleS0xIiwidHlwIjoiSldUIn0.eyJzdWIiOiJhYmMifQ.c2ln";
    let err = verifier.verify(token).await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidToken(ref m) if m.contains("key-1")));
}
