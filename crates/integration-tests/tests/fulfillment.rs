//! Operator order submission and fulfillment validation.
//!
//! Run with: cargo test -p geoart-integration-tests --test fulfillment

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use geoart_core::{Price, VariantId};
use geoart_integration_tests::{
    ALICE_TOKEN, OPERATOR_TOKEN, TestApp, request, send, shipping_address,
};
use geoart_storefront::services::{FulfillmentError, FulfillmentLine};

fn line(reference: &str, variant: Option<i64>, price_cents: Option<i64>) -> FulfillmentLine {
    FulfillmentLine {
        reference: reference.to_owned(),
        vendor_product_id: Some(reference.to_owned()),
        variant_id: variant.map(VariantId::new),
        quantity: 1,
        price: price_cents.map(Price::from_minor_units),
    }
}

fn order_body(items: Value) -> Value {
    json!({ "cartItems": items, "shippingAddress": shipping_address() })
}

#[tokio::test]
async fn test_missing_variant_never_reaches_vendor() {
    let app = TestApp::new();
    let lines = [line("prod_a", Some(1), Some(1000)), line("prod_b", None, Some(1000))];

    let err = app
        .state
        .fulfillment()
        .submit_order(&lines, &shipping_address())
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::MissingVariant(ref r) if r == "prod_b"));
    assert_eq!(app.printify.calls(), 0);
}

#[tokio::test]
async fn test_non_positive_price_never_reaches_vendor() {
    let app = TestApp::new();
    let lines = [line("prod_a", Some(1), Some(0))];

    let err = app
        .state
        .fulfillment()
        .submit_order(&lines, &shipping_address())
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::InvalidPrice(ref r) if r == "prod_a"));
    assert_eq!(app.printify.calls(), 0);
}

#[tokio::test]
async fn test_incomplete_address_never_reaches_vendor() {
    let app = TestApp::new();
    let mut address = shipping_address();
    address.zip = String::new();

    let err = app
        .state
        .fulfillment()
        .submit_order(&[line("prod_a", Some(1), Some(1000))], &address)
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::Address(_)));
    assert_eq!(app.printify.calls(), 0);
}

#[tokio::test]
async fn test_submitted_total_and_payload() {
    let app = TestApp::new();
    let mut second = line("prod_b", Some(2), Some(550));
    second.quantity = 3;
    let lines = [line("prod_a", Some(1), Some(1999)), second];

    let submitted = app
        .state
        .fulfillment()
        .submit_order(&lines, &shipping_address())
        .await
        .unwrap();

    assert_eq!(submitted.total, Price::from_minor_units(3649));
    assert_eq!(submitted.vendor_order_id, "po_1");
    assert!(submitted.external_id.starts_with("geoart_order_"));

    let order = app.printify.orders().pop().unwrap();
    assert_eq!(order.external_id, submitted.external_id);
    assert_eq!(order.shipping_method, 1);
    let quantities: Vec<u32> = order.line_items.iter().map(|l| l.quantity).collect();
    assert_eq!(quantities, vec![1, 3]);
}

#[tokio::test]
async fn test_operator_route_requires_token() {
    let app = TestApp::new();
    let body = order_body(json!([{
        "printifyProductId": "prod_a", "variant_id": 1, "quantity": 1, "price": 10
    }]));

    let anonymous = send(
        app.router(),
        request(Method::POST, "/fulfillment/create-order", None, Some(&body)),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let shopper = send(
        app.router(),
        request(
            Method::POST,
            "/fulfillment/create-order",
            Some(ALICE_TOKEN),
            Some(&body),
        ),
    )
    .await;
    assert_eq!(shopper.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.printify.calls(), 0);
}

#[tokio::test]
async fn test_operator_route_submits_order() {
    let app = TestApp::new();
    let body = order_body(json!([
        { "printifyProductId": "prod_a", "variant_id": 1, "quantity": 2, "price": 11.99 },
        { "vendorProductId": "prod_b", "variantId": 2, "quantity": 1, "price": 20 }
    ]));

    let response = send(
        app.router(),
        request(
            Method::POST,
            "/fulfillment/create-order",
            Some(OPERATOR_TOKEN),
            Some(&body),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["order"]["id"], "po_1");
    let total: Price = serde_json::from_value(response.body["order"]["total"].clone()).unwrap();
    assert_eq!(total, Price::from_minor_units(4398));
}

#[tokio::test]
async fn test_operator_route_reports_missing_variant() {
    let app = TestApp::new();
    let body = order_body(json!([
        { "printifyProductId": "prod_a", "quantity": 1, "price": "ten" }
    ]));

    let response = send(
        app.router(),
        request(
            Method::POST,
            "/fulfillment/create-order",
            Some(OPERATOR_TOKEN),
            Some(&body),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({ "error": "Missing variant selection for product prod_a" })
    );
    assert_eq!(app.printify.calls(), 0);
}

#[tokio::test]
async fn test_operator_route_reports_non_numeric_price() {
    let app = TestApp::new();
    let body = order_body(json!([
        { "printifyProductId": "prod_a", "variant_id": 1, "quantity": 1, "price": "ten" }
    ]));

    let response = send(
        app.router(),
        request(
            Method::POST,
            "/fulfillment/create-order",
            Some(OPERATOR_TOKEN),
            Some(&body),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({ "error": "Invalid price detected for product prod_a" })
    );
}

#[tokio::test]
async fn test_operator_route_surfaces_vendor_details() {
    let app = TestApp::new();
    app.printify
        .reject_orders_with(json!({ "errors": { "reason": "variant out of stock" } }));
    let body = order_body(json!([
        { "printifyProductId": "prod_a", "variant_id": 1, "quantity": 1, "price": 10 }
    ]));

    let response = send(
        app.router(),
        request(
            Method::POST,
            "/fulfillment/create-order",
            Some(OPERATOR_TOKEN),
            Some(&body),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to create order");
    assert_eq!(
        response.body["details"]["errors"]["reason"],
        "variant out of stock"
    );
}
