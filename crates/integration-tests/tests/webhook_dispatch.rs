//! Payment webhook verification and dispatch.
//!
//! Run with: cargo test -p geoart-integration-tests --test webhook_dispatch

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use serde_json::json;

use geoart_core::{OrderStatus, Price, SnapshotId};
use geoart_integration_tests::{
    TestApp, alice, completed_event, session_event, shipping_address, sign, sign_at,
};
use geoart_storefront::payments::{CHECKOUT_SESSION_COMPLETED, SignatureError};
use geoart_storefront::services::{CheckoutRequest, WebhookError, WebhookOutcome};

/// Check out two items for alice and return the stored snapshot id.
async fn checkout(app: &TestApp, with_address: bool) -> SnapshotId {
    let a = app.seed_item(&alice(), 2000, 2);
    let b = app.seed_item(&alice(), 500, 1);
    app.state
        .checkout()
        .create_session(
            &alice(),
            CheckoutRequest {
                item_ids: vec![a.id, b.id],
                shipping_address: with_address.then(shipping_address),
            },
        )
        .await
        .unwrap();
    app.snapshots.all().pop().unwrap().id
}

async fn deliver(app: &TestApp, payload: &[u8]) -> Result<WebhookOutcome, WebhookError> {
    let header = sign(payload);
    app.state.webhooks().handle(payload, Some(&header)).await
}

#[tokio::test]
async fn test_paid_checkout_dispatches_one_vendor_order() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;

    let outcome = deliver(&app, &completed_event("evt_1", snapshot_id, &alice()))
        .await
        .unwrap();

    assert!(matches!(outcome, WebhookOutcome::Dispatched { ref vendor_order_id } if vendor_order_id == "po_1"));

    let vendor_orders = app.printify.orders();
    let order = vendor_orders.first().unwrap();
    assert_eq!(order.line_items.len(), 2);
    assert_eq!(order.address_to.first_name, "Ada");
    assert_eq!(order.address_to.zip, "10001");
    assert!(order.send_shipping_notification);

    let records = app.orders.all();
    let record = records.first().unwrap();
    assert_eq!(record.status, OrderStatus::Submitted);
    assert_eq!(record.snapshot_id, Some(snapshot_id));
    assert_eq!(record.event_id.as_deref(), Some("evt_1"));
    assert_eq!(record.vendor_order_id.as_deref(), Some("po_1"));
    assert_eq!(record.external_id.as_deref(), Some(order.external_id.as_str()));
    assert_eq!(record.total, Price::from_minor_units(5300));

    assert!(app.carts.items_for(&alice()).is_empty());
}

#[tokio::test]
async fn test_redelivered_event_places_no_second_order() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let payload = completed_event("evt_1", snapshot_id, &alice());

    let first = deliver(&app, &payload).await.unwrap();
    let second = deliver(&app, &payload).await.unwrap();

    assert!(matches!(first, WebhookOutcome::Dispatched { .. }));
    assert_eq!(second, WebhookOutcome::Duplicate);
    assert_eq!(app.printify.orders().len(), 1);
    assert_eq!(app.orders.all().len(), 1);
}

#[tokio::test]
async fn test_second_event_for_consumed_snapshot_is_duplicate() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;

    deliver(&app, &completed_event("evt_1", snapshot_id, &alice()))
        .await
        .unwrap();
    let outcome = deliver(&app, &completed_event("evt_2", snapshot_id, &alice()))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::Duplicate);
    assert_eq!(app.printify.orders().len(), 1);
}

#[tokio::test]
async fn test_bad_signature_rejected_before_any_work() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let payload = completed_event("evt_1", snapshot_id, &alice());
    let mut header = sign(&payload);
    header.push('0');

    let err = app
        .state
        .webhooks()
        .handle(&payload, Some(&header))
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::Signature(SignatureError::Mismatch)));
    assert_eq!(app.printify.calls(), 0);
    assert!(!app.orders.claimed("evt_1"));
}

#[tokio::test]
async fn test_tampered_body_rejected() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let header = sign(&completed_event("evt_1", snapshot_id, &alice()));
    let tampered = completed_event("evt_1", SnapshotId::generate(), &alice());

    let err = app
        .state
        .webhooks()
        .handle(&tampered, Some(&header))
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::Signature(_)));
    assert!(app.printify.orders().is_empty());
}

#[tokio::test]
async fn test_missing_signature_rejected() {
    let app = TestApp::new();
    let payload = completed_event("evt_1", SnapshotId::generate(), &alice());

    let err = app.state.webhooks().handle(&payload, None).await.unwrap_err();

    assert!(matches!(
        err,
        WebhookError::Signature(SignatureError::MissingHeader)
    ));
}

#[tokio::test]
async fn test_stale_signature_rejected() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let payload = completed_event("evt_1", snapshot_id, &alice());
    let header = sign_at(&payload, Utc::now().timestamp() - 3600);

    let err = app
        .state
        .webhooks()
        .handle(&payload, Some(&header))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WebhookError::Signature(SignatureError::TimestampOutOfTolerance)
    ));
    assert!(app.printify.orders().is_empty());
}

#[tokio::test]
async fn test_unhandled_event_type_acknowledged() {
    let app = TestApp::new();
    let payload = session_event(
        "evt_9",
        "customer.subscription.updated",
        json!({ "id": "sub_1", "object": "subscription" }),
    );

    let outcome = deliver(&app, &payload).await.unwrap();

    assert_eq!(outcome, WebhookOutcome::Ignored);
    assert_eq!(app.printify.calls(), 0);
    assert!(!app.orders.claimed("evt_9"));
}

#[tokio::test]
async fn test_unpaid_session_not_dispatched() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let payload = session_event(
        "evt_1",
        CHECKOUT_SESSION_COMPLETED,
        json!({
            "id": "cs_test_1",
            "payment_status": "unpaid",
            "metadata": { "snapshot_ref": snapshot_id.to_string() },
        }),
    );

    let outcome = deliver(&app, &payload).await.unwrap();

    assert_eq!(outcome, WebhookOutcome::AwaitingPayment);
    assert!(app.printify.orders().is_empty());
    assert!(app.orders.all().is_empty());
}

#[tokio::test]
async fn test_vendor_rejection_leaves_failed_record() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    app.printify
        .reject_orders_with(json!({ "errors": { "reason": "invalid address" } }));

    let outcome = deliver(&app, &completed_event("evt_1", snapshot_id, &alice()))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::NeedsAttention);
    let records = app.orders.all();
    let record = records.first().unwrap();
    assert_eq!(record.status, OrderStatus::Failed);
    assert_eq!(record.vendor_order_id, None);
    assert!(
        record
            .failure_detail
            .as_deref()
            .unwrap()
            .contains("invalid address")
    );
    // the claim is kept
    assert!(app.orders.claimed("evt_1"));
    assert_eq!(app.carts.items_for(&alice()).len(), 2);
}

#[tokio::test]
async fn test_no_address_means_no_order() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, false).await;

    let outcome = deliver(&app, &completed_event("evt_1", snapshot_id, &alice()))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::NeedsAttention);
    assert!(app.printify.orders().is_empty());
    let record = app.orders.all().pop().unwrap();
    assert_eq!(record.status, OrderStatus::Failed);
}

#[tokio::test]
async fn test_session_collected_address_used() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, false).await;
    let payload = session_event(
        "evt_1",
        CHECKOUT_SESSION_COMPLETED,
        json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "metadata": {
                "snapshot_ref": snapshot_id.to_string(),
                "user_id": alice().to_string(),
            },
            "customer_details": { "email": "grace@example.com", "name": "Grace Hopper" },
            "collected_information": {
                "shipping_details": {
                    "name": "Grace Hopper",
                    "address": {
                        "line1": "200 Navy Way",
                        "city": "Arlington",
                        "state": "VA",
                        "postal_code": "22201",
                        "country": "US"
                    }
                }
            }
        }),
    );

    let outcome = deliver(&app, &payload).await.unwrap();

    assert!(matches!(outcome, WebhookOutcome::Dispatched { .. }));
    let order = app.printify.orders().pop().unwrap();
    assert_eq!(order.address_to.first_name, "Grace");
    assert_eq!(order.address_to.last_name, "Hopper");
    assert_eq!(order.address_to.email, "grace@example.com");
    assert_eq!(order.address_to.region, "VA");
}

#[tokio::test]
async fn test_single_collected_name_still_ships() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, false).await;
    let payload = session_event(
        "evt_1",
        CHECKOUT_SESSION_COMPLETED,
        json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "metadata": {
                "snapshot_ref": snapshot_id.to_string(),
                "user_id": alice().to_string(),
            },
            "customer_details": { "email": "cher@example.com", "name": "Cher" },
            "shipping_details": {
                "name": "Cher",
                "address": {
                    "line1": "1 Sunset Blvd",
                    "city": "Los Angeles",
                    "state": "CA",
                    "postal_code": "90028",
                    "country": "US"
                }
            }
        }),
    );

    let outcome = deliver(&app, &payload).await.unwrap();

    assert!(matches!(outcome, WebhookOutcome::Dispatched { .. }));
    let order = app.printify.orders().pop().unwrap();
    assert_eq!(order.address_to.first_name, "Cher");
    assert_eq!(order.address_to.last_name, "Cher");
    assert_eq!(app.orders.all().pop().unwrap().status, OrderStatus::Submitted);
}

#[tokio::test]
async fn test_unknown_snapshot_recorded_for_reconciliation() {
    let app = TestApp::new();

    let outcome = deliver(
        &app,
        &completed_event("evt_1", SnapshotId::generate(), &alice()),
    )
    .await
    .unwrap();

    assert_eq!(outcome, WebhookOutcome::NeedsAttention);
    assert!(app.printify.orders().is_empty());
    let record = app.orders.all().pop().unwrap();
    assert_eq!(record.user_id, alice());
    assert_eq!(record.status, OrderStatus::Failed);
    assert_eq!(record.total, Price::from_minor_units(5300));
}

#[tokio::test]
async fn test_store_failure_releases_claim_for_redelivery() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let payload = completed_event("evt_1", snapshot_id, &alice());

    app.snapshots.set_fail_reads(true);
    let err = deliver(&app, &payload).await.unwrap_err();
    assert!(matches!(err, WebhookError::Repository(_)));
    assert!(!app.orders.claimed("evt_1"));
    assert!(app.printify.orders().is_empty());

    app.snapshots.set_fail_reads(false);
    let outcome = deliver(&app, &payload).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Dispatched { .. }));
    assert_eq!(app.printify.orders().len(), 1);
}

#[tokio::test]
async fn test_unfinished_claim_is_resumed() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, true).await;
    let payload = completed_event("evt_1", snapshot_id, &alice());
    app.orders.seed_pending_claim("evt_1");

    let resumed = deliver(&app, &payload).await.unwrap();
    assert!(matches!(resumed, WebhookOutcome::Dispatched { .. }));
    assert!(app.orders.completed("evt_1"));
    assert_eq!(app.printify.orders().len(), 1);

    let again = deliver(&app, &payload).await.unwrap();
    assert_eq!(again, WebhookOutcome::Duplicate);
    assert_eq!(app.printify.orders().len(), 1);
}

#[tokio::test]
async fn test_finished_delivery_completes_claim() {
    let app = TestApp::new();
    let snapshot_id = checkout(&app, false).await;

    let outcome = deliver(&app, &completed_event("evt_1", snapshot_id, &alice()))
        .await
        .unwrap();

    // Acknowledged failures count as finished
    assert_eq!(outcome, WebhookOutcome::NeedsAttention);
    assert!(app.orders.completed("evt_1"));
}
