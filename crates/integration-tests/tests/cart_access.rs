//! Cart accessor ownership and pricing.
//!
//! Run with: cargo test -p geoart-integration-tests --test cart_access

#![allow(clippy::unwrap_used)]

use geoart_core::{CartItemId, ProductCategory, VariantId, retail_price};
use geoart_integration_tests::{TestApp, alice, bob};
use geoart_storefront::services::{CartError, CartItemDraft};

fn draft(quantity: Option<u32>) -> CartItemDraft {
    CartItemDraft {
        product_category: ProductCategory::Hoodies,
        product_name: "Lisbon Hoodie".to_owned(),
        image_url: "https://images.geoart.test/lisbon.png".to_owned(),
        vendor_product_id: Some("prod_hoodie".to_owned()),
        quantity,
    }
}

#[tokio::test]
async fn test_add_item_defaults_quantity_and_prices() {
    let app = TestApp::new();

    let item = app.state.cart().add_item(&alice(), draft(None)).await.unwrap();

    assert_eq!(item.quantity, 1);
    assert_eq!(item.price, retail_price(ProductCategory::Hoodies));
    assert_eq!(item.variant_id, None);
    assert_eq!(app.state.cart().list_cart(&alice()).await.unwrap(), vec![item]);
    assert!(app.state.cart().list_cart(&bob()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_item_requires_name() {
    let app = TestApp::new();
    let mut blank = draft(Some(2));
    blank.product_name = "  ".to_owned();

    let err = app.state.cart().add_item(&alice(), blank).await.unwrap_err();

    assert!(matches!(err, CartError::MissingField("productName")));
}

#[tokio::test]
async fn test_quantity_below_one_rejected() {
    let app = TestApp::new();
    let item = app.seed_item(&alice(), 1199, 2);

    let err = app
        .state
        .cart()
        .update_quantity(&alice(), item.id, 0)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::InvalidQuantity));
    assert_eq!(app.carts.items_for(&alice()).first().unwrap().quantity, 2);
}

#[tokio::test]
async fn test_foreign_item_untouchable() {
    let app = TestApp::new();
    let item = app.seed_item(&alice(), 1199, 1);
    let cart = app.state.cart();

    assert!(matches!(
        cart.update_quantity(&bob(), item.id, 5).await,
        Err(CartError::NotFound(id)) if id == item.id
    ));
    assert!(matches!(
        cart.set_variant(&bob(), item.id, VariantId::new(9)).await,
        Err(CartError::NotFound(_))
    ));
    assert!(matches!(
        cart.remove_item(&bob(), item.id).await,
        Err(CartError::NotFound(_))
    ));

    let untouched = app.carts.items_for(&alice()).pop().unwrap();
    assert_eq!(untouched, item);
}

#[tokio::test]
async fn test_missing_item_not_found() {
    let app = TestApp::new();

    let err = app
        .state
        .cart()
        .remove_item(&alice(), CartItemId::generate())
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::NotFound(_)));
}
