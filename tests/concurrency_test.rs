//! Concurrent checkouts and payment processing against the same rows.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use bookstore_api::{
    entities::{payment, PaymentStatus, UserRole},
    errors::ServiceError,
    services::{orders::CreateOrderInput, payments::PaymentOutcome},
};
use common::TestApp;
use futures::future::join_all;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let app = TestApp::new().await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let book = app.seed_book("The Last Copy", dec!(20), 3).await;

    let mut buyers = Vec::new();
    for _ in 0..6 {
        let buyer = app.seed_user(UserRole::User).await;
        app.put_in_cart(buyer.model.id, &book, 1).await;
        buyers.push(buyer);
    }

    let orders = Arc::clone(&app.services().orders);
    let attempts = buyers.iter().map(|buyer| {
        let orders = Arc::clone(&orders);
        let user_id = buyer.model.id;
        let method_id = method.id;
        tokio::spawn(async move {
            orders
                .create_order(
                    user_id,
                    CreateOrderInput {
                        shipping_address: "Queue Street".into(),
                        payment_method_id: method_id,
                        cart_item_ids: None,
                    },
                )
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 3);
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_matches!(failure, ServiceError::InsufficientStock(title) if title == "The Last Copy");
    }
    assert_eq!(app.stock_of(book.id).await, 0);
}

#[tokio::test]
async fn concurrent_payment_processing_applies_exactly_once() {
    let app = TestApp::new().await;
    let buyer = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let book = app.seed_book("Twice Told Tales", dec!(9), 4).await;
    app.put_in_cart(buyer.model.id, &book, 2).await;

    let order = app
        .services()
        .orders
        .create_order(
            buyer.model.id,
            CreateOrderInput {
                shipping_address: "Salem".into(),
                payment_method_id: method.id,
                cart_item_ids: None,
            },
        )
        .await
        .unwrap();
    let payment_id = order.payment.as_ref().unwrap().id;
    assert_eq!(app.stock_of(book.id).await, 2);

    let payments = Arc::clone(&app.services().payments);
    let attempts = (0..4).map(|_| {
        let payments = Arc::clone(&payments);
        let caller = buyer.auth.clone();
        tokio::spawn(async move {
            payments
                .process_payment(&caller, payment_id, PaymentOutcome::Failed)
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_matches!(failure, ServiceError::AlreadyProcessed(status) if status == "failed");
    }

    // Restored exactly once.
    assert_eq!(app.stock_of(book.id).await, 4);
    let stored = payment::Entity::find_by_id(payment_id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
}
