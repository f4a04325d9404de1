//! Checkout and payment integration tests.
//!
//! Covers the cart-to-order conversion, the one-shot payment transition and
//! the stock compensation applied when a payment fails.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use bookstore_api::{
    entities::{order, OrderStatus, UserRole},
    errors::ServiceError,
    services::{orders::CreateOrderInput, payments::PaymentOutcome},
};
use common::{decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

#[tokio::test]
async fn checkout_reserves_stock_and_failed_payment_restores_it() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let dune = app.seed_book("Dune", dec!(5), 3).await;
    let emma = app.seed_book("Emma", dec!(10), 1).await;
    app.put_in_cart(reader.model.id, &dune, 2).await;
    app.put_in_cart(reader.model.id, &emma, 1).await;

    let response = app
        .request_as(
            &reader,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "shippingAddress": "221B Baker Street",
                "paymentMethodId": method.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Order created successfully");

    let created = &body["data"];
    assert_eq!(decimal(&created["total"]), dec!(20));
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["items"].as_array().unwrap().len(), 2);
    assert_eq!(created["payment"]["status"], "PENDING");
    assert_eq!(decimal(&created["payment"]["total"]), dec!(20));
    assert!(created["payment"]["paymentDate"].is_null());

    assert_eq!(app.stock_of(dune.id).await, 1);
    assert_eq!(app.stock_of(emma.id).await, 0);
    assert!(app.cart_items_of(reader.model.id).await.is_empty());
    assert_eq!(app.cart_of(reader.model.id).await.total, dec!(0));

    let payment_id = created["payment"]["id"].as_str().unwrap().to_string();
    let order_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .request_as(
            &reader,
            Method::POST,
            &format!("/api/v1/payments/{payment_id}/process"),
            Some(json!({ "status": "FAILED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "FAILED");
    assert!(!body["data"]["paymentDate"].is_null());

    assert_eq!(app.stock_of(dune.id).await, 3);
    assert_eq!(app.stock_of(emma.id).await, 1);

    let response = app
        .request_as(&reader, Method::GET, &format!("/api/v1/orders/{order_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "CANCELLED");
    assert_eq!(body["data"]["payment"]["status"], "FAILED");
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_whole_checkout() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let plenty = app.seed_book("Middlemarch", dec!(8), 10).await;
    let scarce = app.seed_book("Zazie", dec!(7), 1).await;
    app.put_in_cart(reader.model.id, &plenty, 2).await;
    app.put_in_cart(reader.model.id, &scarce, 5).await;
    let cart_total_before = app.cart_of(reader.model.id).await.total;

    let response = app
        .request_as(
            &reader,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "shippingAddress": "12 Rue de Rivoli",
                "paymentMethodId": method.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Insufficient stock for Zazie");

    assert_eq!(app.stock_of(plenty.id).await, 10);
    assert_eq!(app.stock_of(scarce.id).await, 1);
    assert_eq!(app.cart_items_of(reader.model.id).await.len(), 2);
    assert_eq!(app.cart_of(reader.model.id).await.total, cart_total_before);

    let orders = order::Entity::find().all(app.db()).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn partial_checkout_keeps_unselected_lines_and_recomputes_cart_total() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("PayPal", true).await;
    let first = app.seed_book("Beloved", dec!(12), 5).await;
    let second = app.seed_book("Ulysses", dec!(15), 5).await;
    let chosen = app.put_in_cart(reader.model.id, &first, 2).await;
    let kept = app.put_in_cart(reader.model.id, &second, 1).await;

    let order = app
        .services()
        .orders
        .create_order(
            reader.model.id,
            CreateOrderInput {
                shipping_address: "1 Infinite Loop".into(),
                payment_method_id: method.id,
                cart_item_ids: Some(vec![chosen.id]),
            },
        )
        .await
        .expect("partial checkout");

    assert_eq!(order.total, dec!(24));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].book_id, first.id);

    let remaining = app.cart_items_of(reader.model.id).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
    assert_eq!(app.cart_of(reader.model.id).await.total, dec!(15));
    assert_eq!(app.stock_of(first.id).await, 3);
    assert_eq!(app.stock_of(second.id).await, 5);
}

#[tokio::test]
async fn empty_selection_checks_out_the_whole_cart() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let first = app.seed_book("Middlemarch", dec!(11), 4).await;
    let second = app.seed_book("Walden", dec!(6), 2).await;
    app.put_in_cart(reader.model.id, &first, 1).await;
    app.put_in_cart(reader.model.id, &second, 2).await;

    let response = app
        .request_as(
            &reader,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "shippingAddress": "9 Concord Turnpike",
                "paymentMethodId": method.id,
                "cartItemIds": [],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(decimal(&body["data"]["total"]), dec!(23));

    assert!(app.cart_items_of(reader.model.id).await.is_empty());
    assert_eq!(app.cart_of(reader.model.id).await.total, dec!(0));
    assert_eq!(app.stock_of(first.id).await, 3);
    assert_eq!(app.stock_of(second.id).await, 0);
}

#[tokio::test]
async fn checkout_rejects_empty_cart_and_unknown_selection() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let orders = &app.services().orders;

    let err = orders
        .create_order(
            reader.model.id,
            CreateOrderInput {
                shipping_address: "Nowhere".into(),
                payment_method_id: method.id,
                cart_item_ids: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::EmptyCart(ref msg) if msg == "Cart is empty");

    let book = app.seed_book("Persuasion", dec!(9), 4).await;
    app.put_in_cart(reader.model.id, &book, 1).await;

    let err = orders
        .create_order(
            reader.model.id,
            CreateOrderInput {
                shipping_address: "Nowhere".into(),
                payment_method_id: method.id,
                cart_item_ids: Some(vec![uuid::Uuid::new_v4()]),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::EmptyCart(ref msg) if msg == "No valid items selected for checkout"
    );
    assert_eq!(app.stock_of(book.id).await, 4);
}

#[tokio::test]
async fn inactive_or_unknown_payment_method_is_not_found() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let retired = app.seed_payment_method("Cheque", false).await;
    let book = app.seed_book("Walden", dec!(6), 2).await;
    app.put_in_cart(reader.model.id, &book, 1).await;

    for method_id in [retired.id, uuid::Uuid::new_v4()] {
        let response = app
            .request_as(
                &reader,
                Method::POST,
                "/api/v1/orders",
                Some(json!({
                    "shippingAddress": "Concord, Massachusetts",
                    "paymentMethodId": method_id,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Payment method not found");
    }

    assert_eq!(app.stock_of(book.id).await, 2);
    assert_eq!(app.cart_items_of(reader.model.id).await.len(), 1);
}

#[tokio::test]
async fn order_items_keep_the_price_paid() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let admin = app.seed_user(UserRole::Admin).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let book = app.seed_book("Candide", dec!(11), 3).await;
    app.put_in_cart(reader.model.id, &book, 1).await;

    let order = app
        .services()
        .orders
        .create_order(
            reader.model.id,
            CreateOrderInput {
                shipping_address: "Geneva".into(),
                payment_method_id: method.id,
                cart_item_ids: None,
            },
        )
        .await
        .unwrap();

    let response = app
        .request_as(
            &admin,
            Method::PUT,
            &format!("/api/v1/books/{}", book.id),
            Some(json!({ "price": "19.50" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let reloaded = app
        .services()
        .orders
        .get_order(&reader.auth, order.id)
        .await
        .unwrap();
    assert_eq!(reloaded.items[0].price, dec!(11));
    assert_eq!(reloaded.total, dec!(11));
}

#[tokio::test]
async fn completed_payment_moves_order_to_processing_once() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let book = app.seed_book("Kindred", dec!(14), 2).await;
    app.put_in_cart(reader.model.id, &book, 1).await;

    let order = app
        .services()
        .orders
        .create_order(
            reader.model.id,
            CreateOrderInput {
                shipping_address: "Pasadena".into(),
                payment_method_id: method.id,
                cart_item_ids: None,
            },
        )
        .await
        .unwrap();
    let payment_id = order.payment.as_ref().unwrap().id;
    let uri = format!("/api/v1/payments/{payment_id}/process");

    let response = app
        .request_as(&reader, Method::POST, &uri, Some(json!({ "status": "COMPLETED" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "COMPLETED");

    let reloaded = app
        .services()
        .orders
        .get_order(&reader.auth, order.id)
        .await
        .unwrap();
    assert_eq!(reloaded.status, OrderStatus::Processing);
    assert_eq!(app.stock_of(book.id).await, 1);

    for outcome in ["COMPLETED", "FAILED"] {
        let response = app
            .request_as(&reader, Method::POST, &uri, Some(json!({ "status": outcome })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Payment already completed");
    }

    // A late FAILED must not hand the reserved copy back.
    assert_eq!(app.stock_of(book.id).await, 1);
}

#[tokio::test]
async fn only_the_order_owner_can_process_its_payment() {
    let app = TestApp::new().await;
    let owner = app.seed_user(UserRole::User).await;
    let stranger = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let book = app.seed_book("Solaris", dec!(13), 2).await;
    app.put_in_cart(owner.model.id, &book, 1).await;

    let order = app
        .services()
        .orders
        .create_order(
            owner.model.id,
            CreateOrderInput {
                shipping_address: "Krakow".into(),
                payment_method_id: method.id,
                cart_item_ids: None,
            },
        )
        .await
        .unwrap();
    let payment_id = order.payment.as_ref().unwrap().id;

    let response = app
        .request_as(
            &stranger,
            Method::POST,
            &format!("/api/v1/payments/{payment_id}/process"),
            Some(json!({ "status": "FAILED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.stock_of(book.id).await, 1);

    let err = app
        .services()
        .payments
        .process_payment(&owner.auth, uuid::Uuid::new_v4(), PaymentOutcome::Completed)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(ref msg) if msg == "Payment not found");
}

#[tokio::test]
async fn malformed_payment_requests_get_the_error_envelope() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let process_uri = format!("/api/v1/payments/{}/process", uuid::Uuid::new_v4());

    let response = app
        .request_as(
            &reader,
            Method::POST,
            &process_uri,
            Some(json!({ "status": "REFUNDED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Validation error:"));
    assert!(body["timestamp"].is_string());

    let response = app
        .request_as(
            &reader,
            Method::POST,
            "/api/v1/payments/not-a-uuid/process",
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Validation error:"));

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri(&process_uri)
        .header(axum::http::header::AUTHORIZATION, format!("Bearer {}", reader.token))
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"status\": "))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Bad Request");
}
