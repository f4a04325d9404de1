//! Cross-cutting HTTP behaviour: health probes, request ids, error envelopes
//! and the published OpenAPI document.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use bookstore_api::{entities::UserRole, middleware_helpers::REQUEST_ID_HEADER};
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"], "up");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["name"], "bookstore-api");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn request_id_is_echoed_and_reported_in_errors() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/v1/books/{}", uuid::Uuid::new_v4()))
        .header(REQUEST_ID_HEADER, "trace-me-42")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "trace-me-42"
    );
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Book not found");
    assert_eq!(body["request_id"], "trace-me-42");
    assert!(body["timestamp"].is_string());

    let response = app.request(Method::GET, "/api/v1/books", None, None).await;
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn payment_methods_are_public_and_admin_managed() {
    let app = TestApp::new().await;
    let admin = app.seed_user(UserRole::Admin).await;
    app.seed_payment_method("Retired", false).await;

    let response = app
        .request_as(
            &admin,
            Method::POST,
            "/api/v1/payment-methods",
            Some(json!({ "name": "Bank Transfer", "description": "SEPA" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_as(
            &admin,
            Method::POST,
            "/api/v1/payment-methods",
            Some(json!({ "name": "Bank Transfer" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(Method::GET, "/api/v1/payment-methods", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bank Transfer"]);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["info"]["title"], "Bookstore API");
    assert!(body["paths"]["/api/v1/orders"].is_object());
    assert!(body["paths"]["/api/v1/payments/{id}/process"]["post"].is_object());
}
