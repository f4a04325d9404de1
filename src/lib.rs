//! Bookstore API Library
//!
//! Catalog, carts, checkout and payment handling for an online bookstore,
//! served over HTTP with axum and persisted through SeaORM.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthRouterExt, AuthService};
use crate::entities::UserRole;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Routes mounted under `/api/v1`.
///
/// Three groups: public, authenticated (bearer token) and admin (ADMIN role).
pub fn api_v1_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/status", get(handlers::health::status))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/books", get(handlers::books::list_books))
        .route("/books/:id", get(handlers::books::get_book))
        .route("/categories", get(handlers::categories::list_categories))
        .route(
            "/payment-methods",
            get(handlers::payment_methods::list_payment_methods),
        )
        .route(
            "/ratings/book/:id",
            get(handlers::ratings::list_book_ratings),
        )
        .route(
            "/ratings/book/:id/average",
            get(handlers::ratings::book_average_rating),
        );

    let authenticated = Router::new()
        .route(
            "/auth/profile",
            get(handlers::auth::profile).put(handlers::auth::update_profile),
        )
        .route(
            "/auth/change-password",
            axum::routing::put(handlers::auth::change_password),
        )
        .route(
            "/cart",
            get(handlers::cart::get_cart)
                .post(handlers::cart::add_to_cart)
                .delete(handlers::cart::clear_cart),
        )
        .route(
            "/cart/items/:id",
            patch(handlers::cart::update_cart_item).delete(handlers::cart::remove_cart_item),
        )
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/payments/:id/process",
            post(handlers::payments::process_payment),
        )
        .route("/ratings", post(handlers::ratings::create_rating))
        .route("/ratings/my-ratings", get(handlers::ratings::my_ratings))
        .route(
            "/ratings/my-rating/:id",
            get(handlers::ratings::my_rating_for_book),
        )
        .route(
            "/ratings/:id",
            patch(handlers::ratings::update_rating).delete(handlers::ratings::delete_rating),
        )
        .route(
            "/ratings/:id/vote",
            get(handlers::ratings::get_vote)
                .post(handlers::ratings::vote_rating)
                .delete(handlers::ratings::remove_vote),
        )
        .with_auth();

    let admin = Router::new()
        .route("/books", post(handlers::books::create_book))
        .route("/categories", post(handlers::categories::create_category))
        .route(
            "/books/:id",
            axum::routing::put(handlers::books::update_book).delete(handlers::books::delete_book),
        )
        .route("/orders/all", get(handlers::orders::list_all_orders))
        .route(
            "/orders/:id/confirm",
            patch(handlers::orders::confirm_order),
        )
        .route(
            "/payment-methods",
            post(handlers::payment_methods::create_payment_method),
        )
        .route("/ratings/all", get(handlers::ratings::list_all_ratings))
        .route(
            "/ratings/admin/:id",
            axum::routing::delete(handlers::ratings::admin_delete_rating),
        )
        .route("/users", get(handlers::users::list_users))
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .with_role(UserRole::Admin.as_str());

    public.merge(authenticated).merge(admin)
}

/// Full application router: versioned API, OpenAPI document, auth service
/// extension, request ids and HTTP tracing. CORS is added by the binary.
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        .layer(Extension(auth_service))
        .layer(crate::tracing::http_trace_layer())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
