#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use bookstore_api::{
    auth::{AuthConfig, AuthService, AuthUser},
    config::AppConfig,
    db::{self, DatabaseAccess},
    entities::{book, cart, cart_item, category, payment_method, user, UserRole},
    events::{self, EventSender},
    handlers::AppServices,
    middleware_helpers::RetryConfig,
    AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "a8f5f167f44f4964e6c998dee827110c_bookstore_tests";

/// A user row together with a bearer token and the caller identity handlers see.
pub struct TestUser {
    pub model: user::Model,
    pub token: String,
    pub auth: AuthUser,
}

/// Application harness backed by a migrated single-connection in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every pooled connection to `sqlite::memory:` is its own database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let pool = Arc::new(pool);
        let db_access = DatabaseAccess::with_retry_config(
            pool.clone(),
            RetryConfig::fixed(2, Duration::from_millis(10)),
        );

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let event_sender = Arc::new(EventSender::new(event_tx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let services = AppServices::new(db_access, event_sender, auth_service.clone());

        let state = AppState {
            db: pool,
            config: cfg,
            services,
        };
        let router = bookstore_api::app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request_as(
        &self,
        user: &TestUser,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(&user.token)).await
    }

    /// Inserts a user with an empty cart and mints a token for them.
    pub async fn seed_user(&self, role: UserRole) -> TestUser {
        let id = Uuid::new_v4();
        let short = id.simple().to_string()[..8].to_string();
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(id),
            username: Set(format!("reader_{short}")),
            email: Set(format!("reader_{short}@example.com")),
            password_hash: Set("not-a-real-hash".to_string()),
            full_name: Set("Test Reader".to_string()),
            phone: Set(None),
            address: Set(Some("1 Library Lane".to_string())),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("insert user");

        cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(id),
            total: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("insert cart");

        let token = self
            .auth_service
            .generate_token(&model)
            .expect("generate token")
            .access_token;
        let auth = AuthUser {
            user_id: id,
            email: model.email.clone(),
            role,
            token_id: Uuid::new_v4().to_string(),
        };

        TestUser { model, token, auth }
    }

    pub async fn seed_book(&self, title: &str, price: Decimal, stock: i32) -> book::Model {
        let now = Utc::now();
        book::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            description: Set(Some(format!("About {title}"))),
            price: Set(price),
            stock: Set(stock),
            image_url: Set(None),
            category_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("insert book")
    }

    pub async fn seed_category(&self, name: &str) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("insert category")
    }

    /// Files an existing book under a category.
    pub async fn file_under(&self, book: &book::Model, category: &category::Model) -> book::Model {
        let mut active: book::ActiveModel = book.clone().into();
        active.category_id = Set(Some(category.id));
        active.update(self.db()).await.expect("set book category")
    }

    pub async fn seed_payment_method(&self, name: &str, is_active: bool) -> payment_method::Model {
        payment_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("insert payment method")
    }

    /// Writes a cart line directly, skipping the stock check done by the cart
    /// service, and refreshes the cart total.
    pub async fn put_in_cart(
        &self,
        user_id: Uuid,
        book: &book::Model,
        quantity: i32,
    ) -> cart_item::Model {
        let cart = self.cart_of(user_id).await;
        let item = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            book_id: Set(book.id),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("insert cart item");

        let total = cart.total + book.price * Decimal::from(quantity);
        let mut active: cart::ActiveModel = cart.into();
        active.total = Set(total);
        active.update(self.db()).await.expect("update cart total");

        item
    }

    pub async fn cart_of(&self, user_id: Uuid) -> cart::Model {
        cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(self.db())
            .await
            .expect("query cart")
            .expect("cart exists")
    }

    pub async fn cart_items_of(&self, user_id: Uuid) -> Vec<cart_item::Model> {
        let cart = self.cart_of(user_id).await;
        cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(self.db())
            .await
            .expect("query cart items")
    }

    pub async fn stock_of(&self, book_id: Uuid) -> i32 {
        book::Entity::find_by_id(book_id)
            .one(self.db())
            .await
            .expect("query book")
            .expect("book exists")
            .stock
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a decimal that may be serialized as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}
