pub mod auth;
pub mod books;
pub mod cart;
pub mod categories;
pub mod common;
pub mod health;
pub mod orders;
pub mod payment_methods;
pub mod payments;
pub mod ratings;
pub mod users;

use crate::auth::AuthService;
use crate::db::DatabaseAccess;
use crate::events::EventSender;
use crate::services::{
    books::BookService, cart::CartService, categories::CategoryService, orders::OrderService,
    payment_methods::PaymentMethodService, payments::PaymentService, ratings::RatingService,
    users::UserService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub books: Arc<BookService>,
    pub categories: Arc<CategoryService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub payment_methods: Arc<PaymentMethodService>,
    pub ratings: Arc<RatingService>,
}

impl AppServices {
    pub fn new(
        db: DatabaseAccess,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(
                db.clone(),
                auth_service,
                Some(event_sender.clone()),
            )),
            books: Arc::new(BookService::new(db.clone(), Some(event_sender.clone()))),
            categories: Arc::new(CategoryService::new(db.clone())),
            cart: Arc::new(CartService::new(db.clone())),
            orders: Arc::new(OrderService::new(db.clone(), Some(event_sender.clone()))),
            payments: Arc::new(PaymentService::new(db.clone(), Some(event_sender))),
            payment_methods: Arc::new(PaymentMethodService::new(db.clone())),
            ratings: Arc::new(RatingService::new(db)),
        }
    }
}
