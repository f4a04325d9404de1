//! Row builders for service unit tests.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::entities::{book, order, payment, payment_method, user, OrderStatus, PaymentStatus, UserRole};

pub(crate) async fn insert_user(conn: &impl ConnectionTrait) -> user::Model {
    let id = Uuid::new_v4();
    let short = id.simple().to_string()[..8].to_string();
    let now = Utc::now();
    user::ActiveModel {
        id: Set(id),
        username: Set(format!("reader_{short}")),
        email: Set(format!("reader_{short}@example.com")),
        password_hash: Set("not-a-real-hash".to_string()),
        full_name: Set("Unit Reader".to_string()),
        phone: Set(None),
        address: Set(None),
        role: Set(UserRole::User),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .unwrap()
}

pub(crate) async fn insert_book(
    conn: &impl ConnectionTrait,
    title: &str,
    price: Decimal,
    stock: i32,
) -> book::Model {
    let now = Utc::now();
    book::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        image_url: Set(None),
        category_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .unwrap()
}

pub(crate) async fn insert_payment_method(conn: &impl ConnectionTrait) -> payment_method::Model {
    payment_method::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Card {}", Uuid::new_v4().simple())),
        description: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .unwrap()
}

/// An order and its payment, both created in the given states.
pub(crate) async fn insert_order_with_payment(
    conn: &impl ConnectionTrait,
    user_id: Uuid,
    payment_method_id: Uuid,
    total: Decimal,
    payment_status: PaymentStatus,
) -> (order::Model, payment::Model) {
    let now = Utc::now();
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        shipping_address: Set("12 Unit Test Road".to_string()),
        total: Set(total),
        status: Set(OrderStatus::Pending),
        confirmed_by_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .unwrap();

    let payment = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method_id: Set(payment_method_id),
        status: Set(payment_status),
        total: Set(total),
        payment_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .unwrap();

    (order, payment)
}
