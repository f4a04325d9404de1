use crate::{
    auth::AuthUser,
    db::DatabaseAccess,
    entities::{book, cart, cart_item, order, order_item, payment, payment_method},
    entities::{OrderStatus, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock::{decrement_stock, ensure_sufficient_stock},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Checkout input; `cart_item_ids` selects a subset of the cart.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub shipping_address: String,
    pub payment_method_id: Uuid,
    pub cart_item_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: Option<String>,
    pub quantity: i32,
    /// Unit price captured at checkout
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_method_id: Uuid,
    pub status: PaymentStatus,
    pub total: Decimal,
    pub payment_date: Option<DateTime<Utc>>,
}

impl From<payment::Model> for PaymentView {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            payment_method_id: model.payment_method_id,
            status: model.status,
            total: model.total,
            payment_date: model.payment_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub confirmed_by_id: Option<Uuid>,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub payment: Option<PaymentView>,
}

impl OrderView {
    fn assemble(
        order: order::Model,
        items: Vec<OrderItemView>,
        payment: Option<payment::Model>,
    ) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            shipping_address: order.shipping_address,
            total: order.total,
            status: order.status,
            confirmed_by_id: order.confirmed_by_id,
            order_date: order.created_at,
            updated_at: order.updated_at,
            items,
            payment: payment.map(PaymentView::from),
        }
    }
}

/// Loads items (with book titles) and payments for a batch of orders,
/// preserving the input order.
pub(crate) async fn load_order_views<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderView>, DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for (item, book) in order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(ids.clone()))
        .find_also_related(book::Entity)
        .all(conn)
        .await?
    {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemView {
                id: item.id,
                book_id: item.book_id,
                book_title: book.map(|b| b.title),
                quantity: item.quantity,
                price: item.price,
            });
    }

    let mut payments_by_order: HashMap<Uuid, payment::Model> = payment::Entity::find()
        .filter(payment::Column::OrderId.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.order_id, p))
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            let payment = payments_by_order.remove(&order.id);
            OrderView::assemble(order, items, payment)
        })
        .collect())
}

/// Recomputes `cart.total` from the items still in the cart at live prices.
pub(crate) async fn recalculate_cart_total<C: ConnectionTrait>(
    conn: &C,
    cart: cart::Model,
) -> Result<cart::Model, DbErr> {
    let total = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .find_also_related(book::Entity)
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|(item, book)| book.map(|b| b.price * Decimal::from(item.quantity)))
        .sum::<Decimal>();

    let mut active: cart::ActiveModel = cart.into();
    active.total = Set(total);
    active.updated_at = Set(Utc::now());
    active.update(conn).await
}

/// Cart-to-order conversion. Runs entirely inside `txn`.
async fn checkout(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    input: &CreateOrderInput,
) -> Result<OrderView, ServiceError> {
    let cart = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::EmptyCart("Cart is empty".into()))?;

    let mut lines: Vec<(cart_item::Model, book::Model)> = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(book::Entity)
        .all(txn)
        .await?
        .into_iter()
        .filter_map(|(item, book)| book.map(|b| (item, b)))
        .collect();

    if lines.is_empty() {
        return Err(ServiceError::EmptyCart("Cart is empty".into()));
    }

    // An empty selection means the whole cart
    if let Some(selected) = input.cart_item_ids.as_ref().filter(|ids| !ids.is_empty()) {
        let selected: HashSet<Uuid> = selected.iter().copied().collect();
        lines.retain(|(item, _)| selected.contains(&item.id));
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart(
                "No valid items selected for checkout".into(),
            ));
        }
    }

    payment_method::Entity::find_by_id(input.payment_method_id)
        .filter(payment_method::Column::IsActive.eq(true))
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Payment method"))?;

    for (item, book) in &lines {
        ensure_sufficient_stock(&book.title, item.quantity, book.stock)?;
    }

    let total: Decimal = lines
        .iter()
        .map(|(item, book)| book.price * Decimal::from(item.quantity))
        .sum();

    let now = Utc::now();
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        shipping_address: Set(input.shipping_address.clone()),
        total: Set(total),
        status: Set(OrderStatus::Pending),
        confirmed_by_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (item, book) in &lines {
        let saved = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            book_id: Set(book.id),
            quantity: Set(item.quantity),
            price: Set(book.price),
        }
        .insert(txn)
        .await?;
        items.push(OrderItemView {
            id: saved.id,
            book_id: saved.book_id,
            book_title: Some(book.title.clone()),
            quantity: saved.quantity,
            price: saved.price,
        });
    }

    let payment = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method_id: Set(input.payment_method_id),
        status: Set(PaymentStatus::Pending),
        total: Set(total),
        payment_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await?;

    // Stable lock order across concurrent multi-book checkouts
    let mut reservations: Vec<&(cart_item::Model, book::Model)> = lines.iter().collect();
    reservations.sort_by_key(|(_, book)| book.id);
    for (item, book) in reservations {
        decrement_stock(txn, book.id, item.quantity, &book.title).await?;
    }

    let consumed: Vec<Uuid> = lines.iter().map(|(item, _)| item.id).collect();
    cart_item::Entity::delete_many()
        .filter(cart_item::Column::Id.is_in(consumed))
        .exec(txn)
        .await?;
    recalculate_cart_total(txn, cart).await?;

    Ok(OrderView::assemble(order, items, Some(payment)))
}

/// Checkout, order history and admin order handling
#[derive(Clone)]
pub struct OrderService {
    db: DatabaseAccess,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: DatabaseAccess, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Converts the caller's cart (or the selected part of it) into an order
    /// with a pending payment, reserving stock atomically.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<OrderView, ServiceError> {
        let view = self
            .db
            .transaction("orders.create", move |txn| {
                let input = input.clone();
                Box::pin(async move { checkout(txn, user_id, &input).await })
            })
            .await?;

        info!(
            order_id = %view.id,
            total = %view.total,
            items = view.items.len(),
            "Order created"
        );

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderCreated {
                    order_id: view.id,
                    user_id,
                    total: view.total,
                    item_count: view.items.len(),
                })
                .await;
        }

        Ok(view)
    }

    /// The caller's orders, newest first
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        self.db
            .execute("orders.list_for_user", move |conn| {
                Box::pin(async move {
                    let orders = order::Entity::find()
                        .filter(order::Column::UserId.eq(user_id))
                        .order_by_desc(order::Column::CreatedAt)
                        .all(conn)
                        .await?;
                    load_order_views(conn, orders).await
                })
            })
            .await
    }

    /// A single order. Non-admins only see their own; anything else is "not found".
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn get_order(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderView, ServiceError> {
        let owner_filter = (!caller.is_admin()).then_some(caller.user_id);

        let found = self
            .db
            .execute("orders.get", move |conn| {
                Box::pin(async move {
                    let mut query = order::Entity::find_by_id(order_id);
                    if let Some(user_id) = owner_filter {
                        query = query.filter(order::Column::UserId.eq(user_id));
                    }
                    match query.one(conn).await? {
                        Some(order) => Ok(load_order_views(conn, vec![order]).await?.pop()),
                        None => Ok(None),
                    }
                })
            })
            .await?;

        found.ok_or_else(|| ServiceError::not_found("Order"))
    }

    /// Admin status override. Records who confirmed; no stock side effects.
    #[instrument(skip(self, admin), fields(admin = %admin.user_id, %new_status))]
    pub async fn confirm_order(
        &self,
        admin: &AuthUser,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        if !admin.is_admin() {
            warn!(%order_id, "non-admin attempted to confirm order");
            return Err(ServiceError::Forbidden(
                "Only admins can confirm orders".into(),
            ));
        }
        let admin_id = admin.user_id;

        let (view, old_status) = self
            .db
            .transaction("orders.confirm", move |txn| {
                Box::pin(async move {
                    let order = order::Entity::find_by_id(order_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Order"))?;
                    let old_status = order.status;

                    let mut active: order::ActiveModel = order.into();
                    active.status = Set(new_status);
                    active.confirmed_by_id = Set(Some(admin_id));
                    active.updated_at = Set(Utc::now());
                    let updated = active.update(txn).await?;

                    let view = load_order_views(txn, vec![updated])
                        .await?
                        .pop()
                        .ok_or_else(|| ServiceError::not_found("Order"))?;
                    Ok((view, old_status))
                })
            })
            .await?;

        info!(%order_id, %old_status, %new_status, "Order status set by admin");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status,
                    changed_by: Some(admin_id),
                })
                .await;
        }

        Ok(view)
    }

    /// Every user's orders, newest first, optionally narrowed to one status
    #[instrument(skip(self, admin), fields(admin = %admin.user_id))]
    pub async fn list_all_orders(
        &self,
        admin: &AuthUser,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, ServiceError> {
        if !admin.is_admin() {
            return Err(ServiceError::Forbidden("Admin access required".into()));
        }

        self.db
            .execute("orders.list_all", move |conn| {
                Box::pin(async move {
                    let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
                    if let Some(status) = status {
                        query = query.filter(order::Column::Status.eq(status));
                    }
                    let orders = query.all(conn).await?;
                    load_order_views(conn, orders).await
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_db;
    use crate::services::fixtures::{
        insert_book, insert_order_with_payment, insert_payment_method, insert_user,
    };
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn failed_stock_reservation_rolls_back_order_and_payment() {
        let db = memory_db().await;
        let conn = db.get_pool();
        let reader = insert_user(conn).await;
        let method = insert_payment_method(conn).await;
        let book = insert_book(conn, "Persuasion", dec!(7.50), 1).await;

        let (user_id, method_id, book_id) = (reader.id, method.id, book.id);
        let title = book.title.clone();
        let err = db
            .transaction("orders.reserve_after_insert", move |txn| {
                let title = title.clone();
                Box::pin(async move {
                    insert_order_with_payment(
                        txn,
                        user_id,
                        method_id,
                        dec!(37.50),
                        PaymentStatus::Pending,
                    )
                    .await;
                    decrement_stock(txn, book_id, 5, &title).await
                })
            })
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::InsufficientStock(ref t) if t == "Persuasion");
        assert_eq!(order::Entity::find().count(conn).await.unwrap(), 0);
        assert_eq!(payment::Entity::find().count(conn).await.unwrap(), 0);
        let stock = book::Entity::find_by_id(book_id)
            .one(conn)
            .await
            .unwrap()
            .unwrap()
            .stock;
        assert_eq!(stock, 1);
    }
}
