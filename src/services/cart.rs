use crate::{
    db::DatabaseAccess,
    entities::{book, cart, cart_item},
    errors::ServiceError,
    services::{orders::recalculate_cart_total, stock::ensure_sufficient_stock},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartBook {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: Uuid,
    pub book_id: Uuid,
    pub quantity: i32,
    pub book: CartBook,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: Decimal,
    pub items: Vec<CartItemView>,
}

/// Returns the user's cart, creating it when registration predates carts.
async fn cart_for_user(txn: &DatabaseTransaction, user_id: Uuid) -> Result<cart::Model, ServiceError> {
    if let Some(cart) = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(txn)
        .await?
    {
        return Ok(cart);
    }

    let now = Utc::now();
    Ok(cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await?)
}

async fn load_cart_view<C: ConnectionTrait>(
    conn: &C,
    cart: cart::Model,
) -> Result<CartView, ServiceError> {
    let items = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(book::Entity)
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|(item, book)| {
            book.map(|b| CartItemView {
                id: item.id,
                book_id: item.book_id,
                quantity: item.quantity,
                book: CartBook {
                    id: b.id,
                    title: b.title,
                    price: b.price,
                    stock: b.stock,
                    image_url: b.image_url,
                },
            })
        })
        .collect();

    Ok(CartView {
        id: cart.id,
        user_id: cart.user_id,
        total: cart.total,
        items,
    })
}

/// Loads a cart line only if it sits in `user_id`'s cart.
async fn owned_item(
    txn: &DatabaseTransaction,
    cart: &cart::Model,
    item_id: Uuid,
) -> Result<cart_item::Model, ServiceError> {
    cart_item::Entity::find_by_id(item_id)
        .filter(cart_item::Column::CartId.eq(cart.id))
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Cart item"))
}

fn require_positive(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::ValidationError(
            "Quantity must be at least 1".into(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CartService {
    db: DatabaseAccess,
}

impl CartService {
    pub fn new(db: DatabaseAccess) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        self.db
            .transaction("cart.get", move |txn| {
                Box::pin(async move {
                    let cart = cart_for_user(txn, user_id).await?;
                    load_cart_view(txn, cart).await
                })
            })
            .await
    }

    /// Adds `quantity` of a book, merging with an existing line for it.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        require_positive(quantity)?;

        self.db
            .transaction("cart.add_item", move |txn| {
                Box::pin(async move {
                    let book = book::Entity::find_by_id(book_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Book"))?;
                    let cart = cart_for_user(txn, user_id).await?;

                    let existing = cart_item::Entity::find()
                        .filter(cart_item::Column::CartId.eq(cart.id))
                        .filter(cart_item::Column::BookId.eq(book_id))
                        .one(txn)
                        .await?;

                    match existing {
                        Some(line) => {
                            let merged = line.quantity + quantity;
                            ensure_sufficient_stock(&book.title, merged, book.stock)?;
                            let mut active: cart_item::ActiveModel = line.into();
                            active.quantity = Set(merged);
                            active.update(txn).await?;
                            debug!(%book_id, merged, "merged into existing cart line");
                        }
                        None => {
                            ensure_sufficient_stock(&book.title, quantity, book.stock)?;
                            cart_item::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                cart_id: Set(cart.id),
                                book_id: Set(book_id),
                                quantity: Set(quantity),
                                created_at: Set(Utc::now()),
                            }
                            .insert(txn)
                            .await?;
                        }
                    }

                    let cart = recalculate_cart_total(txn, cart).await?;
                    load_cart_view(txn, cart).await
                })
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        require_positive(quantity)?;

        self.db
            .transaction("cart.update_item", move |txn| {
                Box::pin(async move {
                    let cart = cart_for_user(txn, user_id).await?;
                    let line = owned_item(txn, &cart, item_id).await?;
                    let book = book::Entity::find_by_id(line.book_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Book"))?;
                    ensure_sufficient_stock(&book.title, quantity, book.stock)?;

                    let mut active: cart_item::ActiveModel = line.into();
                    active.quantity = Set(quantity);
                    active.update(txn).await?;

                    let cart = recalculate_cart_total(txn, cart).await?;
                    load_cart_view(txn, cart).await
                })
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, ServiceError> {
        self.db
            .transaction("cart.remove_item", move |txn| {
                Box::pin(async move {
                    let cart = cart_for_user(txn, user_id).await?;
                    let line = owned_item(txn, &cart, item_id).await?;
                    cart_item::Entity::delete_by_id(line.id).exec(txn).await?;

                    let cart = recalculate_cart_total(txn, cart).await?;
                    load_cart_view(txn, cart).await
                })
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        self.db
            .transaction("cart.clear", move |txn| {
                Box::pin(async move {
                    let cart = cart_for_user(txn, user_id).await?;
                    cart_item::Entity::delete_many()
                        .filter(cart_item::Column::CartId.eq(cart.id))
                        .exec(txn)
                        .await?;

                    let cart = recalculate_cart_total(txn, cart).await?;
                    load_cart_view(txn, cart).await
                })
            })
            .await
    }
}
