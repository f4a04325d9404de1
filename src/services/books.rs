use crate::{
    db::DatabaseAccess,
    entities::{book, cart, cart_item, category, order_item, rating},
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::recalculate_cart_total,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Query},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Upper bound on search terms taken from a query string
pub const MAX_SEARCH_TOKENS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookSort {
    Price,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: Option<BookSort>,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

/// Absent fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookView {
    fn new(
        model: book::Model,
        category_name: Option<String>,
        (average_rating, rating_count): (f64, i64),
    ) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            stock: model.stock,
            image_url: model.image_url,
            category_id: model.category_id,
            category_name,
            average_rating,
            rating_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Splits a search string on whitespace, dropping case-insensitive repeats.
pub fn search_tokens(search: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in search.split_whitespace().map(str::to_lowercase) {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
        if tokens.len() == MAX_SEARCH_TOKENS {
            break;
        }
    }
    tokens
}

/// `%token%` with the token's own `%`, `_` and `\` matched literally
fn contains_pattern(token: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(token.len() + 2);
    for c in token.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

/// Every token must appear in the title, the description or the category name.
fn search_condition(tokens: &[String]) -> Condition {
    tokens.iter().fold(Condition::all(), |all, token| {
        let pattern = contains_pattern(token);
        let matching_categories = Query::select()
            .column((category::Entity, category::Column::Id))
            .from(category::Entity)
            .and_where(
                Expr::expr(Func::lower(Expr::col((
                    category::Entity,
                    category::Column::Name,
                ))))
                .like(pattern.clone()),
            )
            .to_owned();

        all.add(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(book::Column::Title))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(book::Column::Description))).like(pattern))
                .add(book::Column::CategoryId.in_subquery(matching_categories)),
        )
    })
}

/// Category names for the categories referenced by `books`
async fn category_names<C: ConnectionTrait>(
    conn: &C,
    books: &[book::Model],
) -> Result<HashMap<Uuid, String>, DbErr> {
    let ids: Vec<Uuid> = books.iter().filter_map(|b| b.category_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(category::Entity::find()
        .filter(category::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

/// Builds views for `books`, loading ratings and category names in two queries.
async fn book_views<C: ConnectionTrait>(
    conn: &C,
    books: Vec<book::Model>,
) -> Result<Vec<BookView>, DbErr> {
    let stats = rating_stats(conn, books.iter().map(|b| b.id).collect()).await?;
    let names = category_names(conn, &books).await?;
    Ok(books
        .into_iter()
        .map(|b| {
            let stat = stats.get(&b.id).copied().unwrap_or((0.0, 0));
            let name = b.category_id.and_then(|id| names.get(&id).cloned());
            BookView::new(b, name, stat)
        })
        .collect())
}

async fn ensure_category_exists<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    category::Entity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Category"))?;
    Ok(())
}

/// `(average, count)` of star ratings per book
pub(crate) async fn rating_stats<C: ConnectionTrait>(
    conn: &C,
    book_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, (f64, i64)>, DbErr> {
    if book_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i64, i64)> = rating::Entity::find()
        .select_only()
        .column(rating::Column::BookId)
        .column_as(Expr::col(rating::Column::Stars).sum(), "star_sum")
        .column_as(Expr::col(rating::Column::Id).count(), "rating_count")
        .filter(rating::Column::BookId.is_in(book_ids))
        .group_by(rating::Column::BookId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(book_id, sum, count)| {
            let average = if count > 0 {
                (sum as f64 / count as f64 * 100.0).round() / 100.0
            } else {
                0.0
            };
            (book_id, (average, count))
        })
        .collect())
}

#[derive(Clone)]
pub struct BookService {
    db: DatabaseAccess,
    event_sender: Option<Arc<EventSender>>,
}

impl BookService {
    pub fn new(db: DatabaseAccess, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_books(&self, query: BookQuery) -> Result<Vec<BookView>, ServiceError> {
        let tokens = query
            .search
            .as_deref()
            .map(search_tokens)
            .unwrap_or_default();
        let order = query.order.unwrap_or_default();
        let sort_by = query.sort_by;
        let category_id = query.category_id;

        let mut books = self
            .db
            .execute("books.list", move |conn| {
                let tokens = tokens.clone();
                Box::pin(async move {
                    let mut select = book::Entity::find();
                    if let Some(category_id) = category_id {
                        select = select.filter(book::Column::CategoryId.eq(category_id));
                    }
                    if !tokens.is_empty() {
                        select = select.filter(search_condition(&tokens));
                    }
                    select = match (sort_by, order) {
                        (Some(BookSort::Price), SortOrder::Asc) => {
                            select.order_by_asc(book::Column::Price)
                        }
                        (Some(BookSort::Price), SortOrder::Desc) => {
                            select.order_by_desc(book::Column::Price)
                        }
                        _ => select.order_by_desc(book::Column::CreatedAt),
                    };
                    let books = select.all(conn).await?;
                    book_views(conn, books).await
                })
            })
            .await?;

        if sort_by == Some(BookSort::Rating) {
            books.sort_by(|a, b| a.average_rating.total_cmp(&b.average_rating));
            if order == SortOrder::Desc {
                books.reverse();
            }
        }

        Ok(books)
    }

    #[instrument(skip(self))]
    pub async fn get_book(&self, book_id: Uuid) -> Result<BookView, ServiceError> {
        let found = self
            .db
            .execute("books.get", move |conn| {
                Box::pin(async move {
                    let Some(book) = book::Entity::find_by_id(book_id).one(conn).await? else {
                        return Ok(None);
                    };
                    Ok(book_views(conn, vec![book]).await?.pop())
                })
            })
            .await?;

        found.ok_or_else(|| ServiceError::not_found("Book"))
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_book(&self, input: NewBook) -> Result<BookView, ServiceError> {
        if input.price < Decimal::ZERO || input.stock < 0 {
            return Err(ServiceError::ValidationError(
                "Price and stock must not be negative".into(),
            ));
        }

        let now = Utc::now();
        let category_id = input.category_id;
        let model = book::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            description: Set(input.description),
            price: Set(input.price),
            stock: Set(input.stock),
            image_url: Set(input.image_url),
            category_id: Set(category_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = self
            .db
            .transaction("books.create", move |txn| {
                let model = model.clone();
                Box::pin(async move {
                    if let Some(category_id) = category_id {
                        ensure_category_exists(txn, category_id).await?;
                    }
                    let book = model.insert(txn).await?;
                    Ok(book_views(txn, vec![book]).await?.pop())
                })
            })
            .await?
            .ok_or_else(|| ServiceError::InternalError("created book vanished".into()))?;

        info!(book_id = %created.id, "Book created");
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_book(
        &self,
        book_id: Uuid,
        changes: BookChanges,
    ) -> Result<BookView, ServiceError> {
        if changes.price.is_some_and(|p| p < Decimal::ZERO) || changes.stock.is_some_and(|s| s < 0)
        {
            return Err(ServiceError::ValidationError(
                "Price and stock must not be negative".into(),
            ));
        }

        let updated = self
            .db
            .transaction("books.update", move |txn| {
                let changes = changes.clone();
                Box::pin(async move {
                    let book = book::Entity::find_by_id(book_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Book"))?;

                    let mut active: book::ActiveModel = book.into();
                    if let Some(title) = changes.title {
                        active.title = Set(title);
                    }
                    if let Some(description) = changes.description {
                        active.description = Set(Some(description));
                    }
                    if let Some(price) = changes.price {
                        active.price = Set(price);
                    }
                    if let Some(stock) = changes.stock {
                        active.stock = Set(stock);
                    }
                    if let Some(image_url) = changes.image_url {
                        active.image_url = Set(Some(image_url));
                    }
                    if let Some(category_id) = changes.category_id {
                        ensure_category_exists(txn, category_id).await?;
                        active.category_id = Set(Some(category_id));
                    }
                    active.updated_at = Set(Utc::now());
                    let book = active.update(txn).await?;

                    book_views(txn, vec![book])
                        .await?
                        .pop()
                        .ok_or_else(|| ServiceError::not_found("Book"))
                })
            })
            .await?;

        info!(%book_id, "Book updated");
        Ok(updated)
    }

    /// Removes a book that was never ordered, pulling it out of every cart.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, book_id: Uuid) -> Result<(), ServiceError> {
        self.db
            .transaction("books.delete", move |txn| {
                Box::pin(async move {
                    book::Entity::find_by_id(book_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Book"))?;

                    let ordered = order_item::Entity::find()
                        .filter(order_item::Column::BookId.eq(book_id))
                        .count(txn)
                        .await?;
                    if ordered > 0 {
                        return Err(ServiceError::InvalidOperation(
                            "Cannot delete book because it exists in order history. \
                             Consider updating stock to 0 instead."
                                .into(),
                        ));
                    }

                    let lines = cart_item::Entity::find()
                        .filter(cart_item::Column::BookId.eq(book_id))
                        .all(txn)
                        .await?;
                    cart_item::Entity::delete_many()
                        .filter(cart_item::Column::BookId.eq(book_id))
                        .exec(txn)
                        .await?;
                    let cart_ids: Vec<Uuid> = lines.iter().map(|l| l.cart_id).collect();
                    for affected in cart::Entity::find()
                        .filter(cart::Column::Id.is_in(cart_ids))
                        .all(txn)
                        .await?
                    {
                        recalculate_cart_total(txn, affected).await?;
                    }

                    rating::Entity::delete_many()
                        .filter(rating::Column::BookId.eq(book_id))
                        .exec(txn)
                        .await?;
                    book::Entity::delete_by_id(book_id).exec(txn).await?;
                    Ok(())
                })
            })
            .await?;

        info!(%book_id, "Book deleted");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::BookDeleted(book_id)).await;
        }
        Ok(())
    }
}
