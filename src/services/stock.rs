//! Stock reservation rules shared by checkout and payment compensation.
//!
//! `ensure_sufficient_stock` is the optimistic first pass; `decrement_stock`
//! is the authoritative guard, a single conditional UPDATE that can only
//! succeed while enough stock remains, so concurrent checkouts never drive
//! stock below zero.

use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::book;
use crate::errors::ServiceError;

/// Checks `requested <= available`, naming the book on failure.
pub fn ensure_sufficient_stock(
    title: &str,
    requested: i32,
    available: i32,
) -> Result<(), ServiceError> {
    if requested > available {
        return Err(ServiceError::InsufficientStock(title.to_string()));
    }
    Ok(())
}

/// Atomically subtracts `quantity` from a book's stock if and only if at least
/// `quantity` remains. Zero affected rows means a concurrent writer won.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    book_id: Uuid,
    quantity: i32,
    title: &str,
) -> Result<(), ServiceError> {
    let result = book::Entity::update_many()
        .col_expr(
            book::Column::Stock,
            Expr::col(book::Column::Stock).sub(quantity),
        )
        .col_expr(book::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(book::Column::Id.eq(book_id))
        .filter(book::Column::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(%book_id, quantity, "conditional stock decrement matched no rows");
        return Err(ServiceError::InsufficientStock(title.to_string()));
    }

    debug!(%book_id, quantity, "stock reserved");
    Ok(())
}

/// Unconditionally returns `quantity` units to a book's stock.
pub async fn restore_stock<C: ConnectionTrait>(
    conn: &C,
    book_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    book::Entity::update_many()
        .col_expr(
            book::Column::Stock,
            Expr::col(book::Column::Stock).add(quantity),
        )
        .col_expr(book::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(book::Column::Id.eq(book_id))
        .exec(conn)
        .await?;

    debug!(%book_id, quantity, "stock restored");
    Ok(())
}
