/*!
 * Transaction helper
 *
 * Runs a unit of work inside a database transaction and hands back the
 * unit's own `ServiceError` on failure, after the rollback has happened.
 */

use crate::errors::ServiceError;
use sea_orm::{DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction.
///
/// Commits when `f` returns `Ok`, rolls back otherwise.
///
/// ```rust,ignore
/// let order = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         let order = order::ActiveModel { .. }.insert(txn).await?;
///         decrement_stock(txn, book_id, 2, &title).await?;
///         Ok(order)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<C, F, T>(db: &C, f: F) -> Result<T, ServiceError>
where
    C: TransactionTrait,
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, ServiceError>> + Send,
    T: Send,
{
    db.transaction::<F, T, ServiceError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(err) => err,
        })
}
