use crate::{
    auth::AuthUser,
    db::DatabaseAccess,
    entities::{order, order_item, payment, OrderStatus, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{orders::PaymentView, stock::restore_stock},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Result reported by the payment provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

impl PaymentOutcome {
    fn payment_status(self) -> PaymentStatus {
        match self {
            PaymentOutcome::Completed => PaymentStatus::Completed,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        }
    }

    fn order_status(self) -> OrderStatus {
        match self {
            PaymentOutcome::Completed => OrderStatus::Processing,
            PaymentOutcome::Failed => OrderStatus::Cancelled,
        }
    }
}

/// Everything the payment transition changed, for post-commit events.
struct Transition {
    payment: payment::Model,
    old_order_status: OrderStatus,
    new_order_status: OrderStatus,
    restored: Vec<(Uuid, i32)>,
}

/// Moves a payment out of PENDING with a single conditional UPDATE. When
/// another caller got there first, reports the status that caller left behind.
async fn claim_pending<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    new_status: PaymentStatus,
    payment_date: Option<DateTime<Utc>>,
) -> Result<(), ServiceError> {
    let claimed = payment::Entity::update_many()
        .col_expr(payment::Column::Status, Expr::value(new_status))
        .col_expr(payment::Column::PaymentDate, Expr::value(payment_date))
        .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .exec(conn)
        .await?;
    if claimed.rows_affected > 0 {
        return Ok(());
    }

    let settled = payment::Entity::find_by_id(payment_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Payment"))?;
    Err(ServiceError::AlreadyProcessed(
        settled.status.label().to_string(),
    ))
}

async fn apply_outcome(
    txn: &DatabaseTransaction,
    caller_id: Uuid,
    payment_id: Uuid,
    outcome: PaymentOutcome,
) -> Result<Transition, ServiceError> {
    let current = payment::Entity::find_by_id(payment_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Payment"))?;

    let order = order::Entity::find_by_id(current.order_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order"))?;

    if order.user_id != caller_id {
        return Err(ServiceError::Forbidden(
            "You cannot process this payment".into(),
        ));
    }

    if current.status.is_terminal() {
        return Err(ServiceError::AlreadyProcessed(
            current.status.label().to_string(),
        ));
    }

    let now = Utc::now();
    let new_status = outcome.payment_status();
    let payment_date = (outcome == PaymentOutcome::Completed).then_some(now);

    claim_pending(txn, payment_id, new_status, payment_date).await?;

    let old_order_status = order.status;
    let new_order_status = outcome.order_status();
    let mut active: order::ActiveModel = order.into();
    active.status = Set(new_order_status);
    active.updated_at = Set(now);
    let order = active.update(txn).await?;

    let mut restored = Vec::new();
    if outcome == PaymentOutcome::Failed {
        let mut items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(txn)
            .await?;
        items.sort_by_key(|item| item.book_id);
        for item in items {
            restore_stock(txn, item.book_id, item.quantity).await?;
            restored.push((item.book_id, item.quantity));
        }
    }

    let payment = payment::Entity::find_by_id(payment_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Payment"))?;

    Ok(Transition {
        payment,
        old_order_status,
        new_order_status,
        restored,
    })
}

/// One-shot payment state transitions
#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseAccess,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(db: DatabaseAccess, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Moves a PENDING payment to COMPLETED or FAILED and updates its order.
    /// A failed payment returns every reserved unit to stock.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id, ?outcome))]
    pub async fn process_payment(
        &self,
        caller: &AuthUser,
        payment_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<PaymentView, ServiceError> {
        let caller_id = caller.user_id;

        let transition = self
            .db
            .transaction("payments.process", move |txn| {
                Box::pin(apply_outcome(txn, caller_id, payment_id, outcome))
            })
            .await
            .map_err(|e| {
                if matches!(e, ServiceError::AlreadyProcessed(_)) {
                    warn!(%payment_id, "payment already processed");
                }
                e
            })?;

        let payment = transition.payment;
        counter!("bookstore_payments.processed", 1, "status" => payment.status.label());
        info!(
            %payment_id,
            order_id = %payment.order_id,
            status = payment.status.label(),
            restored_lines = transition.restored.len(),
            "Payment processed"
        );

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PaymentProcessed {
                    payment_id,
                    order_id: payment.order_id,
                    status: payment.status,
                })
                .await;
            sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id: payment.order_id,
                    old_status: transition.old_order_status,
                    new_status: transition.new_order_status,
                    changed_by: None,
                })
                .await;
            for (book_id, quantity) in transition.restored {
                sender
                    .send_or_log(Event::StockRestored { book_id, quantity })
                    .await;
            }
        }

        Ok(PaymentView::from(payment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_db;
    use crate::services::fixtures::{insert_order_with_payment, insert_payment_method, insert_user};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn claim_moves_pending_payment_once() {
        let db = memory_db().await;
        let conn = db.get_pool();
        let reader = insert_user(conn).await;
        let method = insert_payment_method(conn).await;
        let (_, pending) =
            insert_order_with_payment(conn, reader.id, method.id, dec!(12), PaymentStatus::Pending)
                .await;

        claim_pending(conn, pending.id, PaymentStatus::Completed, Some(Utc::now()))
            .await
            .unwrap();

        let err = claim_pending(conn, pending.id, PaymentStatus::Failed, None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::AlreadyProcessed(ref label) if label == "completed");

        let stored = payment::Entity::find_by_id(pending.id)
            .one(conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert!(stored.payment_date.is_some());
    }

    #[tokio::test]
    async fn lost_claim_reports_the_winning_status() {
        let db = memory_db().await;
        let conn = db.get_pool();
        let reader = insert_user(conn).await;
        let method = insert_payment_method(conn).await;
        let (_, settled) =
            insert_order_with_payment(conn, reader.id, method.id, dec!(12), PaymentStatus::Failed)
                .await;

        let err = claim_pending(conn, settled.id, PaymentStatus::Completed, Some(Utc::now()))
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::AlreadyProcessed(ref label) if label == "failed");
        assert_eq!(err.to_string(), "Payment already failed");
    }
}
