use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{OrderStatus, PaymentStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends after a commit; a closed channel is logged, never surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "domain event dropped");
        }
    }
}

/// Facts emitted after a transaction commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    OrderCreated {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
        item_count: usize,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
        changed_by: Option<Uuid>,
    },
    PaymentProcessed {
        payment_id: Uuid,
        order_id: Uuid,
        status: PaymentStatus,
    },
    StockRestored {
        book_id: Uuid,
        quantity: i32,
    },
    BookDeleted(Uuid),
    UserDeleted {
        user_id: Uuid,
        deleted_by: Uuid,
    },
}

/// Drains the event channel, logging every event until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::UserRegistered(user_id) => {
                info!(%user_id, "user registered");
            }
            Event::OrderCreated {
                order_id,
                user_id,
                total,
                item_count,
            } => {
                info!(%order_id, %user_id, %total, item_count, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
                changed_by,
            } => {
                info!(
                    %order_id,
                    %old_status,
                    %new_status,
                    changed_by = ?changed_by,
                    "order status changed"
                );
            }
            Event::PaymentProcessed {
                payment_id,
                order_id,
                status,
            } => {
                info!(%payment_id, %order_id, status = status.label(), "payment processed");
            }
            Event::StockRestored { book_id, quantity } => {
                info!(%book_id, quantity, "stock restored");
            }
            Event::BookDeleted(book_id) => {
                info!(%book_id, "book deleted");
            }
            Event::UserDeleted {
                user_id,
                deleted_by,
            } => {
                info!(%user_id, %deleted_by, "user deleted");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::BookDeleted(id)).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::BookDeleted(id)));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        sender.send_or_log(Event::UserRegistered(Uuid::new_v4())).await;
        assert!(sender.send(Event::UserRegistered(Uuid::new_v4())).await.is_err());
    }
}
