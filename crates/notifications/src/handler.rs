use std::fmt::Write;

use async_trait::async_trait;
use domain::Order;

use crate::{Message, MessageHandler, Notification, NotificationError, Notifier, Result};

/// Sends the "order accepted" message for each confirmed order on the topic.
pub struct OrderEmailHandler<N> {
    notifier: N,
    sender: String,
}

impl<N: Notifier> OrderEmailHandler<N> {
    pub fn new(notifier: N, sender: impl Into<String>) -> Self {
        Self {
            notifier,
            sender: sender.into(),
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Renders the message for an order.
    pub fn render(&self, order: &Order) -> Notification {
        let mut body = format!("Your order {} has been accepted.\n\n", order.id);
        for line in &order.lines {
            let _ = writeln!(
                body,
                "- product {} x{} @ {} = {}",
                line.product_id, line.quantity, line.unit_price, line.price
            );
        }
        let _ = write!(body, "\nTotal: {}", order.total_price);

        Notification {
            from: self.sender.clone(),
            to: order.user_email.clone(),
            subject: format!("Order {} accepted", order.id),
            body,
        }
    }
}

#[async_trait]
impl<N: Notifier> MessageHandler for OrderEmailHandler<N> {
    #[tracing::instrument(skip(self, message), fields(offset = message.offset, key = ?message.key))]
    async fn handle(&self, message: &Message) -> Result<()> {
        let order: Order = serde_json::from_slice(&message.payload)
            .map_err(|e| NotificationError::Decode(e.to_string()))?;

        self.notifier.send(&self.render(&order)).await
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, ProductId, UserId};
    use domain::OrderLine;

    use super::*;
    use crate::InMemoryNotifier;

    fn message(payload: Vec<u8>) -> Message {
        Message {
            topic: "order_created".to_string(),
            partition: 0,
            offset: 0,
            key: Some("k".to_string()),
            payload,
        }
    }

    fn order() -> Order {
        Order::new(
            UserId::new(1),
            "buyer@example.com",
            vec![
                OrderLine::priced(ProductId::new(1), 2, Money::from_major(5)),
                OrderLine::priced(ProductId::new(2), 1, Money::from_major(10)),
            ],
        )
    }

    #[tokio::test]
    async fn test_sends_to_order_owner() {
        let handler = OrderEmailHandler::new(InMemoryNotifier::new(), "shop@example.com");
        let order = order();

        handler
            .handle(&message(serde_json::to_vec(&order).unwrap()))
            .await
            .unwrap();

        let sent = handler.notifier().sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@example.com");
        assert_eq!(sent[0].from, "shop@example.com");
        assert!(sent[0].body.contains("Total: 20.00"));
        assert!(sent[0].body.contains("product 1 x2 @ 5.00 = 10.00"));
    }

    #[tokio::test]
    async fn test_garbage_payload_is_poison() {
        let handler = OrderEmailHandler::new(InMemoryNotifier::new(), "shop@example.com");

        let err = handler.handle(&message(b"not json".to_vec())).await.unwrap_err();

        assert!(err.is_poison());
        assert_eq!(handler.notifier().attempts(), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_not_poison() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail_on_send(true);
        let handler = OrderEmailHandler::new(notifier, "shop@example.com");

        let err = handler
            .handle(&message(serde_json::to_vec(&order()).unwrap()))
            .await
            .unwrap_err();

        assert!(!err.is_poison());
    }
}
