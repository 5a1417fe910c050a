use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus, OrderSummary};
use tokio::sync::RwLock;

use crate::{OrderStore, Result, StoreError, Transition};

/// In-memory order store for testing and local runs.
///
/// Provides the same compare-and-set semantics as the PostgreSQL store: a
/// transition is checked and applied under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    fail_on_insert: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on subsequent insert calls.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.fail_on_insert.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        if self.fail_on_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(order.id));
        }

        // Display detail is never part of the persisted record.
        let mut stored = order.clone();
        for line in &mut stored.lines {
            line.product = None;
        }
        orders.insert(order.id, stored);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        let orders = self.orders.read().await;
        let mut summaries: Vec<_> = orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(OrderSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Transition> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound(order_id))?;

        if order.status != from {
            return Ok(Transition::Stale {
                current: order.status,
            });
        }

        order.status = to;
        order.updated_at = Utc::now();
        Ok(Transition::Applied(order.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, ProductId};
    use domain::{OrderLine, Product};

    fn sample_order(user: i64) -> Order {
        Order::new(
            UserId::new(user),
            "buyer@example.com",
            vec![OrderLine::priced(ProductId::new(1), 2, Money::from_minor(500))],
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(1);

        store.insert(&order).await.unwrap();

        let loaded = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(loaded, order);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryOrderStore::new();
        assert!(store.get(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(1);
        store.insert(&order).await.unwrap();

        let result = store.insert(&order).await;
        assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == order.id));
    }

    #[tokio::test]
    async fn test_insert_drops_display_detail() {
        let store = InMemoryOrderStore::new();
        let mut order = sample_order(1);
        order.lines[0].product = Some(Product::new(1, "Widget", Money::from_minor(500), 3));

        store.insert(&order).await.unwrap();

        let loaded = store.get(order.id).await.unwrap().unwrap();
        assert!(loaded.lines[0].product.is_none());
    }

    #[tokio::test]
    async fn test_fail_on_insert() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_insert(true);

        let result = store.insert(&sample_order(1)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_transition_applies_when_status_matches() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(1);
        store.insert(&order).await.unwrap();

        let outcome = store
            .transition(order.id, OrderStatus::Pending, OrderStatus::Created)
            .await
            .unwrap();

        match outcome {
            Transition::Applied(updated) => {
                assert_eq!(updated.status, OrderStatus::Created);
                assert!(updated.updated_at >= order.updated_at);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transition_is_stale_when_status_changed() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(1);
        store.insert(&order).await.unwrap();

        store
            .transition(order.id, OrderStatus::Pending, OrderStatus::Canceled)
            .await
            .unwrap();

        let outcome = store
            .transition(order.id, OrderStatus::Pending, OrderStatus::Created)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Transition::Stale {
                current: OrderStatus::Canceled
            }
        );
    }

    #[tokio::test]
    async fn test_transition_missing_order() {
        let store = InMemoryOrderStore::new();
        let result = store
            .transition(OrderId::new(), OrderStatus::Pending, OrderStatus::Created)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_transitions_only_one_wins() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(1);
        store.insert(&order).await.unwrap();

        let confirm = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .transition(order.id, OrderStatus::Pending, OrderStatus::Created)
                    .await
            })
        };
        let cancel = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .transition(order.id, OrderStatus::Pending, OrderStatus::Canceled)
                    .await
            })
        };

        let a = confirm.await.unwrap().unwrap();
        let b = cancel.await.unwrap().unwrap();
        assert_ne!(a.is_applied(), b.is_applied());
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let store = InMemoryOrderStore::new();
        let first = sample_order(1);
        let mut second = sample_order(1);
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        let other_user = sample_order(2);

        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();
        store.insert(&other_user).await.unwrap();

        let listed = store.list_for_user(UserId::new(1)).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
