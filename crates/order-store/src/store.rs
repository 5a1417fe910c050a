use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus, OrderSummary};

use crate::Result;

/// Outcome of a compare-and-set status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The stored status matched and was replaced; carries the updated order.
    Applied(Order),

    /// The stored status no longer matched the expected one; nothing changed.
    Stale { current: OrderStatus },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

/// Persistence for orders.
///
/// Orders are written once and afterwards only their status changes. All
/// status writes go through [`OrderStore::transition`], a compare-and-set on
/// the persisted status, so two concurrent transitions on the same order can
/// never both win.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order with its lines.
    ///
    /// Header and lines are written atomically. Fails with `Duplicate` if
    /// the identity is already taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order with its lines. Returns None if it doesn't exist.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists the user's orders, newest first, header only.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>>;

    /// Moves the order from `from` to `to` if its persisted status is still `from`.
    ///
    /// Fails with `NotFound` if the order does not exist.
    async fn transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Transition>;
}
