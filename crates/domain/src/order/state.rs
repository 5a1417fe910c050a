//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──confirm──► Created ──► Delivering ──► Delivered
///    │                    │            │
///    └────────────────────┴────────────┴──cancel──► Canceled
/// ```
///
/// Moderators may also move a `Created` order straight to `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Inventory reserved, awaiting payment.
    #[default]
    Pending,

    /// Payment succeeded, order accepted for fulfillment.
    Created,

    /// Order handed over for delivery.
    Delivering,

    /// Order delivered to the customer (terminal state).
    Delivered,

    /// Order canceled and its stock released (terminal state).
    Canceled,
}

impl OrderStatus {
    /// Returns true if a payment confirmation can move the order forward.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be canceled in this status.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if a moderator may move the order from this status to `target`.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Created, OrderStatus::Delivering)
                | (OrderStatus::Created, OrderStatus::Delivered)
                | (OrderStatus::Delivering, OrderStatus::Delivered)
        )
    }

    /// Returns true if `self` is a status a moderator may request.
    pub fn is_moderator_target(&self) -> bool {
        matches!(self, OrderStatus::Delivering | OrderStatus::Delivered)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    /// Parses a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "created" => Some(OrderStatus::Created),
            "delivering" => Some(OrderStatus::Delivering),
            "delivered" => Some(OrderStatus::Delivered),
            "canceled" | "cancelled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Created => "Created",
            OrderStatus::Delivering => "Delivering",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
