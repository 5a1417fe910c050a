//! Order records, lines and the status state machine.

mod model;
mod state;

pub use model::{Order, OrderLine, OrderLineRequest, OrderSummary, validate_lines};
pub use state::OrderStatus;

use common::ProductId;
use thiserror::Error;

/// Errors raised by order validation and status transitions.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order has no lines.
    #[error("Order must contain at least one line")]
    NoLines,

    /// A line has a non-positive quantity.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// Unknown status value.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// The order is not in a status that allows the requested transition.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },
}
