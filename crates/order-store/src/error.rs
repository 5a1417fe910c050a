use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order with the same identity was already stored.
    #[error("Order already exists: {0}")]
    Duplicate(OrderId),

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt order record: {0}")]
    Corrupt(String),

    /// The backing store is not reachable.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
