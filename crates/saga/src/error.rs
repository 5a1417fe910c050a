//! Error taxonomy of the order saga.

use domain::OrderError;
use inventory::InventoryError;
use notifications::NotificationError;
use order_store::StoreError;
use payment::PaymentError;
use thiserror::Error;

/// Errors returned by orchestrator operations.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// Malformed request or status value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown product or order.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state transition or insufficient stock.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Reservation service, payment gateway or order store failed.
    #[error("Dependency failed: {0}")]
    Dependency(String),

    /// A best-effort side effect failed after retries.
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderingError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderingError::Validation(_) => "validation",
            OrderingError::NotFound(_) => "not_found",
            OrderingError::Conflict(_) => "conflict",
            OrderingError::Forbidden(_) => "forbidden",
            OrderingError::Dependency(_) => "dependency",
            OrderingError::Transient(_) => "transient",
            OrderingError::Internal(_) => "internal",
        }
    }
}

impl From<OrderError> for OrderingError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { .. } => OrderingError::Conflict(err.to_string()),
            OrderError::NoLines
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidStatus(_) => OrderingError::Validation(err.to_string()),
        }
    }
}

impl From<StoreError> for OrderingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => OrderingError::NotFound(err.to_string()),
            StoreError::Duplicate(_) => OrderingError::Conflict(err.to_string()),
            StoreError::Corrupt(_) => OrderingError::Internal(err.to_string()),
            StoreError::Unavailable(_) | StoreError::Database(_) => {
                OrderingError::Dependency(err.to_string())
            }
        }
    }
}

impl From<InventoryError> for OrderingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::ProductNotFound(_) => OrderingError::NotFound(err.to_string()),
            InventoryError::InsufficientStock { .. }
            | InventoryError::OutOfStock(_)
            | InventoryError::Rejected(_) => OrderingError::Conflict(err.to_string()),
            InventoryError::Unavailable(_)
            | InventoryError::Timeout(_)
            | InventoryError::Rpc(_)
            | InventoryError::Database(_) => OrderingError::Dependency(err.to_string()),
        }
    }
}

impl From<PaymentError> for OrderingError {
    fn from(err: PaymentError) -> Self {
        OrderingError::Dependency(err.to_string())
    }
}

impl From<NotificationError> for OrderingError {
    fn from(err: NotificationError) -> Self {
        OrderingError::Transient(err.to_string())
    }
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrderingError>;
