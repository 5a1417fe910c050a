use std::time::Duration;

use common::ProductId;
use thiserror::Error;

/// Errors raised by reservation and catalog lookups.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: i64,
    },

    #[error("Product {0} is out of stock")]
    OutOfStock(ProductId),

    /// The remote service refused the request for a business reason.
    #[error("Reservation rejected: {0}")]
    Rejected(String),

    /// The request provably did not reach the service (connect failure, 503).
    #[error("Inventory service unavailable: {0}")]
    Unavailable(String),

    /// No answer within the per-attempt deadline. The outcome is unknown.
    #[error("Inventory call timed out after {0:?}")]
    Timeout(Duration),

    /// Unexpected transport or protocol failure.
    #[error("Inventory RPC failed: {0}")]
    Rpc(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl InventoryError {
    /// Returns true if the call can be repeated without risking a double
    /// application. Timeouts are excluded: the first attempt may have landed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::Unavailable(_))
    }

    /// Returns true if the service provably left stock untouched: the call
    /// never reached it, or it refused the request. Timeouts, protocol and
    /// database failures are ambiguous and return false.
    pub fn is_not_applied(&self) -> bool {
        self.is_retryable()
            || self.is_rejection()
            || matches!(self, InventoryError::ProductNotFound(_))
    }

    /// Returns true for stock-related business rejections.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            InventoryError::InsufficientStock { .. }
                | InventoryError::OutOfStock(_)
                | InventoryError::Rejected(_)
        )
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(InventoryError::Unavailable("refused".into()).is_retryable());
        assert!(!InventoryError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!InventoryError::OutOfStock(ProductId::new(1)).is_retryable());
        assert!(!InventoryError::ProductNotFound(ProductId::new(1)).is_retryable());
    }

    #[test]
    fn test_rejections() {
        let err = InventoryError::InsufficientStock {
            product_id: ProductId::new(2),
            requested: 3,
            available: 1,
        };
        assert!(err.is_rejection());
        assert!(!InventoryError::Rpc("bad frame".into()).is_rejection());
    }

    #[test]
    fn test_ambiguous_failures_are_not_known_unapplied() {
        assert!(InventoryError::Unavailable("refused".into()).is_not_applied());
        assert!(InventoryError::OutOfStock(ProductId::new(1)).is_not_applied());
        assert!(InventoryError::ProductNotFound(ProductId::new(1)).is_not_applied());
        assert!(InventoryError::Rejected("locked".into()).is_not_applied());

        assert!(!InventoryError::Timeout(Duration::from_millis(50)).is_not_applied());
        assert!(!InventoryError::Rpc("connection reset".into()).is_not_applied());
        assert!(!InventoryError::Database(sqlx::Error::PoolTimedOut).is_not_applied());
    }
}
