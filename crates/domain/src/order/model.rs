//! Order records and their price-snapshotted lines.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::product::Product;

use super::{OrderError, OrderStatus};

/// A requested line before pricing: which product and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    /// Signed so that zero and negative quantities reach validation instead
    /// of failing deserialization.
    pub quantity: i64,
}

impl OrderLineRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Validates a create-order request and returns the quantities as `u32`.
///
/// Requires at least one line and a positive quantity on every line.
pub fn validate_lines(lines: &[OrderLineRequest]) -> Result<Vec<(ProductId, u32)>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::NoLines);
    }

    lines
        .iter()
        .map(|line| {
            u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q > 0)
                .map(|q| (line.product_id, q))
                .ok_or(OrderError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
        })
        .collect()
}

/// A line of an order with its price captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The ordered product.
    pub product_id: ProductId,

    /// Quantity ordered (always positive).
    pub quantity: u32,

    /// Unit price captured when the order was placed.
    pub unit_price: Money,

    /// `unit_price × quantity`; immutable after creation.
    pub price: Money,

    /// Current product detail, filled in for display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

impl OrderLine {
    /// Creates a line, snapshotting `unit_price × quantity`.
    pub fn priced(product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            price: unit_price.multiply(quantity),
            product: None,
        }
    }
}

/// A purchase order.
///
/// Orders are only mutated through status transitions; the lines and the
/// total are fixed once the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: String,
    pub lines: Vec<OrderLine>,
    pub status: OrderStatus,
    /// Sum of all line prices.
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new `Pending` order with a fresh identity.
    pub fn new(user_id: UserId, user_email: impl Into<String>, lines: Vec<OrderLine>) -> Self {
        let now = Utc::now();
        let total_price = lines.iter().map(|line| line.price).sum();
        Self {
            id: OrderId::new(),
            user_id,
            user_email: user_email.into(),
            lines,
            status: OrderStatus::Pending,
            total_price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the `(product, quantity)` pairs of this order.
    pub fn quantities(&self) -> Vec<(ProductId, u32)> {
        self.lines
            .iter()
            .map(|line| (line.product_id, line.quantity))
            .collect()
    }

    /// Returns true if the stored total matches the sum of line prices.
    pub fn total_is_consistent(&self) -> bool {
        self.total_price == self.lines.iter().map(|line| line.price).sum()
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Header-only view of an order, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            total_price: order.total_price,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_price_is_snapshotted() {
        let line = OrderLine::priced(ProductId::new(1), 3, Money::from_minor(1000));
        assert_eq!(line.price, Money::from_minor(3000));
        assert_eq!(line.unit_price, Money::from_minor(1000));
        assert!(line.product.is_none());
    }

    #[test]
    fn test_new_order_total_is_sum_of_lines() {
        let order = Order::new(
            UserId::new(7),
            "buyer@example.com",
            vec![
                OrderLine::priced(ProductId::new(1), 2, Money::from_minor(500)),
                OrderLine::priced(ProductId::new(2), 1, Money::from_minor(1000)),
            ],
        );

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Money::from_minor(2000));
        assert!(order.total_is_consistent());
        assert_eq!(
            order.quantities(),
            vec![(ProductId::new(1), 2), (ProductId::new(2), 1)]
        );
    }

    #[test]
    fn test_validate_lines_rejects_empty() {
        assert!(matches!(validate_lines(&[]), Err(OrderError::NoLines)));
    }

    #[test]
    fn test_validate_lines_rejects_non_positive_quantity() {
        for quantity in [0, -3] {
            let lines = [
                OrderLineRequest::new(1, 2),
                OrderLineRequest::new(2, quantity),
            ];
            let err = validate_lines(&lines).unwrap_err();
            assert!(matches!(
                err,
                OrderError::InvalidQuantity { product_id, quantity: q }
                    if product_id == ProductId::new(2) && q == quantity
            ));
        }
    }

    #[test]
    fn test_validate_lines_accepts_positive_quantities() {
        let lines = [OrderLineRequest::new(1, 2), OrderLineRequest::new(2, 1)];
        let validated = validate_lines(&lines).unwrap();
        assert_eq!(
            validated,
            vec![(ProductId::new(1), 2), (ProductId::new(2), 1)]
        );
    }

    #[test]
    fn test_product_detail_is_omitted_when_absent() {
        let line = OrderLine::priced(ProductId::new(1), 1, Money::from_minor(100));
        let json = serde_json::to_value(&line).unwrap();
        assert!(json.get("product").is_none());

        let back: OrderLine = serde_json::from_value(json).unwrap();
        assert_eq!(back, line);
    }

    #[test]
    fn test_summary_copies_header() {
        let order = Order::new(UserId::new(1), "a@b.c", vec![]);
        let summary = OrderSummary::from(&order);
        assert_eq!(summary.id, order.id);
        assert_eq!(summary.status, OrderStatus::Pending);
        assert!(summary.total_price.is_zero());
    }
}
