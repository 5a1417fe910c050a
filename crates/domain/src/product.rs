//! Catalog product detail as seen by the order side.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product together with its stock counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Current unit price.
    pub price: Money,
    /// Units available for reservation.
    pub amount: i64,
    /// Derived flag, kept equal to `amount > 0`.
    pub in_stock: bool,
}

impl Product {
    /// Creates a product whose `in_stock` flag is derived from `amount`.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        amount: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            amount,
            in_stock: amount > 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true if `quantity` units can be reserved right now.
    pub fn can_reserve(&self, quantity: u32) -> bool {
        self.in_stock && self.amount >= i64::from(quantity)
    }

    /// Sets the stock amount and recomputes `in_stock`.
    pub fn set_amount(&mut self, amount: i64) {
        self.amount = amount;
        self.in_stock = amount > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stock_follows_amount() {
        let mut product = Product::new(1, "Widget", Money::from_minor(500), 2);
        assert!(product.in_stock);

        product.set_amount(0);
        assert!(!product.in_stock);

        product.set_amount(3);
        assert!(product.in_stock);
    }

    #[test]
    fn test_can_reserve() {
        let product = Product::new(1, "Widget", Money::from_minor(500), 2);
        assert!(product.can_reserve(1));
        assert!(product.can_reserve(2));
        assert!(!product.can_reserve(3));

        let mut flagged = product.clone();
        flagged.in_stock = false;
        assert!(!flagged.can_reserve(1));
    }
}
