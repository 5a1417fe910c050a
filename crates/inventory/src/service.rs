//! Reservation and catalog capabilities.

use std::collections::BTreeMap;

use async_trait::async_trait;
use common::ProductId;
use domain::Product;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One (product, quantity) pair of a reservation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ReservationItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Sums quantities per product.
///
/// The map is ordered by product id, which is also the order in which
/// adapters take per-product locks.
pub fn merge_items(items: &[ReservationItem]) -> BTreeMap<ProductId, u64> {
    let mut merged = BTreeMap::new();
    for item in items {
        *merged.entry(item.product_id).or_insert(0u64) += u64::from(item.quantity);
    }
    merged
}

/// Stock reservation over a set of lines.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Decrements stock for every item, or for none of them.
    async fn reserve(&self, items: &[ReservationItem]) -> Result<()>;

    /// Gives the stock of every item back. Compensation only.
    async fn unreserve(&self, items: &[ReservationItem]) -> Result<()>;
}

/// Read access to catalog products.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_items_sums_duplicates() {
        let merged = merge_items(&[
            ReservationItem::new(2, 1),
            ReservationItem::new(1, 2),
            ReservationItem::new(2, 3),
        ]);

        let entries: Vec<_> = merged.into_iter().collect();
        assert_eq!(entries, vec![(ProductId::new(1), 2), (ProductId::new(2), 4)]);
    }

    #[test]
    fn test_merge_items_empty() {
        assert!(merge_items(&[]).is_empty());
    }
}
