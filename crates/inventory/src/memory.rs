use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{Money, ProductId};
use domain::Product;
use tokio::sync::Mutex;

use crate::service::merge_items;
use crate::{InventoryError, InventoryService, ProductCatalog, ReservationItem, Result};

/// In-memory product stock for tests and local runs.
///
/// A single lock guards every product, so a batch is checked and applied as
/// one step and concurrent reservations are serialized.
#[derive(Clone, Default)]
pub struct InMemoryInventory {
    products: Arc<Mutex<HashMap<ProductId, Product>>>,
    fail_on_reserve: Arc<AtomicBool>,
    fail_on_unreserve: Arc<AtomicBool>,
    reserve_calls: Arc<AtomicUsize>,
    unreserve_calls: Arc<AtomicUsize>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an inventory seeded with the given products.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: Arc::new(Mutex::new(products)),
            ..Self::default()
        }
    }

    /// Inserts or replaces a product.
    pub async fn upsert_product(&self, product: Product) {
        self.products.lock().await.insert(product.id, product);
    }

    /// Changes the catalog price of a product. Returns false if it is unknown.
    pub async fn set_price(&self, product_id: ProductId, price: Money) -> bool {
        match self.products.lock().await.get_mut(&product_id) {
            Some(product) => {
                product.price = price;
                true
            }
            None => false,
        }
    }

    /// Returns the available amount of a product.
    pub async fn stock(&self, product_id: ProductId) -> Option<i64> {
        self.products
            .lock()
            .await
            .get(&product_id)
            .map(|p| p.amount)
    }

    /// Makes subsequent reserve calls fail as if the service were down.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.fail_on_reserve.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent unreserve calls fail as if the service were down.
    pub fn set_fail_on_unreserve(&self, fail: bool) {
        self.fail_on_unreserve.store(fail, Ordering::SeqCst);
    }

    pub fn reserve_calls(&self) -> usize {
        self.reserve_calls.load(Ordering::SeqCst)
    }

    pub fn unreserve_calls(&self) -> usize {
        self.unreserve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryService for InMemoryInventory {
    async fn reserve(&self, items: &[ReservationItem]) -> Result<()> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_reserve.load(Ordering::SeqCst) {
            return Err(InventoryError::Unavailable("reserve rejected".to_string()));
        }

        let merged = merge_items(items);
        let mut products = self.products.lock().await;

        // Check the whole batch before touching any counter.
        for (product_id, requested) in &merged {
            let product = products
                .get(product_id)
                .ok_or(InventoryError::ProductNotFound(*product_id))?;
            if !product.in_stock {
                return Err(InventoryError::OutOfStock(*product_id));
            }
            if product.amount < *requested as i64 {
                return Err(InventoryError::InsufficientStock {
                    product_id: *product_id,
                    requested: *requested,
                    available: product.amount,
                });
            }
        }

        for (product_id, requested) in &merged {
            if let Some(product) = products.get_mut(product_id) {
                product.set_amount(product.amount - *requested as i64);
            }
        }
        Ok(())
    }

    async fn unreserve(&self, items: &[ReservationItem]) -> Result<()> {
        self.unreserve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_unreserve.load(Ordering::SeqCst) {
            return Err(InventoryError::Unavailable("unreserve rejected".to_string()));
        }

        let merged = merge_items(items);
        let mut products = self.products.lock().await;

        if let Some(missing) = merged.keys().find(|id| !products.contains_key(*id)) {
            return Err(InventoryError::ProductNotFound(*missing));
        }

        for (product_id, quantity) in &merged {
            if let Some(product) = products.get_mut(product_id) {
                product.set_amount(product.amount + *quantity as i64);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryInventory {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.lock().await.get(&product_id).cloned())
    }
}
