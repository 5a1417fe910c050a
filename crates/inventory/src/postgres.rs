use async_trait::async_trait;
use common::{Money, ProductId};
use domain::Product;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::service::merge_items;
use crate::{InventoryError, InventoryService, ProductCatalog, ReservationItem, Result};

/// PostgreSQL-backed stock.
///
/// Each batch runs in one transaction. Rows are locked with `FOR UPDATE` in
/// product id order, so two overlapping batches serialize without deadlock.
#[derive(Clone)]
pub struct PostgresInventory {
    pool: PgPool,
}

impl PostgresInventory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a product with its own id, or overwrites it.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, amount, in_stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                amount = EXCLUDED.amount,
                in_stock = EXCLUDED.in_stock
            "#,
        )
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.minor())
        .bind(product.amount)
        .bind(product.in_stock)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_minor(row.try_get("price")?),
            amount: row.try_get("amount")?,
            in_stock: row.try_get("in_stock")?,
        })
    }

    /// Locks the rows of every product in the batch, ordered by id.
    async fn lock_rows(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[i64],
    ) -> Result<Vec<(ProductId, i64, bool)>> {
        let rows = sqlx::query(
            r#"
            SELECT id, amount, in_stock
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    ProductId::new(row.try_get("id")?),
                    row.try_get("amount")?,
                    row.try_get("in_stock")?,
                ))
            })
            .collect()
    }

    async fn adjust(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        delta: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET amount = amount + $2,
                in_stock = (amount + $2) > 0
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_i64())
        .bind(delta)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryService for PostgresInventory {
    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    async fn reserve(&self, items: &[ReservationItem]) -> Result<()> {
        let merged = merge_items(items);
        let ids: Vec<i64> = merged.keys().map(ProductId::as_i64).collect();

        let mut tx = self.pool.begin().await?;
        let locked = Self::lock_rows(&mut tx, &ids).await?;

        for (product_id, requested) in &merged {
            let (_, amount, in_stock) = locked
                .iter()
                .find(|(id, _, _)| id == product_id)
                .ok_or(InventoryError::ProductNotFound(*product_id))?;
            if !in_stock {
                return Err(InventoryError::OutOfStock(*product_id));
            }
            if *amount < *requested as i64 {
                return Err(InventoryError::InsufficientStock {
                    product_id: *product_id,
                    requested: *requested,
                    available: *amount,
                });
            }
        }

        for (product_id, requested) in &merged {
            Self::adjust(&mut tx, *product_id, -(*requested as i64)).await?;
        }

        tx.commit().await?;
        tracing::debug!(products = merged.len(), "stock reserved");
        Ok(())
    }

    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    async fn unreserve(&self, items: &[ReservationItem]) -> Result<()> {
        let merged = merge_items(items);
        let ids: Vec<i64> = merged.keys().map(ProductId::as_i64).collect();

        let mut tx = self.pool.begin().await?;
        let locked = Self::lock_rows(&mut tx, &ids).await?;

        if let Some(missing) = merged
            .keys()
            .find(|id| !locked.iter().any(|(locked_id, _, _)| locked_id == *id))
        {
            return Err(InventoryError::ProductNotFound(*missing));
        }

        for (product_id, quantity) in &merged {
            Self::adjust(&mut tx, *product_id, *quantity as i64).await?;
        }

        tx.commit().await?;
        tracing::debug!(products = merged.len(), "stock released");
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for PostgresInventory {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, amount, in_stock
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }
}
