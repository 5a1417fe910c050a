use async_trait::async_trait;
use common::{Money, OrderId, ProductId, UserId};
use domain::{Order, OrderLine, OrderStatus, OrderSummary};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{OrderStore, Result, StoreError, Transition};

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn parse_status(raw: &str) -> Result<OrderStatus> {
        OrderStatus::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("unknown status {raw}")))
    }

    fn row_to_summary(row: &PgRow) -> Result<OrderSummary> {
        let status: String = row.try_get("status")?;
        Ok(OrderSummary {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            status: Self::parse_status(&status)?,
            total_price: Money::from_minor(row.try_get("total_price")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLine> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity}")))?;

        Ok(OrderLine {
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity,
            unit_price: Money::from_minor(row.try_get("unit_price")?),
            price: Money::from_minor(row.try_get("price")?),
            product: None,
        })
    }

    async fn load_lines<'e, E>(executor: E, order_id: OrderId) -> Result<Vec<OrderLine>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price, price
            FROM order_lines
            WHERE order_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(executor)
        .await?;

        rows.iter().map(Self::row_to_line).collect()
    }

    fn assemble(header: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let summary = Self::row_to_summary(header)?;
        Ok(Order {
            id: summary.id,
            user_id: UserId::new(header.try_get("user_id")?),
            user_email: header.try_get("user_email")?,
            lines,
            status: summary.status,
            total_price: summary.total_price,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        })
    }

    async fn load_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        status.as_deref().map(Self::parse_status).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, user_email, status, total_price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_i64())
        .bind(&order.user_email)
        .bind(order.status.as_str())
        .bind(order.total_price.minor())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Duplicate(order.id);
            }
            StoreError::Database(e)
        })?;

        for (line_no, line) in order.lines.iter().enumerate() {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| StoreError::Corrupt(format!("quantity {} too large", line.quantity)))?;

            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, product_id, quantity, unit_price, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i32)
            .bind(line.product_id.as_i64())
            .bind(quantity)
            .bind(line.unit_price.minor())
            .bind(line.price.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(lines = order.lines.len(), "order persisted");
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let header = sqlx::query(
            r#"
            SELECT id, user_id, user_email, status, total_price, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines = Self::load_lines(&self.pool, order_id).await?;
        Self::assemble(&header, lines).map(Some)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, total_price, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    #[tracing::instrument(skip(self), fields(%order_id, %from, %to))]
    async fn transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Transition> {
        // Conditional update: the row is only touched if its status is still `from`.
        // The order handed back is read inside the same transaction as the update.
        let mut tx = self.pool.begin().await?;

        let header = sqlx::query(
            r#"
            UPDATE orders SET status = $1, updated_at = now()
            WHERE id = $2 AND status = $3
            RETURNING id, user_id, user_email, status, total_price, created_at, updated_at
            "#,
        )
        .bind(to.as_str())
        .bind(order_id.as_uuid())
        .bind(from.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(header) = header {
            let lines = Self::load_lines(&mut *tx, order_id).await?;
            let order = Self::assemble(&header, lines)?;
            tx.commit().await?;
            return Ok(Transition::Applied(order));
        }
        tx.rollback().await?;

        match self.load_status(order_id).await? {
            Some(current) => Ok(Transition::Stale { current }),
            None => Err(StoreError::NotFound(order_id)),
        }
    }
}
