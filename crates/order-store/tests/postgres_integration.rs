//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{Money, OrderId, ProductId, UserId};
use domain::{Order, OrderLine, OrderStatus};
use order_store::{OrderStore, PostgresOrderStore, StoreError, Transition};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_orders_table.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_lines, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn sample_order(user: i64) -> Order {
    Order::new(
        UserId::new(user),
        "buyer@example.com",
        vec![
            OrderLine::priced(ProductId::new(1), 2, Money::from_minor(500)),
            OrderLine::priced(ProductId::new(2), 1, Money::from_minor(1000)),
        ],
    )
}

#[tokio::test]
#[serial]
async fn insert_and_get_roundtrips_lines_in_order() {
    let store = get_test_store().await;
    let order = sample_order(1);

    store.insert(&order).await.unwrap();

    let loaded = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.user_id, order.user_id);
    assert_eq!(loaded.user_email, "buyer@example.com");
    assert_eq!(loaded.status, OrderStatus::Pending);
    assert_eq!(loaded.total_price, Money::from_minor(2000));
    assert_eq!(loaded.lines, order.lines);
    assert!(loaded.total_is_consistent());
}

#[tokio::test]
#[serial]
async fn get_missing_order_returns_none() {
    let store = get_test_store().await;
    assert!(store.get(OrderId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_insert_is_rejected() {
    let store = get_test_store().await;
    let order = sample_order(1);

    store.insert(&order).await.unwrap();
    let result = store.insert(&order).await;

    assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == order.id));
}

#[tokio::test]
#[serial]
async fn transition_is_compare_and_set() {
    let store = get_test_store().await;
    let order = sample_order(1);
    store.insert(&order).await.unwrap();

    let applied = store
        .transition(order.id, OrderStatus::Pending, OrderStatus::Created)
        .await
        .unwrap();
    assert!(matches!(applied, Transition::Applied(ref o) if o.status == OrderStatus::Created));

    let stale = store
        .transition(order.id, OrderStatus::Pending, OrderStatus::Canceled)
        .await
        .unwrap();
    assert_eq!(
        stale,
        Transition::Stale {
            current: OrderStatus::Created
        }
    );

    let missing = store
        .transition(OrderId::new(), OrderStatus::Pending, OrderStatus::Created)
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn applied_transition_returns_full_order() {
    let store = get_test_store().await;
    let order = sample_order(1);
    store.insert(&order).await.unwrap();

    let Transition::Applied(updated) = store
        .transition(order.id, OrderStatus::Pending, OrderStatus::Canceled)
        .await
        .unwrap()
    else {
        panic!("transition should apply");
    };

    assert_eq!(updated.status, OrderStatus::Canceled);
    assert_eq!(updated.user_email, "buyer@example.com");
    assert_eq!(updated.lines, order.lines);
    assert!(updated.updated_at >= order.updated_at);

    let reloaded = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(reloaded, updated);
}

#[tokio::test]
#[serial]
async fn concurrent_transitions_have_single_winner() {
    let store = get_test_store().await;
    let order = sample_order(1);
    store.insert(&order).await.unwrap();

    let (a, b) = tokio::join!(
        store.transition(order.id, OrderStatus::Pending, OrderStatus::Created),
        store.transition(order.id, OrderStatus::Pending, OrderStatus::Canceled),
    );

    assert_ne!(a.unwrap().is_applied(), b.unwrap().is_applied());
}

#[tokio::test]
#[serial]
async fn list_for_user_is_newest_first_and_scoped() {
    let store = get_test_store().await;
    let first = sample_order(1);
    let mut second = sample_order(1);
    second.created_at = first.created_at + chrono::Duration::seconds(10);
    let other = sample_order(2);

    store.insert(&first).await.unwrap();
    store.insert(&second).await.unwrap();
    store.insert(&other).await.unwrap();

    let listed = store.list_for_user(UserId::new(1)).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
