//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::{Config, LogFormat};
use api::{AppState, Backends};
use inventory::{
    HttpInventoryClient, InMemoryInventory, InventoryService, PostgresInventory, ProductCatalog,
    RetryingInventory,
};
use notifications::{
    HttpNotifier, InMemoryTopic, MessageHandler, OrderEmailHandler, OrderPublisher, Subscription,
    TopicPublisher, TracingNotifier, WorkerPool,
};
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use payment::{HttpPaymentGateway, InMemoryPaymentGateway, PaymentGateway};
use saga::OrderOrchestrator;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

struct Storage {
    store: Arc<dyn OrderStore>,
    stock: Arc<dyn InventoryService>,
    catalog: Arc<dyn ProductCatalog>,
    name: &'static str,
}

async fn storage(config: &Config) -> Storage {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, orders and stock are kept in memory");
        let inventory = Arc::new(InMemoryInventory::new());
        return Storage {
            store: Arc::new(InMemoryOrderStore::new()),
            stock: inventory.clone(),
            catalog: inventory,
            name: "memory",
        };
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .expect("failed to connect to PostgreSQL");
    let store = PostgresOrderStore::new(pool.clone());
    store
        .run_migrations()
        .await
        .expect("failed to run migrations");

    let inventory = Arc::new(PostgresInventory::new(pool));
    Storage {
        store: Arc::new(store),
        stock: inventory.clone(),
        catalog: inventory,
        name: "postgres",
    }
}

fn payment_gateway(config: &Config) -> (Arc<dyn PaymentGateway>, &'static str) {
    match config.payment_gateway_config() {
        Some(gateway) => {
            let gateway = HttpPaymentGateway::new(gateway).expect("invalid payment gateway config");
            (Arc::new(gateway), "http")
        }
        None => {
            tracing::warn!("payment credentials not set, using the sandbox gateway");
            (Arc::new(InMemoryPaymentGateway::new()), "sandbox")
        }
    }
}

async fn notification_channel(
    config: &Config,
) -> (Arc<dyn OrderPublisher>, Arc<dyn Subscription>, &'static str) {
    #[cfg(feature = "kafka")]
    if let Some(brokers) = &config.kafka_brokers {
        use notifications::{KafkaConfig, KafkaSubscription, KafkaTopic};

        let kafka = KafkaConfig::new(brokers, &config.notify_topic);
        let topic = KafkaTopic::new(kafka.clone()).expect("failed to create Kafka producer");
        let subscription = KafkaSubscription::new(&kafka, &config.notify_group)
            .expect("failed to create Kafka consumer");
        return (
            Arc::new(TopicPublisher::new(topic, config.publisher_config())),
            Arc::new(subscription),
            "kafka",
        );
    }

    #[cfg(not(feature = "kafka"))]
    if config.kafka_brokers.is_some() {
        tracing::warn!("KAFKA_BROKERS set but the kafka feature is disabled");
    }

    let topic = InMemoryTopic::new(&config.notify_topic);
    let subscription = topic.subscribe(&config.notify_group).await;
    (
        Arc::new(TopicPublisher::new(topic, config.publisher_config())),
        Arc::new(subscription),
        "memory",
    )
}

fn notification_handler(config: &Config) -> Arc<dyn MessageHandler> {
    match &config.notifier_url {
        Some(url) => {
            let notifier =
                HttpNotifier::new(url, NOTIFIER_TIMEOUT).expect("failed to build notifier client");
            Arc::new(OrderEmailHandler::new(notifier, &config.notify_sender))
        }
        None => Arc::new(OrderEmailHandler::new(TracingNotifier, &config.notify_sender)),
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle =
        api::routes::metrics::install_recorder().expect("failed to install Prometheus recorder");

    // 3. Wire collaborators
    let storage = storage(&config).await;
    let (payments, payments_name) = payment_gateway(&config);
    let (publisher, subscription, topic_name) = notification_channel(&config).await;

    let (reservations, inventory_name): (Arc<dyn InventoryService>, _) = match &config.inventory_url
    {
        Some(url) => {
            let client = HttpInventoryClient::new(url);
            let retrying = RetryingInventory::new(client, config.inventory_retry_policy());
            (Arc::new(retrying), "http")
        }
        None => (storage.stock.clone(), storage.name),
    };

    let orchestrator = OrderOrchestrator::new(
        storage.store.clone(),
        reservations,
        storage.catalog.clone(),
        payments,
        publisher,
    )
    .with_config(config.orchestrator_config());

    let backends = Backends {
        store: storage.name,
        inventory: inventory_name,
        payments: payments_name,
        topic: topic_name,
    };
    tracing::info!(?backends, "collaborators wired");
    let state = Arc::new(AppState::new(
        Arc::new(orchestrator),
        storage.stock.clone(),
        backends,
    ));

    // 4. Start the notification worker pool
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = WorkerPool::new(config.worker_pool_config());
    let handler = notification_handler(&config);
    let workers = tokio::spawn(async move { pool.run(subscription, handler, shutdown_rx).await });

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Drain in-flight notifications
    let _ = shutdown_tx.send(true);
    match workers.await {
        Ok(report) => tracing::info!(
            handled = report.handled,
            failed = report.failed,
            poisoned = report.poisoned,
            "notification workers drained"
        ),
        Err(e) => tracing::error!(error = %e, "notification worker pool panicked"),
    }

    tracing::info!("server shut down gracefully");
}
