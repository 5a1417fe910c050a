//! HTTP API server for the order saga.
//!
//! Serves the order endpoints, the payment gateway webhook and the
//! reservation RPC, with structured logging (tracing) and Prometheus metrics.

pub mod caller;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use inventory::{InMemoryInventory, InventoryService};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{InMemoryTopic, TopicPublisher};
use order_store::InMemoryOrderStore;
use payment::InMemoryPaymentGateway;
use saga::{OrderOrchestrator, WebhookReceiver};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Adapter names reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct Backends {
    pub store: &'static str,
    pub inventory: &'static str,
    pub payments: &'static str,
    pub topic: &'static str,
}

impl Backends {
    pub fn in_memory() -> Self {
        Self {
            store: "memory",
            inventory: "memory",
            payments: "sandbox",
            topic: "memory",
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: Arc<OrderOrchestrator>,
    pub webhooks: WebhookReceiver,
    /// Local stock owner behind the reservation RPC endpoints.
    pub inventory: Arc<dyn InventoryService>,
    pub backends: Backends,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<OrderOrchestrator>,
        inventory: Arc<dyn InventoryService>,
        backends: Backends,
    ) -> Self {
        Self {
            webhooks: WebhookReceiver::new(orchestrator.clone()),
            orchestrator,
            inventory,
            backends,
        }
    }
}

/// In-process adapters behind [`create_default_state`], kept for inspection.
#[derive(Clone)]
pub struct InMemoryBackends {
    pub store: InMemoryOrderStore,
    pub inventory: InMemoryInventory,
    pub payments: InMemoryPaymentGateway,
    pub topic: InMemoryTopic,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders/create", post(routes::orders::create))
        .route("/orders/all", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .route("/orders/cancel/{id}", put(routes::orders::cancel))
        .route(
            "/orders/update-status/delivering/{id}",
            post(routes::orders::mark_delivering),
        )
        .route(
            "/orders/update-status/delivered/{id}",
            post(routes::orders::mark_delivered),
        )
        .route("/payment/webhook", post(routes::webhook::receive))
        .route(inventory::rpc::RESERVE_PATH, post(routes::inventory::reserve))
        .route(inventory::rpc::UNRESERVE_PATH, post(routes::inventory::unreserve))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state wired entirely to in-process adapters.
pub fn create_default_state(
    config: &Config,
    inventory: InMemoryInventory,
) -> (Arc<AppState>, InMemoryBackends) {
    let backends = InMemoryBackends {
        store: InMemoryOrderStore::new(),
        inventory,
        payments: InMemoryPaymentGateway::new(),
        topic: InMemoryTopic::new(&config.notify_topic),
    };

    let publisher = TopicPublisher::new(backends.topic.clone(), config.publisher_config());
    let orchestrator = OrderOrchestrator::new(
        Arc::new(backends.store.clone()),
        Arc::new(backends.inventory.clone()),
        Arc::new(backends.inventory.clone()),
        Arc::new(backends.payments.clone()),
        Arc::new(publisher),
    )
    .with_config(config.orchestrator_config());

    let state = Arc::new(AppState::new(
        Arc::new(orchestrator),
        Arc::new(backends.inventory.clone()),
        Backends::in_memory(),
    ));
    (state, backends)
}
