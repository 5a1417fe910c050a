//! Saga coordinator for the order lifecycle.

use std::sync::Arc;
use std::time::Instant;

use common::{OrderId, ProductId};
use domain::{Order, OrderLine, OrderLineRequest, OrderStatus, OrderSummary, validate_lines};
use inventory::{InventoryService, ProductCatalog, ReservationItem};
use notifications::OrderPublisher;
use order_store::{OrderStore, Transition};
use payment::{CreatePaymentRequest, IdempotencyKey, PaymentGateway};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::caller::Caller;
use crate::error::{OrderingError, Result};

/// Payment-request settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub currency: String,
    /// Where the gateway sends the buyer after paying.
    pub return_url: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            currency: "RUB".to_string(),
            return_url: "http://localhost:3000/payment/success".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = return_url.into();
        self
    }
}

/// A freshly created order and the handle to pay for it.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment_id: String,
    pub confirmation_url: Option<String>,
}

/// Orchestrates the order saga across stock, storage, payment and
/// notification collaborators.
///
/// Within one order, reservation succeeds strictly before the order is
/// stored and before payment is requested. Every status change is a
/// compare-and-set against the status just read, so concurrent
/// confirm/cancel calls on one order have exactly one winner.
#[derive(Clone)]
pub struct OrderOrchestrator {
    store: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryService>,
    catalog: Arc<dyn ProductCatalog>,
    payments: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn OrderPublisher>,
    config: OrchestratorConfig,
}

impl OrderOrchestrator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        inventory: Arc<dyn InventoryService>,
        catalog: Arc<dyn ProductCatalog>,
        payments: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn OrderPublisher>,
    ) -> Self {
        Self {
            store,
            inventory,
            catalog,
            payments,
            publisher,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Prices the lines, reserves stock, stores a `Pending` order and
    /// requests a payment intent for its total.
    ///
    /// Nothing is stored if pricing or reservation fails. If storing or the
    /// payment request fails afterwards, the reservation is released and a
    /// stored order is moved to `Canceled` before the error is returned.
    ///
    /// A payment request with an unknown outcome (timeout, unreadable answer)
    /// is not compensated: the gateway may still deliver `payment.succeeded`,
    /// so the order stays `Pending` with its stock reserved.
    #[tracing::instrument(
        skip(self, caller, lines),
        fields(user_id = %caller.user_id, lines = lines.len())
    )]
    pub async fn create_order(
        &self,
        caller: &Caller,
        lines: &[OrderLineRequest],
    ) -> Result<PlacedOrder> {
        let started = Instant::now();

        let quantities = validate_lines(lines)?;
        let mut priced = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in quantities {
            let product = self
                .catalog
                .get_product(product_id)
                .await?
                .ok_or_else(|| product_not_found(product_id))?;
            priced.push(OrderLine::priced(product_id, quantity, product.price));
        }

        let items: Vec<ReservationItem> = priced
            .iter()
            .map(|line| ReservationItem::new(line.product_id, line.quantity))
            .collect();

        if let Err(e) = self.inventory.reserve(&items).await {
            let outcome = if e.is_rejection() { "rejected" } else { "failed" };
            metrics::counter!("inventory_reserve_total", "outcome" => outcome).increment(1);
            warn!(error = %e, "reservation failed, order not created");
            return Err(e.into());
        }
        metrics::counter!("inventory_reserve_total", "outcome" => "ok").increment(1);

        let order = Order::new(caller.user_id, caller.email.clone(), priced);
        if let Err(e) = self.store.insert(&order).await {
            error!(order_id = %order.id, error = %e, "failed to store order, releasing stock");
            self.release(order.id, &items).await;
            return Err(e.into());
        }

        let request = CreatePaymentRequest::for_order(
            order.id,
            order.total_price,
            &self.config.currency,
            &self.config.return_url,
        );
        let intent = match self
            .payments
            .create_payment(&request, &IdempotencyKey::fresh())
            .await
        {
            Ok(intent) => intent,
            Err(e) if e.is_ambiguous() => {
                metrics::counter!("payment_intents_total", "outcome" => "ambiguous").increment(1);
                error!(
                    order_id = %order.id,
                    error = %e,
                    "payment intent outcome unknown, order left pending with stock reserved"
                );
                return Err(e.into());
            }
            Err(e) => {
                metrics::counter!("payment_intents_total", "outcome" => "failed").increment(1);
                error!(order_id = %order.id, error = %e, "payment intent failed, compensating");
                self.abandon(&order, &items).await;
                return Err(e.into());
            }
        };
        metrics::counter!("payment_intents_total", "outcome" => "ok").increment(1);
        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            order_id = %order.id,
            total = %order.total_price,
            payment_id = %intent.id,
            "order created"
        );
        Ok(PlacedOrder {
            confirmation_url: intent.confirmation_url().map(str::to_string),
            payment_id: intent.id,
            order,
        })
    }

    /// Moves a `Pending` order to `Created` and announces it.
    ///
    /// Any other current status is a no-op that returns the order as is, so
    /// a redelivered payment event is harmless. A failed announcement is
    /// logged; the order stays `Created`.
    ///
    /// Confirming a `Canceled` order means money was taken for an order
    /// whose stock is gone. It stays `Canceled` and is reported as an error.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if order.status == OrderStatus::Canceled {
            flag_paid_after_cancel(order_id);
            return Ok(order);
        }
        if !order.status.can_confirm() {
            debug!(status = %order.status, "order already processed, confirm is a no-op");
            return Ok(order);
        }

        match self
            .store
            .transition(order_id, OrderStatus::Pending, OrderStatus::Created)
            .await?
        {
            Transition::Applied(order) => {
                metrics::counter!("orders_confirmed_total").increment(1);
                info!("order confirmed");
                if let Err(e) = self.publisher.publish_confirmed(&order).await {
                    warn!(error = %e, "order confirmed but notification was not published");
                }
                Ok(order)
            }
            Transition::Stale { current } => {
                if current == OrderStatus::Canceled {
                    flag_paid_after_cancel(order_id);
                } else {
                    debug!(status = %current, "lost confirm race, no-op");
                }
                self.load(order_id).await
            }
        }
    }

    /// Cancels a non-terminal order and gives its stock back.
    ///
    /// The status is claimed first, then stock is released, so two cancels
    /// never both credit stock. Losing the claim to a concurrent transition
    /// is a conflict.
    ///
    /// If the release provably did not happen the claim is undone and a
    /// dependency error is returned, leaving the cancel safe to retry. When
    /// its outcome is unknown (timeout, broken response) the order stays
    /// `Canceled`: a retry could credit the same stock twice.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !order.status.can_cancel() {
            return Err(OrderingError::Conflict(format!(
                "order {order_id} is already {}",
                order.status
            )));
        }

        let previous = order.status;
        let canceled = match self
            .store
            .transition(order_id, previous, OrderStatus::Canceled)
            .await?
        {
            Transition::Applied(canceled) => canceled,
            Transition::Stale { current } => {
                return Err(OrderingError::Conflict(format!(
                    "order {order_id} moved to {current} while canceling"
                )));
            }
        };

        if let Err(e) = self.inventory.unreserve(&reservation_items(&canceled)).await {
            if e.is_not_applied() {
                error!(error = %e, "stock release failed, undoing cancel");
                self.undo_cancel(order_id, previous).await;
                return Err(OrderingError::Dependency(e.to_string()));
            }
            metrics::counter!("compensation_failures_total").increment(1);
            error!(error = %e, "stock release outcome unknown, order stays canceled");
        }

        metrics::counter!("orders_canceled_total").increment(1);
        info!(from = %previous, "order canceled");
        Ok(canceled)
    }

    /// Cancels on behalf of a user: owners and moderators only.
    pub async fn cancel_order_as(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        self.get_visible(caller, order_id).await?;
        self.cancel_order(order_id).await
    }

    /// Moderator-only move to `Delivering` or `Delivered`.
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn update_order_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order> {
        if !caller.is_moderator() {
            return Err(OrderingError::Forbidden(
                "only moderators may change order status".to_string(),
            ));
        }
        if !target.is_moderator_target() {
            return Err(OrderingError::Validation(format!(
                "status {target} cannot be set directly"
            )));
        }

        let order = self.load(order_id).await?;
        if !order.status.can_advance_to(target) {
            return Err(domain::OrderError::InvalidTransition {
                from: order.status,
                to: target,
            }
            .into());
        }

        match self.store.transition(order_id, order.status, target).await? {
            Transition::Applied(updated) => {
                info!(from = %order.status, to = %target, "order status updated");
                Ok(updated)
            }
            Transition::Stale { current } => Err(domain::OrderError::InvalidTransition {
                from: current,
                to: target,
            }
            .into()),
        }
    }

    /// Reads one order, with each line enriched with current product detail.
    ///
    /// Orders of other users are reported as not found unless the caller is a
    /// moderator.
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn get_order_by_id(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        let mut order = self.get_visible(caller, order_id).await?;

        for line in &mut order.lines {
            match self.catalog.get_product(line.product_id).await {
                Ok(product) => line.product = product,
                Err(e) => {
                    warn!(product_id = %line.product_id, error = %e, "product detail unavailable")
                }
            }
        }
        Ok(order)
    }

    /// The caller's own orders, newest first.
    pub async fn get_all_orders(&self, caller: &Caller) -> Result<Vec<OrderSummary>> {
        Ok(self.store.list_for_user(caller.user_id).await?)
    }

    /// Current status of an order, without access checks.
    pub async fn order_status(&self, order_id: OrderId) -> Result<OrderStatus> {
        Ok(self.load(order_id).await?.status)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| OrderingError::NotFound(format!("order {order_id}")))
    }

    async fn get_visible(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if caller.can_access(&order) {
            Ok(order)
        } else {
            Err(OrderingError::NotFound(format!("order {order_id}")))
        }
    }

    /// Compensation for a stored order whose payment could not be requested.
    async fn abandon(&self, order: &Order, items: &[ReservationItem]) {
        match self
            .store
            .transition(order.id, OrderStatus::Pending, OrderStatus::Canceled)
            .await
        {
            Ok(Transition::Applied(_)) => {
                metrics::counter!("orders_canceled_total").increment(1);
                self.release(order.id, items).await;
            }
            Ok(Transition::Stale { current }) => {
                warn!(
                    order_id = %order.id,
                    status = %current,
                    "order moved before compensation, keeping stock"
                );
            }
            Err(e) => {
                metrics::counter!("compensation_failures_total").increment(1);
                error!(order_id = %order.id, error = %e, "could not cancel abandoned order");
                self.release(order.id, items).await;
            }
        }
    }

    async fn release(&self, order_id: OrderId, items: &[ReservationItem]) {
        if let Err(e) = self.inventory.unreserve(items).await {
            metrics::counter!("compensation_failures_total").increment(1);
            error!(%order_id, error = %e, "failed to release reserved stock");
        }
    }

    async fn undo_cancel(&self, order_id: OrderId, previous: OrderStatus) {
        match self
            .store
            .transition(order_id, OrderStatus::Canceled, previous)
            .await
        {
            Ok(Transition::Applied(_)) => {}
            Ok(Transition::Stale { current }) => {
                metrics::counter!("compensation_failures_total").increment(1);
                error!(%order_id, status = %current, "could not undo cancel");
            }
            Err(e) => {
                metrics::counter!("compensation_failures_total").increment(1);
                error!(%order_id, error = %e, "could not undo cancel");
            }
        }
    }
}

fn flag_paid_after_cancel(order_id: OrderId) {
    metrics::counter!("orders_paid_after_cancel_total").increment(1);
    error!(%order_id, "payment succeeded for a canceled order, needs refund");
}

fn product_not_found(product_id: ProductId) -> OrderingError {
    OrderingError::NotFound(format!("product {product_id}"))
}

fn reservation_items(order: &Order) -> Vec<ReservationItem> {
    order
        .lines
        .iter()
        .map(|line| ReservationItem::new(line.product_id, line.quantity))
        .collect()
}
