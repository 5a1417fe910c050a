//! Payment-gateway webhook dispatch.

use std::sync::Arc;

use common::OrderId;
use domain::OrderStatus;
use payment::{PaymentEvent, WebhookEvent};
use tracing::{info, warn};

use crate::error::{OrderingError, Result};
use crate::orchestrator::OrderOrchestrator;

/// What a webhook delivery resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A succeeded event was processed. Confirming is a no-op unless the
    /// order was still pending.
    Confirmed(OrderId),
    /// A succeeded event arrived for an order that was already canceled.
    /// The payment needs a refund.
    PaidAfterCancel(OrderId),
    Canceled(OrderId),
    /// A redelivered cancel for an order that is already canceled.
    AlreadyCanceled(OrderId),
    /// Event type the orchestrator does not handle.
    Ignored(String),
}

/// Maps gateway events onto orchestrator transitions.
///
/// Deliveries are at-least-once; repeated events rely on the orchestrator's
/// status checks and never apply twice.
#[derive(Clone)]
pub struct WebhookReceiver {
    orchestrator: Arc<OrderOrchestrator>,
}

impl WebhookReceiver {
    pub fn new(orchestrator: Arc<OrderOrchestrator>) -> Self {
        Self { orchestrator }
    }

    #[tracing::instrument(
        skip(self, event),
        fields(event = %event.event, payment_id = %event.object.id)
    )]
    pub async fn handle(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let payment_event = event.payment_event();

        if let PaymentEvent::Other(name) = &payment_event {
            metrics::counter!("webhook_events_total", "event" => "ignored").increment(1);
            warn!(event = %name, "ignoring unhandled payment event");
            return Ok(WebhookOutcome::Ignored(name.clone()));
        }

        let raw = event.order_id().ok_or_else(|| {
            OrderingError::NotFound("payment event carries no order id".to_string())
        })?;
        let order_id = OrderId::parse(raw)
            .map_err(|e| OrderingError::Validation(format!("invalid order id {raw}: {e}")))?;

        metrics::counter!("webhook_events_total", "event" => payment_event.label().to_string())
            .increment(1);

        match payment_event {
            PaymentEvent::Succeeded => {
                let order = self.orchestrator.confirm_order(order_id).await?;
                if order.status == OrderStatus::Canceled {
                    return Ok(WebhookOutcome::PaidAfterCancel(order_id));
                }
                info!(%order_id, status = %order.status, "payment succeeded");
                Ok(WebhookOutcome::Confirmed(order_id))
            }
            PaymentEvent::Canceled => match self.orchestrator.cancel_order(order_id).await {
                Ok(_) => {
                    info!(%order_id, "payment canceled, order canceled");
                    Ok(WebhookOutcome::Canceled(order_id))
                }
                Err(OrderingError::Conflict(reason)) => {
                    if self.orchestrator.order_status(order_id).await? == OrderStatus::Canceled {
                        Ok(WebhookOutcome::AlreadyCanceled(order_id))
                    } else {
                        Err(OrderingError::Conflict(reason))
                    }
                }
                Err(e) => Err(e),
            },
            PaymentEvent::Other(name) => Ok(WebhookOutcome::Ignored(name)),
        }
    }
}
