//! Payment gateway webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use payment::WebhookEvent;
use saga::WebhookOutcome;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        let (status, order_id) = match outcome {
            WebhookOutcome::Confirmed(id) => ("confirmed", Some(id)),
            WebhookOutcome::PaidAfterCancel(id) => ("paid_after_cancel", Some(id)),
            WebhookOutcome::Canceled(id) => ("canceled", Some(id)),
            WebhookOutcome::AlreadyCanceled(id) => ("already_canceled", Some(id)),
            WebhookOutcome::Ignored(_) => ("ignored", None),
        };
        Self {
            status,
            order_id: order_id.map(|id| id.to_string()),
        }
    }
}

/// POST /payment/webhook: payment status events from the gateway.
///
/// Answers 200 for handled and ignored events. Errors are non-2xx so the
/// gateway redelivers.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WebhookEvent>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Json(event) = body?;
    let outcome = state.webhooks.handle(&event).await?;
    Ok(Json(outcome.into()))
}
