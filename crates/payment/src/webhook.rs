//! Inbound gateway notifications.

use serde::{Deserialize, Serialize};

use crate::Metadata;

/// Event names the orchestrator reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Succeeded,
    Canceled,
    Other(String),
}

impl PaymentEvent {
    pub fn parse(event: &str) -> Self {
        match event {
            "payment.succeeded" => PaymentEvent::Succeeded,
            "payment.canceled" => PaymentEvent::Canceled,
            other => PaymentEvent::Other(other.to_string()),
        }
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &str {
        match self {
            PaymentEvent::Succeeded => "succeeded",
            PaymentEvent::Canceled => "canceled",
            PaymentEvent::Other(_) => "ignored",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

/// `{type, event, object: {id, status, paid, metadata: {order_id}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub object: WebhookObject,
}

impl WebhookEvent {
    pub fn payment_event(&self) -> PaymentEvent {
        PaymentEvent::parse(&self.event)
    }

    pub fn order_id(&self) -> Option<&str> {
        self.object.metadata.order_id()
    }
}
