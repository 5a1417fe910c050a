use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{CreatePaymentRequest, PaymentIntent, Result};

/// Token that makes a payment-creation call safe to repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a new random key. Use one per logical attempt.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for IdempotencyKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// The remote payment gateway as seen by the orchestrator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent. Not retried by callers.
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<PaymentIntent>;
}
