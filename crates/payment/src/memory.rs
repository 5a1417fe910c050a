use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    ConfirmationResponse, CreatePaymentRequest, IdempotencyKey, PaymentError, PaymentGateway,
    PaymentIntent, Result,
};

#[derive(Default)]
struct SandboxState {
    intents: HashMap<IdempotencyKey, PaymentIntent>,
    requests: Vec<(IdempotencyKey, CreatePaymentRequest)>,
}

/// Sandbox gateway that records every request.
///
/// Honours idempotency keys the way the real gateway does: a repeated key
/// returns the intent created for it the first time.
#[derive(Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<SandboxState>>,
    fail_on_create: Arc<AtomicBool>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail as if the gateway were unreachable.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Number of distinct intents created.
    pub async fn intent_count(&self) -> usize {
        self.state.lock().await.intents.len()
    }

    /// Every request received, in arrival order.
    pub async fn requests(&self) -> Vec<(IdempotencyKey, CreatePaymentRequest)> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<PaymentIntent> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(PaymentError::Unavailable("sandbox offline".to_string()));
        }

        let mut state = self.state.lock().await;
        state.requests.push((key.clone(), request.clone()));

        if let Some(existing) = state.intents.get(key) {
            return Ok(existing.clone());
        }

        let id = format!("sandbox-{:06}", state.intents.len() + 1);
        let intent = PaymentIntent {
            confirmation: Some(ConfirmationResponse {
                kind: request.confirmation.kind.clone(),
                confirmation_url: Some(format!("https://sandbox.payments.local/checkout/{id}")),
            }),
            id,
            status: "pending".to_string(),
            paid: false,
            amount: Some(request.amount.clone()),
            metadata: request.metadata.clone(),
        };
        state.intents.insert(key.clone(), intent.clone());
        Ok(intent)
    }
}
