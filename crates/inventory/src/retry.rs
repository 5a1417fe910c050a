//! Bounded retry around a reservation backend.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::{InventoryError, InventoryService, ReservationItem, Result};

/// Retry count, per-attempt deadline and backoff bounds for reservation calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub attempt_timeout: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(5),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Reserve,
    Unreserve,
}

/// Wraps an [`InventoryService`] with per-attempt timeouts and bounded retry.
///
/// Only [`InventoryError::is_retryable`] failures are repeated. Rejections
/// and timeouts surface on the first occurrence.
#[derive(Clone)]
pub struct RetryingInventory<I> {
    inner: I,
    policy: RetryPolicy,
}

impl<I: InventoryService> RetryingInventory<I> {
    pub fn new(inner: I, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    async fn attempt(&self, op: Op, items: &[ReservationItem]) -> Result<()> {
        let call = async {
            match op {
                Op::Reserve => self.inner.reserve(items).await,
                Op::Unreserve => self.inner.unreserve(items).await,
            }
        };

        tokio::time::timeout(self.policy.attempt_timeout, call)
            .await
            .unwrap_or(Err(InventoryError::Timeout(self.policy.attempt_timeout)))
    }

    async fn call(&self, op: Op, items: &[ReservationItem]) -> Result<()> {
        (|| async { self.attempt(op, items).await })
            .retry(self.policy.backoff())
            .when(InventoryError::is_retryable)
            .notify(|err: &InventoryError, delay: Duration| {
                warn!(op = ?op, error = %err, delay = ?delay, "inventory call failed, retrying");
            })
            .await
    }
}

#[async_trait]
impl<I: InventoryService> InventoryService for RetryingInventory<I> {
    async fn reserve(&self, items: &[ReservationItem]) -> Result<()> {
        self.call(Op::Reserve, items).await
    }

    async fn unreserve(&self, items: &[ReservationItem]) -> Result<()> {
        self.call(Op::Unreserve, items).await
    }
}
