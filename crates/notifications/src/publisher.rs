use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use domain::Order;
use tracing::{debug, warn};

use crate::{NotificationError, Result, Topic};

/// Bounded retry for publishing.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl PublisherConfig {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Announces confirmed orders to downstream consumers.
#[async_trait]
pub trait OrderPublisher: Send + Sync {
    /// Publishes the order keyed by its id. Returns
    /// [`NotificationError::Transient`] once retries are exhausted.
    async fn publish_confirmed(&self, order: &Order) -> Result<()>;
}

/// Publishes JSON-serialized orders to a [`Topic`].
pub struct TopicPublisher<T> {
    topic: T,
    config: PublisherConfig,
}

impl<T: Topic> TopicPublisher<T> {
    pub fn new(topic: T, config: PublisherConfig) -> Self {
        Self { topic, config }
    }

    pub fn topic(&self) -> &T {
        &self.topic
    }
}

#[async_trait]
impl<T: Topic> OrderPublisher for TopicPublisher<T> {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, topic = self.topic.name()))]
    async fn publish_confirmed(&self, order: &Order) -> Result<()> {
        let key = order.id.to_string();
        let payload =
            serde_json::to_vec(order).map_err(|e| NotificationError::Decode(e.to_string()))?;
        let attempts = AtomicUsize::new(0);

        let result = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            self.topic.publish(&key, &payload).await
        })
        .retry(self.config.backoff())
        .notify(|err: &NotificationError, delay: Duration| {
            warn!(error = %err, delay = ?delay, "publish failed, retrying");
        })
        .await;

        match result {
            Ok(()) => {
                metrics::counter!("notifications_published_total", "outcome" => "ok").increment(1);
                debug!("order event published");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("notifications_published_total", "outcome" => "failed")
                    .increment(1);
                Err(NotificationError::Transient {
                    attempts: attempts.load(Ordering::SeqCst),
                    message: e.to_string(),
                })
            }
        }
    }
}
