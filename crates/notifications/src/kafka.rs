//! Kafka-backed topic (feature `kafka`).

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::Offset;
use rdkafka::TopicPartitionList;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message as KafkaMessage;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Message, NotificationError, OffsetTracker, Result, Subscription, Topic};

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub send_timeout: Duration,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            send_timeout: Duration::from_secs(5),
        }
    }

    fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.brokers);
        config.set("message.timeout.ms", "5000");
        config.set("acks", "all");
        config.set("enable.idempotence", "true");
        config
    }

    fn consumer_config(&self, group: &str) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.brokers);
        config.set("group.id", group);
        config.set("enable.auto.commit", "false");
        config.set("auto.offset.reset", "earliest");
        config
    }
}

/// Producer side of a Kafka topic.
pub struct KafkaTopic {
    producer: FutureProducer,
    config: KafkaConfig,
}

impl KafkaTopic {
    pub fn new(config: KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .producer_config()
            .create()
            .map_err(|e| {
                NotificationError::Config(format!("Failed to create Kafka producer: {e}"))
            })?;

        info!(brokers = %config.brokers, topic = %config.topic, "Connected to Kafka");
        Ok(Self { producer, config })
    }
}

#[async_trait]
impl Topic for KafkaTopic {
    fn name(&self) -> &str {
        &self.config.topic
    }

    async fn publish(&self, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(&self.config.topic).key(key).payload(payload);

        self.producer
            .send(record, self.config.send_timeout)
            .await
            .map_err(|(e, _)| NotificationError::Publish(e.to_string()))?;

        debug!(topic = %self.config.topic, key = %key, "published to Kafka");
        Ok(())
    }
}

/// Consumer-group member with manual commits.
///
/// Commits go through an [`OffsetTracker`] so a partition's committed
/// position never passes a message whose handler has not succeeded.
pub struct KafkaSubscription {
    consumer: StreamConsumer,
    topic: String,
    tracker: Mutex<OffsetTracker>,
}

impl KafkaSubscription {
    pub fn new(config: &KafkaConfig, group: &str) -> Result<Self> {
        let consumer: StreamConsumer = config
            .consumer_config(group)
            .create()
            .map_err(|e| {
                NotificationError::Config(format!("Failed to create Kafka consumer: {e}"))
            })?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| NotificationError::Config(format!("Failed to subscribe: {e}")))?;

        info!(topic = %config.topic, group = %group, "Subscribed to Kafka topic");
        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            tracker: Mutex::new(OffsetTracker::new()),
        })
    }
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn next(&self) -> Result<Message> {
        let borrowed = self
            .consumer
            .recv()
            .await
            .map_err(|e| NotificationError::Fetch(e.to_string()))?;

        let message = Message {
            topic: borrowed.topic().to_string(),
            partition: borrowed.partition(),
            offset: borrowed.offset(),
            key: borrowed
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: borrowed.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        };

        self.tracker
            .lock()
            .await
            .track(message.partition, message.offset);
        Ok(message)
    }

    async fn commit(&self, message: &Message) -> Result<()> {
        let watermark = self
            .tracker
            .lock()
            .await
            .complete(message.partition, message.offset);

        let Some(next) = watermark else {
            return Ok(());
        };

        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&self.topic, message.partition, Offset::Offset(next))
            .map_err(|e| NotificationError::Commit(e.to_string()))?;
        self.consumer
            .commit(&offsets, CommitMode::Async)
            .map_err(|e| NotificationError::Commit(e.to_string()))
    }
}
