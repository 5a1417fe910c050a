use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::{Message, NotificationError, OffsetTracker, Result, Subscription, Topic};

const PARTITION: i32 = 0;

#[derive(Debug, Clone)]
struct Record {
    key: String,
    payload: Vec<u8>,
}

#[derive(Default)]
struct TopicState {
    log: Vec<Record>,
    groups: HashMap<String, OffsetTracker>,
}

/// Single-partition durable topic held in memory.
///
/// Keeps the whole log and a committed position per consumer group. A new
/// subscription for a group resumes at the first unacknowledged offset, which
/// is how redelivery after a failed handler is observed.
#[derive(Clone)]
pub struct InMemoryTopic {
    name: String,
    state: Arc<Mutex<TopicState>>,
    appended: Arc<Notify>,
    failures_left: Arc<AtomicUsize>,
    publish_attempts: Arc<AtomicUsize>,
}

impl InMemoryTopic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(TopicState::default())),
            appended: Arc::new(Notify::new()),
            failures_left: Arc::new(AtomicUsize::new(0)),
            publish_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes the next `count` publish attempts fail.
    pub fn set_fail_publishes(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn publish_attempts(&self) -> usize {
        self.publish_attempts.load(Ordering::SeqCst)
    }

    /// All messages in the log, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        let state = self.state.lock().await;
        state
            .log
            .iter()
            .enumerate()
            .map(|(offset, record)| self.to_message(offset as i64, record))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.log.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The next offset a group would read after a restart.
    pub async fn committed(&self, group: &str) -> i64 {
        let state = self.state.lock().await;
        state
            .groups
            .get(group)
            .and_then(|tracker| tracker.watermark(PARTITION))
            .unwrap_or(0)
    }

    /// Joins `group`, starting at its committed position.
    pub async fn subscribe(&self, group: impl Into<String>) -> InMemorySubscription {
        let group = group.into();
        let start = {
            let mut state = self.state.lock().await;
            let tracker = state.groups.entry(group.clone()).or_default();
            tracker.track(PARTITION, 0);
            tracker.watermark(PARTITION).unwrap_or(0)
        };

        InMemorySubscription {
            topic: self.clone(),
            group,
            cursor: Mutex::new(start),
        }
    }

    fn to_message(&self, offset: i64, record: &Record) -> Message {
        Message {
            topic: self.name.clone(),
            partition: PARTITION,
            offset,
            key: Some(record.key.clone()),
            payload: record.payload.clone(),
        }
    }
}

#[async_trait]
impl Topic for InMemoryTopic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.publish_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotificationError::Publish("broker unavailable".to_string()));
        }

        self.state.lock().await.log.push(Record {
            key: key.to_string(),
            payload: payload.to_vec(),
        });
        self.appended.notify_waiters();
        Ok(())
    }
}

/// A consumer-group member of an [`InMemoryTopic`].
pub struct InMemorySubscription {
    topic: InMemoryTopic,
    group: String,
    cursor: Mutex<i64>,
}

impl InMemorySubscription {
    pub fn group(&self) -> &str {
        &self.group
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&self) -> Result<Message> {
        let mut cursor = self.cursor.lock().await;
        loop {
            let appended = self.topic.appended.notified();
            {
                let state = self.topic.state.lock().await;
                if let Some(record) = state.log.get(*cursor as usize) {
                    let message = self.topic.to_message(*cursor, record);
                    *cursor += 1;
                    return Ok(message);
                }
            }
            appended.await;
        }
    }

    async fn commit(&self, message: &Message) -> Result<()> {
        let mut state = self.topic.state.lock().await;
        state
            .groups
            .entry(self.group.clone())
            .or_default()
            .complete(message.partition, message.offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_publish_and_consume() {
        let topic = InMemoryTopic::new("order_created");
        topic.publish("order-1", b"one").await.unwrap();
        topic.publish("order-2", b"two").await.unwrap();

        let subscription = topic.subscribe("mailer").await;
        let first = subscription.next().await.unwrap();
        let second = subscription.next().await.unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(first.key.as_deref(), Some("order-1"));
        assert_eq!(second.payload, b"two");
        assert_eq!(second.topic, "order_created");
    }

    #[tokio::test]
    async fn test_next_waits_for_publish() {
        let topic = InMemoryTopic::new("t");
        let subscription = topic.subscribe("g").await;

        let publisher = topic.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish("k", b"late").await.unwrap();
        });

        let message = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.payload, b"late");
    }

    #[tokio::test]
    async fn test_uncommitted_messages_are_redelivered() {
        let topic = InMemoryTopic::new("t");
        for key in ["a", "b", "c"] {
            topic.publish(key, key.as_bytes()).await.unwrap();
        }

        let subscription = topic.subscribe("g").await;
        let a = subscription.next().await.unwrap();
        let _b = subscription.next().await.unwrap();
        let c = subscription.next().await.unwrap();
        // b's handler failed, so only a and c are acknowledged
        subscription.commit(&a).await.unwrap();
        subscription.commit(&c).await.unwrap();

        assert_eq!(topic.committed("g").await, 1);

        let resumed = topic.subscribe("g").await;
        let redelivered = resumed.next().await.unwrap();
        assert_eq!(redelivered.key.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_groups_have_independent_positions() {
        let topic = InMemoryTopic::new("t");
        topic.publish("k", b"v").await.unwrap();

        let mailer = topic.subscribe("mailer").await;
        let message = mailer.next().await.unwrap();
        mailer.commit(&message).await.unwrap();

        assert_eq!(topic.committed("mailer").await, 1);
        assert_eq!(topic.committed("audit").await, 0);
    }

    #[tokio::test]
    async fn test_fail_publishes() {
        let topic = InMemoryTopic::new("t");
        topic.set_fail_publishes(2);

        assert!(topic.publish("k", b"1").await.is_err());
        assert!(topic.publish("k", b"2").await.is_err());
        topic.publish("k", b"3").await.unwrap();

        assert_eq!(topic.publish_attempts(), 3);
        assert_eq!(topic.len().await, 1);
    }
}
