//! Topic, subscription and handler capabilities.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::Result;

/// A fetched message and its position in the topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

/// Producer side of a durable topic.
#[async_trait]
pub trait Topic: Send + Sync {
    fn name(&self) -> &str;

    /// Appends one message. A single attempt; retries belong to the caller.
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<()>;
}

/// Consumer-group side of a durable topic.
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Waits for the next message.
    async fn next(&self) -> Result<Message>;

    /// Acknowledges a handled message.
    async fn commit(&self, message: &Message) -> Result<()>;
}

/// Processes one message. An error leaves the message unacknowledged, except
/// for poison messages (see [`crate::NotificationError::is_poison`]).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<()>;
}

#[derive(Debug)]
struct PartitionOffsets {
    next: i64,
    done: BTreeSet<i64>,
}

/// Tracks handled offsets per partition and yields the commit watermark.
///
/// Workers finish out of order. The watermark only moves over a contiguous
/// run of handled offsets, so committing it never acknowledges a message
/// that is still in flight or whose handler failed.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    partitions: HashMap<i32, PartitionOffsets>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fetched offset. The first one seen starts the partition.
    pub fn track(&mut self, partition: i32, offset: i64) {
        self.partitions
            .entry(partition)
            .or_insert_with(|| PartitionOffsets {
                next: offset,
                done: BTreeSet::new(),
            });
    }

    /// Marks an offset handled. Returns the new watermark (next offset to
    /// read) when it advanced.
    pub fn complete(&mut self, partition: i32, offset: i64) -> Option<i64> {
        self.track(partition, offset);
        let offsets = self.partitions.get_mut(&partition)?;
        if offset < offsets.next {
            return None;
        }

        offsets.done.insert(offset);
        let start = offsets.next;
        while offsets.done.remove(&offsets.next) {
            offsets.next += 1;
        }
        (offsets.next > start).then_some(offsets.next)
    }

    pub fn watermark(&self, partition: i32) -> Option<i64> {
        self.partitions.get(&partition).map(|p| p.next)
    }
}
