//! Notification dispatch for confirmed orders.
//!
//! The producer side publishes the serialized order to a durable topic keyed
//! by order id. The consumer side runs a fixed pool of workers behind a
//! bounded queue and acknowledges a message only after its handler succeeded.

pub mod error;
pub mod handler;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod notifier;
pub mod publisher;
pub mod topic;
pub mod worker;

pub use error::{NotificationError, Result};
pub use handler::OrderEmailHandler;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaConfig, KafkaSubscription, KafkaTopic};
pub use memory::{InMemorySubscription, InMemoryTopic};
pub use notifier::{HttpNotifier, InMemoryNotifier, Notification, Notifier, TracingNotifier};
pub use publisher::{OrderPublisher, PublisherConfig, TopicPublisher};
pub use topic::{Message, MessageHandler, OffsetTracker, Subscription, Topic};
pub use worker::{DrainReport, WorkerPool, WorkerPoolConfig};
