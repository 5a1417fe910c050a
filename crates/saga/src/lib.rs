//! Order saga.
//!
//! [`OrderOrchestrator`] drives an order through inventory reservation,
//! persistence and payment-intent creation, and compensates (releases stock,
//! cancels the order) when a later step fails. [`WebhookReceiver`] turns
//! payment-gateway events into confirm/cancel transitions.
//!
//! ```text
//! Pending --confirm--> Created --delivering--> Delivering --delivered--> Delivered
//! Pending --cancel---> Canceled
//! Created --cancel---> Canceled
//! ```

pub mod caller;
pub mod error;
pub mod orchestrator;
pub mod webhook;

pub use caller::Caller;
pub use error::{OrderingError, Result};
pub use orchestrator::{OrchestratorConfig, OrderOrchestrator, PlacedOrder};
pub use webhook::{WebhookOutcome, WebhookReceiver};
