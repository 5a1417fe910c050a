//! Payment gateway client.
//!
//! Creates remote payment intents for orders. Every call carries an
//! [`IdempotencyKey`]; the gateway answers a repeated key with the intent it
//! already created instead of charging twice.

pub mod error;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod models;
pub mod webhook;

pub use error::{PaymentError, Result};
pub use gateway::{IdempotencyKey, PaymentGateway};
pub use http::{HttpPaymentGateway, HttpPaymentGatewayConfig};
pub use memory::InMemoryPaymentGateway;
pub use models::{
    Amount, ConfirmationRequest, ConfirmationResponse, CreatePaymentRequest, Metadata,
    PaymentIntent,
};
pub use webhook::{PaymentEvent, WebhookEvent, WebhookObject};
