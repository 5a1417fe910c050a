use std::time::Duration;

use thiserror::Error;

/// Errors raised while creating a payment intent.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway could not be reached or answered with a server error.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Payment gateway timed out after {0:?}")]
    Timeout(Duration),

    /// The gateway refused the request (4xx).
    #[error("Payment rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The gateway answered with a body that is not a payment intent.
    #[error("Malformed gateway response: {0}")]
    Decode(String),

    #[error("Payment client misconfigured: {0}")]
    Config(String),
}

impl PaymentError {
    /// Returns true if the gateway may have created the intent anyway: the
    /// request timed out or its answer could not be read.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, PaymentError::Timeout(_) | PaymentError::Decode(_))
    }
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
