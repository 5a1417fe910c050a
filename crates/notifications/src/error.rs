use thiserror::Error;

/// Errors raised by publishing, consuming and delivering notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// A single publish attempt failed.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Publishing kept failing after every retry.
    #[error("Publish failed after {attempts} attempts: {message}")]
    Transient { attempts: usize, message: String },

    /// The payload could not be encoded or decoded.
    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    /// The downstream notifier refused or could not be reached.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NotificationError {
    /// A message that can never be handled. It is acknowledged so it is not
    /// redelivered forever.
    pub fn is_poison(&self) -> bool {
        matches!(self, NotificationError::Decode(_))
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotificationError>;
