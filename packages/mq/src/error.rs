use common::mq::MessageError;
use thiserror::Error;

/// Failure to hand a message to, or take one from, the broker.
#[derive(Debug, Error)]
pub enum MqError {
    /// The message itself is unusable; retrying will not help.
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// Connection or protocol failure reported by the broker.
    #[error("Broker error: {0}")]
    Broker(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Broker(e.to_string())
    }
}
