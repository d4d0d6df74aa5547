use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Core trait for all MQ messages
pub trait Message: Serialize + DeserializeOwned + Debug + Send + Sync + Clone {
    fn message_type() -> &'static str
    where
        Self: Sized;

    fn message_id(&self) -> &str;
}

/// Errors raised while handling a message payload, independent of the broker.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}
