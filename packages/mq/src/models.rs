pub use broccoli_queue::{brokers::broker::BrokerMessage, error::BroccoliError, queue::BroccoliQueue};
use common::mq::{Message, MessageError};
use tracing::debug;

use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}

/// Publish a typed message on `queue_name`.
///
/// The payload is checked to serialize before it reaches the broker so that
/// encoding problems surface as business errors rather than broker failures.
pub async fn publish<M: Message + 'static>(
    mq: &MqQueue,
    queue_name: &str,
    message: &M,
) -> Result<(), MqError> {
    serde_json::to_value(message).map_err(MessageError::from)?;

    mq.publish(queue_name, None, message, None).await?;

    debug!(
        queue = queue_name,
        message_type = M::message_type(),
        message_id = message.message_id(),
        "Message published"
    );
    Ok(())
}
