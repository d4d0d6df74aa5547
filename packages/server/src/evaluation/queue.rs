use std::sync::Arc;

use async_trait::async_trait;
use common::RankJob;
use mq::{Mq, MqError};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to publish rank job: {0}")]
    Publish(#[from] MqError),
}

/// Hands work to the background task runner.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Ask for the leaderboard of `challenge_id` to be recomputed.
    async fn enqueue_rank(&self, challenge_id: i32) -> Result<(), QueueError>;
}

/// Publishes [`RankJob`] messages on the broccoli queue.
pub struct MqTaskQueue {
    mq: Arc<Mq>,
    queue_name: String,
}

impl MqTaskQueue {
    pub fn new(mq: Arc<Mq>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl TaskQueue for MqTaskQueue {
    async fn enqueue_rank(&self, challenge_id: i32) -> Result<(), QueueError> {
        let job = RankJob::new(challenge_id);
        mq::publish(&self.mq, &self.queue_name, &job).await?;
        Ok(())
    }
}

/// Used when `mq.enabled` is false: requests are logged and dropped.
pub struct DisabledQueue;

#[async_trait]
impl TaskQueue for DisabledQueue {
    async fn enqueue_rank(&self, challenge_id: i32) -> Result<(), QueueError> {
        debug!(challenge_id, "MQ disabled, rank recalculation dropped");
        Ok(())
    }
}
