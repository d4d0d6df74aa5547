use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mq::Message;

/// Request to recalculate every ranking of a challenge.
///
/// Published on each save of a result or a challenge config. Processing is
/// idempotent, so duplicates are harmless and never coalesced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankJob {
    /// Job identifier (UUID)
    pub job_id: String,
    /// Challenge whose results are re-ranked
    pub challenge_id: i32,
    pub requested_at: DateTime<Utc>,
}

impl RankJob {
    pub fn new(challenge_id: i32) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            challenge_id,
            requested_at: Utc::now(),
        }
    }
}

impl Message for RankJob {
    fn message_type() -> &'static str {
        "rank_job"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
