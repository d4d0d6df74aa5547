use std::sync::Arc;

use common::RankJob;
use common::mq::MessageError;
use mq::{BroccoliError, BrokerMessage, Mq, MqError};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::evaluation::ranking;

/// Consume rank recalculation requests from the rank queue.
pub async fn consume_rank_jobs(db: DatabaseConnection, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting rank consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // one at a time so a challenge is never ranked twice concurrently
            None,
            move |message: BrokerMessage<RankJob>| {
                let db = db.clone();
                async move {
                    let job = message.payload;
                    let job_id = job.job_id.clone();
                    let challenge_id = job.challenge_id;

                    if let Err(e) = process_rank_job(&db, job).await {
                        error!(
                            challenge_id,
                            job_id = %job_id,
                            error = %e,
                            "Failed to recalculate ranks"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Rank consumer stopped unexpectedly");
    }
}

/// Recalculate the leaderboard named by `job`.
///
/// Unknown challenges are acknowledged with a warning; a deleted challenge
/// has nothing left to rank.
pub async fn process_rank_job(db: &DatabaseConnection, job: RankJob) -> anyhow::Result<()> {
    if job.challenge_id <= 0 {
        return Err(MqError::from(MessageError::InvalidPayload(format!(
            "challenge_id must be positive, got {}",
            job.challenge_id
        )))
        .into());
    }

    match ranking::recalculate(db, job.challenge_id).await? {
        Some(changed) => info!(
            challenge_id = job.challenge_id,
            job_id = %job.job_id,
            changed,
            "Processed rank job"
        ),
        None => warn!(
            challenge_id = job.challenge_id,
            job_id = %job.job_id,
            "Rank job for unknown challenge, skipping"
        ),
    }
    Ok(())
}
