//! Side effects of saving evaluation records.
//!
//! [`EvaluationService`](super::service::EvaluationService) calls into the
//! dispatcher after each write, passing the saved row and whether it was
//! created or updated. Database follow-ups (job creation, the cached URL)
//! propagate their errors; queue and mail failures are logged and dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::queue::TaskQueue;
use super::ranking::{RankSettings, score_at};
use super::service::SaveOutcome;
use crate::entity::{challenge, challenge_config, job, method, result, submission, user};
use crate::notify::{Mailer, OutgoingEmail};

/// Detail URL of a result, as cached in `result.absolute_url`.
pub fn result_absolute_url(challenge_id: i32, result_id: Uuid) -> String {
    format!("/api/v1/challenges/{challenge_id}/results/{result_id}")
}

pub struct SignalDispatcher {
    queue: Arc<dyn TaskQueue>,
    mailer: Arc<dyn Mailer>,
}

impl SignalDispatcher {
    pub fn new(queue: Arc<dyn TaskQueue>, mailer: Arc<dyn Mailer>) -> Self {
        Self { queue, mailer }
    }

    /// A new submission is paired with the newest method of its challenge.
    ///
    /// Returns the created job, or `None` on update or when the challenge has
    /// no method yet.
    #[instrument(skip(self, db, saved), fields(submission_id = %saved.id, challenge_id = saved.challenge_id))]
    pub async fn submission_saved<C: ConnectionTrait>(
        &self,
        db: &C,
        saved: &submission::Model,
        outcome: SaveOutcome,
    ) -> Result<Option<job::Model>, DbErr> {
        if outcome != SaveOutcome::Created {
            return Ok(None);
        }

        let newest = method::Entity::find()
            .filter(method::Column::ChallengeId.eq(saved.challenge_id))
            .order_by_desc(method::Column::CreatedAt)
            .order_by_desc(method::Column::Id)
            .one(db)
            .await?;

        let Some(method) = newest else {
            warn!("Challenge has no evaluation method, submission left without a job");
            return Ok(None);
        };

        let job = job::ActiveModel {
            id: Set(Uuid::now_v7()),
            submission_id: Set(saved.id),
            method_id: Set(method.id),
            status: Set(job::STATUS_QUEUED.to_string()),
            output: Set(String::new()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(job_id = %job.id, method_id = %method.id, "Evaluation job created");
        Ok(Some(job))
    }

    /// Refreshes the cached URL, requests a rank recalculation, and mails a
    /// notification when the result is new. Returns the cached URL.
    #[instrument(skip(self, db, saved), fields(result_id = %saved.id, challenge_id = saved.challenge_id))]
    pub async fn result_saved<C: ConnectionTrait>(
        &self,
        db: &C,
        saved: &result::Model,
        outcome: SaveOutcome,
    ) -> Result<String, DbErr> {
        let url = self.cache_absolute_url(db, saved).await?;

        self.request_ranking(saved.challenge_id).await;

        if outcome == SaveOutcome::Created {
            self.notify_new_result(db, saved, &url).await;
        }

        Ok(url)
    }

    #[instrument(skip(self, saved), fields(challenge_id = saved.challenge_id))]
    pub async fn config_saved(&self, saved: &challenge_config::Model, outcome: SaveOutcome) {
        info!(?outcome, "Evaluation config saved");
        self.request_ranking(saved.challenge_id).await;
    }

    /// Direct column update, so the write does not come back through here.
    async fn cache_absolute_url<C: ConnectionTrait>(
        &self,
        db: &C,
        saved: &result::Model,
    ) -> Result<String, DbErr> {
        let url = result_absolute_url(saved.challenge_id, saved.id);
        result::Entity::update_many()
            .col_expr(result::Column::AbsoluteUrl, Expr::value(url.clone()))
            .filter(result::Column::Id.eq(saved.id))
            .exec(db)
            .await?;
        Ok(url)
    }

    async fn request_ranking(&self, challenge_id: i32) {
        if let Err(e) = self.queue.enqueue_rank(challenge_id).await {
            warn!(challenge_id, error = %e, "Failed to enqueue rank recalculation");
        }
    }

    async fn notify_new_result<C: ConnectionTrait>(
        &self,
        db: &C,
        saved: &result::Model,
        url: &str,
    ) {
        let emails = match new_result_emails(db, saved, url).await {
            Ok(emails) => emails,
            Err(e) => {
                warn!(error = %e, "Could not prepare new result email");
                return;
            }
        };

        for email in &emails {
            if let Err(e) = self.mailer.send(email).await {
                warn!(to = %email.to, error = %e, "Failed to send new result email");
            }
        }
    }
}

/// One message per distinct recipient: the challenge creator and, for
/// results coming from a job, the creator of the evaluated submission.
async fn new_result_emails<C: ConnectionTrait>(
    db: &C,
    saved: &result::Model,
    url: &str,
) -> Result<Vec<OutgoingEmail>, DbErr> {
    let Some(challenge) = challenge::Entity::find_by_id(saved.challenge_id).one(db).await? else {
        return Ok(Vec::new());
    };

    let mut recipient_ids = BTreeSet::from([challenge.creator_id]);
    if let Some(job_id) = saved.job_id
        && let Some(job) = job::Entity::find_by_id(job_id).one(db).await?
        && let Some(submission) = submission::Entity::find_by_id(job.submission_id)
            .one(db)
            .await?
    {
        recipient_ids.insert(submission.creator_id);
    }

    let recipients = user::Entity::find()
        .filter(user::Column::Id.is_in(recipient_ids))
        .all(db)
        .await?;

    let settings = challenge_config::Entity::find()
        .filter(challenge_config::Column::ChallengeId.eq(saved.challenge_id))
        .one(db)
        .await?
        .map(|config| RankSettings::from(&config))
        .unwrap_or_default();

    let subject = format!("[{}] New result", challenge.short_name);
    let mut body = format!("A new result has been added to {}.\n\n", challenge.title);
    if let Some(score) = score_at(&saved.metrics, &settings.score_path) {
        body.push_str(&format!("Score ({}): {score}\n", settings.score_path));
    }
    body.push_str(&format!("Details: {url}\n"));

    Ok(recipients
        .into_iter()
        .filter(|u| !u.email.trim().is_empty())
        .map(|u| OutgoingEmail {
            to: u.email,
            subject: subject.clone(),
            body: body.clone(),
        })
        .collect())
}
