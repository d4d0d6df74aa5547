use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde_json::Value;
use uuid::Uuid;

use super::signals::SignalDispatcher;
use crate::entity::{challenge_config, job, method, result, submission};

/// Whether a write inserted a new row or changed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

pub struct NewSubmission {
    pub challenge_id: i32,
    pub creator_id: i32,
    pub file: String,
    pub description: String,
}

pub struct NewMethod {
    pub challenge_id: i32,
    pub creator_id: i32,
    pub image: String,
}

pub struct ConfigValues {
    pub score_title: String,
    pub score_jsonpath: String,
    pub score_default_sort: String,
}

pub struct NewResult {
    pub challenge_id: i32,
    pub job_id: Option<Uuid>,
    pub metrics: Value,
    pub public: bool,
}

#[derive(Default)]
pub struct ResultChanges {
    pub metrics: Option<Value>,
    pub public: Option<bool>,
}

/// Writes evaluation records and runs the save dispatcher after each write.
///
/// Rows written elsewhere (rank updates, the cached URL) bypass this service
/// on purpose and do not trigger the dispatcher.
pub struct EvaluationService<'a> {
    db: &'a DatabaseConnection,
    signals: &'a SignalDispatcher,
}

impl<'a> EvaluationService<'a> {
    pub fn new(db: &'a DatabaseConnection, signals: &'a SignalDispatcher) -> Self {
        Self { db, signals }
    }

    /// Insert a submission; the dispatcher may add a job for it.
    pub async fn create_submission(
        &self,
        input: NewSubmission,
    ) -> Result<(submission::Model, Option<job::Model>), DbErr> {
        let saved = submission::ActiveModel {
            id: Set(Uuid::now_v7()),
            challenge_id: Set(input.challenge_id),
            creator_id: Set(input.creator_id),
            file: Set(input.file),
            description: Set(input.description),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let job = self
            .signals
            .submission_saved(self.db, &saved, SaveOutcome::Created)
            .await?;
        Ok((saved, job))
    }

    pub async fn create_method(&self, input: NewMethod) -> Result<method::Model, DbErr> {
        method::ActiveModel {
            id: Set(Uuid::now_v7()),
            challenge_id: Set(input.challenge_id),
            creator_id: Set(input.creator_id),
            image: Set(input.image),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    /// Manually queue a job for an existing submission and method.
    pub async fn create_job(&self, submission_id: Uuid, method_id: Uuid) -> Result<job::Model, DbErr> {
        job::ActiveModel {
            id: Set(Uuid::now_v7()),
            submission_id: Set(submission_id),
            method_id: Set(method_id),
            status: Set(job::STATUS_QUEUED.to_string()),
            output: Set(String::new()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    /// Create the challenge's config or overwrite the existing one.
    pub async fn save_config(
        &self,
        challenge_id: i32,
        values: ConfigValues,
    ) -> Result<(challenge_config::Model, SaveOutcome), DbErr> {
        let existing = challenge_config::Entity::find()
            .filter(challenge_config::Column::ChallengeId.eq(challenge_id))
            .one(self.db)
            .await?;

        let (saved, outcome) = match existing {
            Some(model) => {
                let mut active: challenge_config::ActiveModel = model.into();
                active.score_title = Set(values.score_title);
                active.score_jsonpath = Set(values.score_jsonpath);
                active.score_default_sort = Set(values.score_default_sort);
                active.updated_at = Set(Utc::now());
                (active.update(self.db).await?, SaveOutcome::Updated)
            }
            None => {
                let model = challenge_config::ActiveModel {
                    challenge_id: Set(challenge_id),
                    score_title: Set(values.score_title),
                    score_jsonpath: Set(values.score_jsonpath),
                    score_default_sort: Set(values.score_default_sort),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(self.db)
                .await?;
                (model, SaveOutcome::Created)
            }
        };

        self.signals.config_saved(&saved, outcome).await;
        Ok((saved, outcome))
    }

    pub async fn create_result(&self, input: NewResult) -> Result<result::Model, DbErr> {
        let mut saved = result::ActiveModel {
            id: Set(Uuid::now_v7()),
            challenge_id: Set(input.challenge_id),
            job_id: Set(input.job_id),
            metrics: Set(input.metrics),
            public: Set(input.public),
            rank: Set(0),
            absolute_url: Set(String::new()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        saved.absolute_url = self
            .signals
            .result_saved(self.db, &saved, SaveOutcome::Created)
            .await?;
        Ok(saved)
    }

    pub async fn update_result(
        &self,
        existing: result::Model,
        changes: ResultChanges,
    ) -> Result<result::Model, DbErr> {
        let mut active: result::ActiveModel = existing.clone().into();
        if let Some(metrics) = changes.metrics {
            active.metrics = Set(metrics);
        }
        if let Some(public) = changes.public {
            active.public = Set(public);
        }

        let mut saved = if active.is_changed() {
            active.update(self.db).await?
        } else {
            existing
        };

        saved.absolute_url = self
            .signals
            .result_saved(self.db, &saved, SaveOutcome::Updated)
            .await?;
        Ok(saved)
    }
}
