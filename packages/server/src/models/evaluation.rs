use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::{challenge_config, job, method, result, submission};
use crate::error::AppError;
use crate::evaluation::ranking::{DEFAULT_SCORE_PATH, SORT_ASCENDING, SORT_DESCENDING};
use crate::models::shared::validate_text;

/// Body of `PUT /config`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ConfigRequest {
    #[schema(example = "Dice")]
    pub score_title: String,
    /// Dot-separated path of the score inside result metrics.
    #[schema(example = "dice.mean")]
    pub score_jsonpath: String,
    /// `ascending` or `descending`.
    #[schema(example = "descending")]
    pub score_default_sort: String,
}

pub fn validate_config(payload: &ConfigRequest) -> Result<(), AppError> {
    validate_text("Score title", &payload.score_title, 64)?;
    validate_text("Score path", &payload.score_jsonpath, 255)?;
    let path = payload.score_jsonpath.as_str();
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path
        .split('.')
        .any(|key| key.is_empty() || key.trim() != key)
    {
        return Err(AppError::Validation(
            "Score path segments must be non-empty and carry no surrounding spaces".into(),
        ));
    }
    if ![SORT_ASCENDING, SORT_DESCENDING].contains(&payload.score_default_sort.as_str()) {
        return Err(AppError::Validation(
            "Sort must be 'ascending' or 'descending'".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConfigResponse {
    #[schema(example = 1)]
    pub challenge_id: i32,
    #[schema(example = "Dice")]
    pub score_title: String,
    #[schema(example = "dice.mean")]
    pub score_jsonpath: String,
    #[schema(example = "descending")]
    pub score_default_sort: String,
    /// Absent while the challenge still runs on defaults.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConfigResponse {
    /// What ranking uses for a challenge that was never configured.
    pub fn defaults(challenge_id: i32) -> Self {
        Self {
            challenge_id,
            score_title: "Score".into(),
            score_jsonpath: DEFAULT_SCORE_PATH.into(),
            score_default_sort: SORT_DESCENDING.into(),
            updated_at: None,
        }
    }
}

impl From<challenge_config::Model> for ConfigResponse {
    fn from(m: challenge_config::Model) -> Self {
        Self {
            challenge_id: m.challenge_id,
            score_title: m.score_title,
            score_jsonpath: m.score_jsonpath,
            score_default_sort: m.score_default_sort,
            updated_at: Some(m.updated_at),
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateMethodRequest {
    /// Container image of the evaluator.
    #[schema(example = "registry.example.org/lung-eval:1.2")]
    pub image: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MethodResponse {
    pub id: Uuid,
    pub challenge_id: i32,
    pub creator_id: i32,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl From<method::Model> for MethodResponse {
    fn from(m: method::Model) -> Self {
        Self {
            id: m.id,
            challenge_id: m.challenge_id,
            creator_id: m.creator_id,
            image: m.image,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    /// Reference to the uploaded predictions file.
    #[schema(example = "submissions/lung-ct/predictions.zip")]
    pub file: String,
    #[serde(default)]
    pub description: String,
}

/// An administrator submits on behalf of a participant.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LegacySubmissionRequest {
    #[schema(example = "alice_wonder")]
    pub creator_username: String,
    #[schema(example = "submissions/lung-ct/predictions.zip")]
    pub file: String,
    #[serde(default)]
    pub description: String,
}

pub fn validate_submission(file: &str, description: &str) -> Result<(), AppError> {
    validate_text("File", file, 1024)?;
    if description.chars().count() > 4096 {
        return Err(AppError::Validation(
            "Description must be at most 4096 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub challenge_id: i32,
    pub creator_id: i32,
    pub file: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Job created for this submission, only reported on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl From<submission::Model> for SubmissionResponse {
    fn from(m: submission::Model) -> Self {
        Self {
            id: m.id,
            challenge_id: m.challenge_id,
            creator_id: m.creator_id,
            file: m.file,
            description: m.description,
            created_at: m.created_at,
            job_id: None,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateJobRequest {
    pub submission_id: Uuid,
    /// Defaults to the newest method of the challenge.
    #[serde(default)]
    pub method_id: Option<Uuid>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub method_id: Uuid,
    #[schema(example = "queued")]
    pub status: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
}

impl From<job::Model> for JobResponse {
    fn from(m: job::Model) -> Self {
        Self {
            id: m.id,
            submission_id: m.submission_id,
            method_id: m.method_id,
            status: m.status,
            output: m.output,
            created_at: m.created_at,
        }
    }
}

/// Reported by the evaluator when a job finishes.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateResultRequest {
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[schema(value_type = Object, example = json!({"score": 0.87}))]
    pub metrics: Value,
    #[serde(default = "default_public")]
    pub public: bool,
}

fn default_public() -> bool {
    true
}

/// Body of `PATCH /results/{pk}`; absent fields are left as they are.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateResultRequest {
    #[schema(value_type = Option<Object>)]
    pub metrics: Option<Value>,
    pub public: Option<bool>,
}

pub fn validate_metrics(metrics: &Value) -> Result<(), AppError> {
    if !metrics.is_object() {
        return Err(AppError::Validation("Metrics must be a JSON object".into()));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ResultResponse {
    pub id: Uuid,
    pub challenge_id: i32,
    pub job_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub metrics: Value,
    pub public: bool,
    /// 1-based leaderboard position, 0 when unranked.
    pub rank: i32,
    pub absolute_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<result::Model> for ResultResponse {
    fn from(m: result::Model) -> Self {
        Self {
            id: m.id,
            challenge_id: m.challenge_id,
            job_id: m.job_id,
            metrics: m.metrics,
            public: m.public,
            rank: m.rank,
            absolute_url: m.absolute_url,
            created_at: m.created_at,
        }
    }
}
