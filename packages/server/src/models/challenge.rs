use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::challenge;
use crate::error::AppError;
use crate::models::shared::validate_title;
use crate::utils::filename::is_safe_path_segment;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateChallengeRequest {
    /// URL and folder name of the challenge (1-64 chars).
    #[schema(example = "lung-ct")]
    pub short_name: String,
    #[schema(example = "Lung CT nodule detection")]
    pub title: String,
}

pub fn validate_create_challenge(payload: &CreateChallengeRequest) -> Result<(), AppError> {
    let short_name = payload.short_name.trim();
    if short_name.is_empty() || short_name.len() > 64 || !is_safe_path_segment(short_name) {
        return Err(AppError::Validation(
            "Short name must be 1-64 letters, digits, '_' or '-'".into(),
        ));
    }
    validate_title(&payload.title)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "lung-ct")]
    pub short_name: String,
    #[schema(example = "Lung CT nodule detection")]
    pub title: String,
    #[schema(example = 42)]
    pub creator_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<challenge::Model> for ChallengeResponse {
    fn from(m: challenge::Model) -> Self {
        Self {
            id: m.id,
            short_name: m.short_name,
            title: m.title,
            creator_id: m.creator_id,
            created_at: m.created_at,
        }
    }
}
