use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::challenge;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::challenge::{ChallengeResponse, CreateChallengeRequest, validate_create_challenge};
use crate::models::shared::ListResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/challenges",
    tag = "Challenges",
    operation_id = "createChallenge",
    summary = "Create a challenge",
    description = "Requires `challenge:create`. The short name is used in project URLs and as the \
        name of the challenge's folder on disk.",
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge created", body = ChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Short name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(short_name = %payload.short_name))]
pub async fn create_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("challenge:create")?;
    validate_create_challenge(&payload)?;

    let model = challenge::ActiveModel {
        short_name: Set(payload.short_name.trim().to_string()),
        title: Set(payload.title.trim().to_string()),
        creator_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Short name is already taken".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(ChallengeResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges",
    tag = "Challenges",
    operation_id = "listChallenges",
    summary = "List challenges",
    responses(
        (status = 200, description = "All challenges, newest first", body = ListResponse<ChallengeResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_challenges(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<ChallengeResponse>>, AppError> {
    let challenges = challenge::Entity::find()
        .order_by_desc(challenge::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ListResponse::new(
        challenges.into_iter().map(ChallengeResponse::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}",
    tag = "Challenges",
    operation_id = "getChallenge",
    summary = "Get a challenge",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Challenge", body = ChallengeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(challenge_id = id))]
pub async fn get_challenge(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ChallengeResponse>, AppError> {
    Ok(Json(find_challenge(&state.db, id).await?.into()))
}

pub async fn find_challenge<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<challenge::Model, AppError> {
    challenge::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
}

pub async fn find_challenge_by_short_name<C: ConnectionTrait>(
    db: &C,
    short_name: &str,
) -> Result<challenge::Model, AppError> {
    challenge::Entity::find()
        .filter(challenge::Column::ShortName.eq(short_name))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}
