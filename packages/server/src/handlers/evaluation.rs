use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::{challenge_config, job, method, result, submission, user};
use crate::error::{AppError, ErrorBody};
use crate::evaluation::SaveOutcome;
use crate::evaluation::service::{
    ConfigValues, EvaluationService, NewMethod, NewResult, NewSubmission, ResultChanges,
};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::challenge::find_challenge;
use crate::models::evaluation::*;
use crate::models::shared::{ListResponse, validate_text};
use crate::state::AppState;

const MANAGE: &str = "challenge:manage";

fn service(state: &AppState) -> EvaluationService<'_> {
    EvaluationService::new(&state.db, &state.signals)
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/config",
    tag = "Evaluation",
    operation_id = "getEvaluationConfig",
    summary = "Get the ranking config of a challenge",
    description = "Returns the stored config, or the defaults used for ranking when none was saved.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Config", body = ConfigResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(challenge_id))]
pub async fn get_config(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
) -> Result<Json<ConfigResponse>, AppError> {
    find_challenge(&state.db, challenge_id).await?;

    let config = challenge_config::Entity::find()
        .filter(challenge_config::Column::ChallengeId.eq(challenge_id))
        .one(&state.db)
        .await?;

    Ok(Json(match config {
        Some(model) => model.into(),
        None => ConfigResponse::defaults(challenge_id),
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/challenges/{id}/config",
    tag = "Evaluation",
    operation_id = "updateEvaluationConfig",
    summary = "Create or replace the ranking config",
    description = "Requires `challenge:manage`. Every save requests a rank recalculation.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Config updated", body = ConfigResponse),
        (status = 201, description = "Config created", body = ConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id))]
pub async fn update_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<ConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(MANAGE)?;
    validate_config(&payload)?;
    find_challenge(&state.db, challenge_id).await?;

    let (saved, outcome) = service(&state)
        .save_config(
            challenge_id,
            ConfigValues {
                score_title: payload.score_title.trim().to_string(),
                score_jsonpath: payload.score_jsonpath.trim().to_string(),
                score_default_sort: payload.score_default_sort,
            },
        )
        .await?;

    let status = match outcome {
        SaveOutcome::Created => StatusCode::CREATED,
        SaveOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(ConfigResponse::from(saved))))
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/methods",
    tag = "Evaluation",
    operation_id = "listMethods",
    summary = "List evaluation methods, newest first",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Methods", body = ListResponse<MethodResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id))]
pub async fn list_methods(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
) -> Result<Json<ListResponse<MethodResponse>>, AppError> {
    auth_user.require_permission(MANAGE)?;
    find_challenge(&state.db, challenge_id).await?;

    let methods = method::Entity::find()
        .filter(method::Column::ChallengeId.eq(challenge_id))
        .order_by_desc(method::Column::CreatedAt)
        .order_by_desc(method::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(ListResponse::new(
        methods.into_iter().map(MethodResponse::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/challenges/{id}/methods",
    tag = "Evaluation",
    operation_id = "createMethod",
    summary = "Register an evaluation method",
    description = "Requires `challenge:manage`. The newest method evaluates new submissions.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = CreateMethodRequest,
    responses(
        (status = 201, description = "Method created", body = MethodResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id))]
pub async fn create_method(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<CreateMethodRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(MANAGE)?;
    validate_text("Image", &payload.image, 512)?;
    find_challenge(&state.db, challenge_id).await?;

    let model = service(&state)
        .create_method(NewMethod {
            challenge_id,
            creator_id: auth_user.user_id,
            image: payload.image.trim().to_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(MethodResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/methods/{pk}",
    tag = "Evaluation",
    operation_id = "getMethod",
    summary = "Get an evaluation method",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("pk" = Uuid, Path, description = "Method ID"),
    ),
    responses(
        (status = 200, description = "Method", body = MethodResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Method not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id, method_id = %pk))]
pub async fn get_method(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((challenge_id, pk)): Path<(i32, Uuid)>,
) -> Result<Json<MethodResponse>, AppError> {
    auth_user.require_permission(MANAGE)?;

    let model = method::Entity::find_by_id(pk)
        .filter(method::Column::ChallengeId.eq(challenge_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Method not found".into()))?;

    Ok(Json(model.into()))
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/submissions",
    tag = "Evaluation",
    operation_id = "listSubmissions",
    summary = "List submissions, newest first",
    description = "Users with `challenge:manage` see every submission; others only their own.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Submissions", body = ListResponse<SubmissionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
) -> Result<Json<ListResponse<SubmissionResponse>>, AppError> {
    find_challenge(&state.db, challenge_id).await?;

    let mut select = submission::Entity::find()
        .filter(submission::Column::ChallengeId.eq(challenge_id));
    if !auth_user.has_permission(MANAGE) {
        select = select.filter(submission::Column::CreatorId.eq(auth_user.user_id));
    }

    let submissions = select
        .order_by_desc(submission::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ListResponse::new(
        submissions.into_iter().map(SubmissionResponse::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/challenges/{id}/submissions",
    tag = "Evaluation",
    operation_id = "createSubmission",
    summary = "Submit predictions",
    description = "Requires `submission:submit`. When the challenge has an evaluation method, a \
        job pairing the submission with the newest method is queued and its id returned.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("submission:submit")?;
    validate_submission(&payload.file, &payload.description)?;
    find_challenge(&state.db, challenge_id).await?;

    let response = submit(
        &state,
        NewSubmission {
            challenge_id,
            creator_id: auth_user.user_id,
            file: payload.file.trim().to_string(),
            description: payload.description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/challenges/{id}/submissions/legacy",
    tag = "Evaluation",
    operation_id = "createLegacySubmission",
    summary = "Submit on behalf of a participant",
    description = "Requires `challenge:manage`. Used to import results produced outside the platform.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = LegacySubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge or user not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id, on_behalf_of = %payload.creator_username))]
pub async fn create_legacy_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<LegacySubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(MANAGE)?;
    validate_submission(&payload.file, &payload.description)?;
    find_challenge(&state.db, challenge_id).await?;

    let creator = user::Entity::find()
        .filter(user::Column::Username.eq(payload.creator_username.trim()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let response = submit(
        &state,
        NewSubmission {
            challenge_id,
            creator_id: creator.id,
            file: payload.file.trim().to_string(),
            description: payload.description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn submit(state: &AppState, input: NewSubmission) -> Result<SubmissionResponse, AppError> {
    let (saved, job) = service(state).create_submission(input).await?;
    let mut response = SubmissionResponse::from(saved);
    response.job_id = job.map(|j| j.id);
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/submissions/{pk}",
    tag = "Evaluation",
    operation_id = "getSubmission",
    summary = "Get a submission",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("pk" = Uuid, Path, description = "Submission ID"),
    ),
    responses(
        (status = 200, description = "Submission", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id, submission_id = %pk))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((challenge_id, pk)): Path<(i32, Uuid)>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let model = submission::Entity::find_by_id(pk)
        .filter(submission::Column::ChallengeId.eq(challenge_id))
        .one(&state.db)
        .await?
        .filter(|s| s.creator_id == auth_user.user_id || auth_user.has_permission(MANAGE))
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    Ok(Json(model.into()))
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Jobs of `challenge_id`, optionally limited to submissions of one user.
fn jobs_of_challenge(challenge_id: i32, creator_id: Option<i32>) -> Select<job::Entity> {
    let mut submissions = sea_orm::sea_query::Query::select()
        .column(submission::Column::Id)
        .from(submission::Entity)
        .and_where(submission::Column::ChallengeId.eq(challenge_id))
        .to_owned();
    if let Some(creator_id) = creator_id {
        submissions.and_where(submission::Column::CreatorId.eq(creator_id));
    }
    job::Entity::find().filter(job::Column::SubmissionId.in_subquery(submissions))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/jobs",
    tag = "Evaluation",
    operation_id = "listJobs",
    summary = "List evaluation jobs, newest first",
    description = "Users with `challenge:manage` see every job; others only jobs of their own submissions.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Jobs", body = ListResponse<JobResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id))]
pub async fn list_jobs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
) -> Result<Json<ListResponse<JobResponse>>, AppError> {
    find_challenge(&state.db, challenge_id).await?;

    let creator = (!auth_user.has_permission(MANAGE)).then_some(auth_user.user_id);
    let jobs = jobs_of_challenge(challenge_id, creator)
        .order_by_desc(job::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ListResponse::new(
        jobs.into_iter().map(JobResponse::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/challenges/{id}/jobs",
    tag = "Evaluation",
    operation_id = "createJob",
    summary = "Queue an evaluation job by hand",
    description = "Requires `challenge:manage`. Re-evaluates a submission, with the newest method \
        unless `method_id` is given.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Submission or method not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id, submission_id = %payload.submission_id))]
pub async fn create_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<CreateJobRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(MANAGE)?;

    let submission = submission::Entity::find_by_id(payload.submission_id)
        .filter(submission::Column::ChallengeId.eq(challenge_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    let mut methods = method::Entity::find().filter(method::Column::ChallengeId.eq(challenge_id));
    if let Some(method_id) = payload.method_id {
        methods = methods.filter(method::Column::Id.eq(method_id));
    }
    let method = methods
        .order_by_desc(method::Column::CreatedAt)
        .order_by_desc(method::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Method not found".into()))?;

    let model = service(&state).create_job(submission.id, method.id).await?;

    Ok((StatusCode::CREATED, Json(JobResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/jobs/{pk}",
    tag = "Evaluation",
    operation_id = "getJob",
    summary = "Get an evaluation job",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("pk" = Uuid, Path, description = "Job ID"),
    ),
    responses(
        (status = 200, description = "Job", body = JobResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Job not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id, job_id = %pk))]
pub async fn get_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((challenge_id, pk)): Path<(i32, Uuid)>,
) -> Result<Json<JobResponse>, AppError> {
    let creator = (!auth_user.has_permission(MANAGE)).then_some(auth_user.user_id);
    let model = jobs_of_challenge(challenge_id, creator)
        .filter(job::Column::Id.eq(pk))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;

    Ok(Json(model.into()))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/results",
    tag = "Evaluation",
    operation_id = "listResults",
    summary = "Leaderboard of a challenge",
    description = "Ranked results first, by rank, then unranked ones. Users without \
        `challenge:manage` only see public results.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Results", body = ListResponse<ResultResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id))]
pub async fn list_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
) -> Result<Json<ListResponse<ResultResponse>>, AppError> {
    find_challenge(&state.db, challenge_id).await?;

    let mut select = result::Entity::find().filter(result::Column::ChallengeId.eq(challenge_id));
    if !auth_user.has_permission(MANAGE) {
        select = select.filter(result::Column::Public.eq(true));
    }

    let mut results = select
        .order_by_asc(result::Column::CreatedAt)
        .all(&state.db)
        .await?;
    results.sort_by_key(|r| if r.rank > 0 { r.rank } else { i32::MAX });

    Ok(Json(ListResponse::new(
        results.into_iter().map(ResultResponse::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/challenges/{id}/results",
    tag = "Evaluation",
    operation_id = "createResult",
    summary = "Report an evaluation result",
    description = "Requires `challenge:manage`. Requests a rank recalculation and notifies the \
        challenge creator and the submitter by email.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = CreateResultRequest,
    responses(
        (status = 201, description = "Result created", body = ResultResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge or job not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id))]
pub async fn create_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<CreateResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(MANAGE)?;
    validate_metrics(&payload.metrics)?;
    find_challenge(&state.db, challenge_id).await?;

    if let Some(job_id) = payload.job_id {
        jobs_of_challenge(challenge_id, None)
            .filter(job::Column::Id.eq(job_id))
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    }

    let model = service(&state)
        .create_result(NewResult {
            challenge_id,
            job_id: payload.job_id,
            metrics: payload.metrics,
            public: payload.public,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ResultResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges/{id}/results/{pk}",
    tag = "Evaluation",
    operation_id = "getResult",
    summary = "Get a result",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("pk" = Uuid, Path, description = "Result ID"),
    ),
    responses(
        (status = 200, description = "Result", body = ResultResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Result not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(challenge_id, result_id = %pk))]
pub async fn get_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((challenge_id, pk)): Path<(i32, Uuid)>,
) -> Result<Json<ResultResponse>, AppError> {
    let model = find_result(&state.db, challenge_id, pk)
        .await?
        .filter(|r| r.public || auth_user.has_permission(MANAGE))
        .ok_or_else(|| AppError::NotFound("Result not found".into()))?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/challenges/{id}/results/{pk}",
    tag = "Evaluation",
    operation_id = "updateResult",
    summary = "Update a result",
    description = "Requires `challenge:manage`. Requests a rank recalculation; no email is sent.",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("pk" = Uuid, Path, description = "Result ID"),
    ),
    request_body = UpdateResultRequest,
    responses(
        (status = 200, description = "Result updated", body = ResultResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Result not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(challenge_id, result_id = %pk))]
pub async fn update_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((challenge_id, pk)): Path<(i32, Uuid)>,
    AppJson(payload): AppJson<UpdateResultRequest>,
) -> Result<Json<ResultResponse>, AppError> {
    auth_user.require_permission(MANAGE)?;
    if let Some(metrics) = &payload.metrics {
        validate_metrics(metrics)?;
    }

    let existing = find_result(&state.db, challenge_id, pk)
        .await?
        .ok_or_else(|| AppError::NotFound("Result not found".into()))?;

    let model = service(&state)
        .update_result(
            existing,
            ResultChanges {
                metrics: payload.metrics,
                public: payload.public,
            },
        )
        .await?;

    Ok(Json(model.into()))
}

async fn find_result<C: ConnectionTrait>(
    db: &C,
    challenge_id: i32,
    id: Uuid,
) -> Result<Option<result::Model>, AppError> {
    Ok(result::Entity::find_by_id(id)
        .filter(result::Column::ChallengeId.eq(challenge_id))
        .one(db)
        .await?)
}
