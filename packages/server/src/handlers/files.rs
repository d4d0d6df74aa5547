use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use common::storage::StorageError;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::handlers::challenge::find_challenge_by_short_name;
use crate::state::AppState;

/// Resolve `requested` (as it appears in a project file URL) to a path under
/// the project's public folder.
///
/// The trailing slash project URLs carry is dropped. Only files inside the
/// public folder are served; anything else, including `..` segments, is
/// reported as not found.
fn resolve_public_file(
    state: &AppState,
    short_name: &str,
    requested: &str,
) -> Result<PathBuf, AppError> {
    let not_found = || AppError::NotFound("File not found".into());

    let segments: Vec<&str> = requested.trim_end_matches('/').split('/').collect();
    let Some((folder, rest)) = segments.split_first() else {
        return Err(not_found());
    };
    if *folder != state.config.uploads.public_folder_name || rest.is_empty() {
        return Err(not_found());
    }
    if rest
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains(['\\', '\0']))
    {
        return Err(not_found());
    }

    let mut path = state.config.uploads.projects_root.join(short_name).join(folder);
    path.extend(rest);
    Ok(path)
}

#[utoipa::path(
    get,
    path = "/site/{short_name}/serve/{path}",
    tag = "Project Files",
    operation_id = "serveProjectFile",
    summary = "Download a file from a project's public folder",
    description = "Serves the target of URLs built for project uploads, such as \
        `/site/lung-ct/serve/public_html/figure.png/`. Public files need no authentication.",
    params(
        ("short_name" = String, Path, description = "Challenge short name"),
        ("path" = String, Path, description = "Path below the project folder, starting with the public folder"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Project or file not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(short_name, path))]
pub async fn serve_project_file(
    State(state): State<AppState>,
    Path((short_name, path)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let challenge = find_challenge_by_short_name(&state.db, &short_name).await?;
    let file_path = resolve_public_file(&state, &challenge.short_name, &path)?;

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".into()));
        }
        Err(e) => return Err(StorageError::from(e).into()),
    };
    let metadata = file.metadata().await.map_err(StorageError::from)?;
    if !metadata.is_file() {
        return Err(AppError::NotFound("File not found".into()));
    }

    let content_type = mime_guess::from_path(&file_path)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len().to_string())
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
