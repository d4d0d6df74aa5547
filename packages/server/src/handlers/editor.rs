//! CKEditor file browser backend.
//!
//! Uploads answer with a script fragment that calls back into the editor;
//! browsing renders a small image picker page. Both come in a global flavour
//! (date-partitioned under the upload root) and a per-project flavour (the
//! challenge's public folder).

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::extract::multipart::Field;
use axum::response::Html;
use chrono::{Local, Utc};
use common::storage::{StorageError, create_thumbnail, naming::thumb_filename};
use sea_orm::{ActiveModelTrait, Set};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entity::upload;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::challenge::find_challenge_by_short_name;
use crate::models::editor::{BrowseImage, EditorQuery};
use crate::state::AppState;
use crate::utils::filename::sanitize_upload_name;
use crate::utils::html::{callback_script, escape_html};
use crate::utils::media::{media_url, project_url};

/// Message handed to the editor when nothing usable was uploaded.
pub const UPLOAD_FAILED: &str = "Uploading failed";

const UPLOAD_FIELD: &str = "upload";
const UPLOAD_PERMISSION: &str = "editor:upload";

pub fn editor_upload_body_limit(max: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max)
}

fn require_func_num(query: &EditorQuery) -> Result<u32, AppError> {
    query
        .func_num
        .ok_or_else(|| AppError::Validation("Missing CKEditorFuncNum".into()))
}

/// A file written to disk from a multipart field.
pub struct StoredFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// Stream `field` into a fresh file in `dir`, named after the client's file
/// name (with underscores appended on collision).
///
/// Returns `Ok(None)` when the field carries no usable file name. A partial
/// file is removed when the body breaks off.
async fn store_field(
    state: &AppState,
    mut field: Field<'_>,
    dir: &FsPath,
) -> Result<Option<StoredFile>, AppError> {
    let Some(raw_name) = field.file_name().map(str::to_owned) else {
        return Ok(None);
    };
    let name = match sanitize_upload_name(&raw_name) {
        Ok(name) => name.to_owned(),
        Err(e) => {
            warn!(file_name = %raw_name, reason = e.message(), "Rejected upload name");
            return Ok(None);
        }
    };

    let (path, mut file) = state.uploads.create_unique(dir, &name).await?;

    let mut size = 0u64;
    let written: Result<(), AppError> = async {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            file.write_all(&chunk).await.map_err(StorageError::from)?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(StorageError::from)?;
        Ok(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        state.uploads.remove(&path).await?;
        return Err(e);
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(name);
    Ok(Some(StoredFile {
        path,
        file_name,
        size,
    }))
}

/// Write the 75x75 thumbnail for `path`.
///
/// Files the image decoder cannot read, and files whose thumbnail path is
/// already occupied, are left without a thumbnail.
pub async fn make_thumbnail(path: &FsPath) -> Result<Option<PathBuf>, AppError> {
    let source = path.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || create_thumbnail(&source))
        .await
        .map_err(|e| AppError::Internal(format!("Thumbnail task failed: {e}")))?;

    match outcome {
        Ok(thumb) => Ok(Some(thumb)),
        Err(StorageError::Image(reason)) => {
            warn!(path = %path.display(), %reason, "Skipping thumbnail");
            Ok(None)
        }
        Err(StorageError::NameTaken(taken)) => {
            warn!(path = %path.display(), %taken, "Thumbnail path in use, skipping thumbnail");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Store the first multipart field called `name` in `dir`, skipping any
/// other fields.
///
/// `Ok(None)` means the field was absent or its file name unusable.
pub async fn store_named_field(
    state: &AppState,
    multipart: &mut Multipart,
    name: &str,
    dir: &FsPath,
) -> Result<Option<StoredFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some(name) {
            return store_field(state, field, dir).await;
        }
    }
    Ok(None)
}

fn project_dir(state: &AppState, short_name: &str) -> PathBuf {
    state
        .config
        .uploads
        .projects_root
        .join(short_name)
        .join(&state.config.uploads.public_folder_name)
}

#[utoipa::path(
    post,
    path = "/editor/upload",
    tag = "Editor",
    operation_id = "editorUpload",
    summary = "Upload an image from the editor",
    description = "Stores the `upload` field under `{upload_root}/[{username}/]YYYY/MM/DD/`, writes a \
        75x75 thumbnail next to it and answers with a script calling \
        `CKEDITOR.tools.callFunction(CKEditorFuncNum, url)`. The token may be passed as \
        `access_token` in the query string.",
    params(EditorQuery),
    request_body(content_type = "multipart/form-data", description = "File in the `upload` field"),
    responses(
        (status = 200, description = "Callback script with the file URL or 'Uploading failed'", content_type = "text/html"),
        (status = 400, description = "Missing CKEditorFuncNum (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<EditorQuery>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    auth_user.require_permission(UPLOAD_PERMISSION)?;
    let func_num = require_func_num(&query)?;

    let user_dir = state
        .config
        .uploads
        .restrict_by_user
        .then_some(auth_user.username.as_str());
    let dir = state
        .uploads
        .dated_dir(user_dir, Local::now().date_naive());

    let Some(stored) = store_named_field(&state, &mut multipart, UPLOAD_FIELD, &dir).await?
    else {
        return Ok(Html(callback_script(func_num, UPLOAD_FAILED)));
    };

    make_thumbnail(&stored.path).await?;

    let url = media_url(&stored.path, &state.config.uploads);
    info!(path = %stored.path.display(), size = stored.size, "Editor upload stored");
    Ok(Html(callback_script(func_num, &url)))
}

#[utoipa::path(
    post,
    path = "/editor/projects/{short_name}/upload",
    tag = "Editor",
    operation_id = "editorProjectUpload",
    summary = "Upload a file into a project's public folder",
    description = "Stores the `upload` field in `{projects_root}/{short_name}/{public_folder_name}/`, \
        records it as an upload readable by everyone and calls back with the project file URL.",
    params(
        ("short_name" = String, Path, description = "Challenge short name"),
        EditorQuery,
    ),
    request_body(content_type = "multipart/form-data", description = "File in the `upload` field"),
    responses(
        (status = 200, description = "Callback script with the file URL or 'Uploading failed'", content_type = "text/html"),
        (status = 400, description = "Missing CKEditorFuncNum (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query, multipart), fields(user_id = auth_user.user_id, short_name))]
pub async fn upload_to_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(short_name): Path<String>,
    Query(query): Query<EditorQuery>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    auth_user.require_permission(UPLOAD_PERMISSION)?;
    let func_num = require_func_num(&query)?;
    let challenge = find_challenge_by_short_name(&state.db, &short_name).await?;

    let dir = project_dir(&state, &challenge.short_name);
    let Some(stored) = store_named_field(&state, &mut multipart, UPLOAD_FIELD, &dir).await?
    else {
        return Ok(Html(callback_script(func_num, UPLOAD_FAILED)));
    };

    let content_type = mime_guess::from_path(&stored.file_name)
        .first()
        .map(|m| m.to_string());

    let record = upload::ActiveModel {
        id: Set(Uuid::now_v7()),
        challenge_id: Set(challenge.id),
        user_id: Set(auth_user.user_id),
        title: Set(stored.file_name.clone()),
        permission_lvl: Set(upload::PERMISSION_ALL.to_string()),
        content_type: Set(content_type),
        size: Set(stored.size as i64),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await;

    if let Err(e) = record {
        state.uploads.remove(&stored.path).await?;
        return Err(e.into());
    }

    let url = project_url(&state.config.uploads, &challenge.short_name, &stored.file_name);
    info!(path = %stored.path.display(), size = stored.size, "Project upload stored");
    Ok(Html(callback_script(func_num, &url)))
}

#[utoipa::path(
    get,
    path = "/editor/browse",
    tag = "Editor",
    operation_id = "editorBrowse",
    summary = "Image picker over the global uploads",
    description = "Lists every file under the upload root, recursively, skipping thumbnails. With \
        `restrict_by_user` only the caller's folder is listed, except for administrators.",
    params(EditorQuery),
    responses(
        (status = 200, description = "Image picker page", content_type = "text/html"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn browse(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<EditorQuery>,
) -> Result<Html<String>, AppError> {
    auth_user.require_permission(UPLOAD_PERMISSION)?;

    let images = browse_images(&state, &auth_user).await?;
    Ok(Html(render_browse_page(query.func_num, &images)))
}

/// Entries of the global image picker as seen by `auth_user`.
pub async fn browse_images(
    state: &AppState,
    auth_user: &AuthUser,
) -> Result<Vec<BrowseImage>, AppError> {
    let uploads = &state.config.uploads;
    let dir = if uploads.restrict_by_user && !auth_user.is_admin() {
        state.uploads.root().join(&auth_user.username)
    } else {
        state.uploads.root().to_path_buf()
    };

    let files = state.uploads.list_images(&dir, true).await?;

    let mut images = Vec::with_capacity(files.len());
    for path in files {
        let src = media_url(&path, uploads);
        let thumb_path = thumb_filename(&path);
        let thumb = if tokio::fs::try_exists(&thumb_path)
            .await
            .map_err(StorageError::from)?
        {
            media_url(&thumb_path, uploads)
        } else {
            src.clone()
        };
        images.push(BrowseImage { thumb, src });
    }
    Ok(images)
}

#[utoipa::path(
    get,
    path = "/editor/projects/{short_name}/browse",
    tag = "Editor",
    operation_id = "editorProjectBrowse",
    summary = "Image picker over a project's public folder",
    description = "Lists the files directly inside the project's public folder, skipping thumbnails.",
    params(
        ("short_name" = String, Path, description = "Challenge short name"),
        EditorQuery,
    ),
    responses(
        (status = 200, description = "Image picker page", content_type = "text/html"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id, short_name))]
pub async fn browse_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(short_name): Path<String>,
    Query(query): Query<EditorQuery>,
) -> Result<Html<String>, AppError> {
    auth_user.require_permission(UPLOAD_PERMISSION)?;
    let challenge = find_challenge_by_short_name(&state.db, &short_name).await?;

    let dir = project_dir(&state, &challenge.short_name);
    let images = state
        .uploads
        .list_images(&dir, false)
        .await?
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            let url = project_url(&state.config.uploads, &challenge.short_name, &name);
            Some(BrowseImage {
                thumb: url.clone(),
                src: url,
            })
        })
        .collect::<Vec<_>>();

    Ok(Html(render_browse_page(query.func_num, &images)))
}

/// Picker page: clicking an image hands its URL to the opening editor and
/// closes the popup.
fn render_browse_page(func_num: Option<u32>, images: &[BrowseImage]) -> String {
    let mut items = String::new();
    for image in images {
        items.push_str(&format!(
            "    <li><a href=\"{src}\" data-src=\"{src}\"><img src=\"{thumb}\" alt=\"\" width=\"75\" height=\"75\"></a></li>\n",
            src = escape_html(&image.src),
            thumb = escape_html(&image.thumb),
        ));
    }
    let body = if images.is_empty() {
        "  <p class=\"empty\">No images uploaded yet.</p>\n".to_string()
    } else {
        format!("  <ul class=\"images\">\n{items}  </ul>\n")
    };
    let func_num = func_num.map_or_else(|| "null".to_string(), |n| n.to_string());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Select an image</title>
  <style>
    ul.images {{ list-style: none; margin: 0; padding: 0; }}
    ul.images li {{ display: inline-block; margin: 4px; }}
    ul.images img {{ border: 1px solid #ccc; object-fit: cover; }}
  </style>
</head>
<body>
{body}  <script type="text/javascript">
    var funcNum = {func_num};
    document.querySelectorAll('a[data-src]').forEach(function (link) {{
      link.addEventListener('click', function (event) {{
        if (funcNum === null || !window.opener) {{ return; }}
        event.preventDefault();
        window.opener.CKEDITOR.tools.callFunction(funcNum, link.getAttribute('data-src'));
        window.close();
      }});
    }});
  </script>
</body>
</html>
"#
    )
}
