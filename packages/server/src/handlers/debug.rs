//! Manual test endpoints for the upload pipeline, registered only when
//! `server.debug` is enabled.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::editor::{make_thumbnail, store_named_field};
use crate::models::editor::TestUploadResponse;
use crate::state::AppState;
use crate::utils::media::media_url;

const TEST_DIR: &str = "test";

#[utoipa::path(
    post,
    path = "/api/v1/debug/test-upload",
    tag = "Debug",
    operation_id = "testUpload",
    summary = "Store a file through the editor upload pipeline",
    description = "Saves the `file` field under `{upload_root}/test/` and reports where it ended up.",
    request_body(content_type = "multipart/form-data", description = "File in the `file` field"),
    responses(
        (status = 201, description = "File stored", body = TestUploadResponse),
        (status = 400, description = "Missing or unusable file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn test_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<TestUploadResponse>), AppError> {
    auth_user.require_permission("editor:upload")?;

    let dir = state.uploads.root().join(TEST_DIR);
    let stored = store_named_field(&state, &mut multipart, "file", &dir)
        .await?
        .ok_or_else(|| AppError::Validation("Missing or unusable 'file' field".into()))?;
    let thumbnail = make_thumbnail(&stored.path)
        .await?
        .map(|thumb| media_url(&thumb, &state.config.uploads));

    Ok((
        StatusCode::CREATED,
        Json(TestUploadResponse {
            url: media_url(&stored.path, &state.config.uploads),
            filename: stored.file_name,
            size: stored.size,
            thumbnail,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/debug/test-widget",
    tag = "Debug",
    operation_id = "testWidget",
    summary = "Form for trying the test upload endpoint from a browser",
    responses((status = 200, description = "HTML form", content_type = "text/html")),
)]
pub async fn test_widget() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Upload test</title></head>
<body>
  <form id="upload" enctype="multipart/form-data">
    <p><label>Token <input type="text" name="token" size="60"></label></p>
    <p><input type="file" name="file"></p>
    <p><button type="submit">Upload</button></p>
  </form>
  <pre id="out"></pre>
  <script type="text/javascript">
    document.getElementById('upload').addEventListener('submit', function (event) {
      event.preventDefault();
      var form = event.target;
      var data = new FormData();
      data.append('file', form.file.files[0]);
      fetch('/api/v1/debug/test-upload', {
        method: 'POST',
        headers: { 'Authorization': 'Bearer ' + form.token.value },
        body: data
      })
        .then(function (res) { return res.text(); })
        .then(function (text) { document.getElementById('out').textContent = text; });
    });
  </script>
</body>
</html>
"#,
    )
}
