mod v1;

use axum::Router;
use axum::routing::{get, post};

use crate::config::{AppConfig, UploadConfig};
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> Router<AppState> {
    Router::new().nest("/v1", v1::routes(config))
}

/// CKEditor upload and browse endpoints, mounted at `/editor`.
pub fn editor_routes(uploads: &UploadConfig) -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::editor::upload))
        .route("/browse", get(handlers::editor::browse))
        .route(
            "/projects/{short_name}/upload",
            post(handlers::editor::upload_to_project),
        )
        .route(
            "/projects/{short_name}/browse",
            get(handlers::editor::browse_project),
        )
        .layer(handlers::editor::editor_upload_body_limit(
            uploads.max_upload_size,
        ))
}

/// Project file server, mounted at the configured site prefix.
pub fn site_routes() -> Router<AppState> {
    Router::new().route(
        "/{short_name}/serve/{*path}",
        get(handlers::files::serve_project_file),
    )
}
