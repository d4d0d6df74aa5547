pub mod config;
pub mod consumers;
pub mod database;
pub mod entity;
pub mod error;
pub mod evaluation;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod utils;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Podium Challenge API",
        version = "1.0.0",
        description = "Evaluation records, leaderboards and editor uploads for challenge sites"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::challenge::create_challenge,
        handlers::challenge::list_challenges,
        handlers::challenge::get_challenge,
        handlers::evaluation::get_config,
        handlers::evaluation::update_config,
        handlers::evaluation::list_methods,
        handlers::evaluation::create_method,
        handlers::evaluation::get_method,
        handlers::evaluation::list_submissions,
        handlers::evaluation::create_submission,
        handlers::evaluation::create_legacy_submission,
        handlers::evaluation::get_submission,
        handlers::evaluation::list_jobs,
        handlers::evaluation::create_job,
        handlers::evaluation::get_job,
        handlers::evaluation::list_results,
        handlers::evaluation::create_result,
        handlers::evaluation::get_result,
        handlers::evaluation::update_result,
        handlers::editor::upload,
        handlers::editor::upload_to_project,
        handlers::editor::browse,
        handlers::editor::browse_project,
        handlers::files::serve_project_file,
        handlers::debug::test_upload,
        handlers::debug::test_widget,
    ),
    components(schemas(error::ErrorBody)),
    tags(
        (name = "Auth", description = "Authentication and user management"),
        (name = "Challenges", description = "Challenge CRUD operations"),
        (name = "Evaluation", description = "Methods, submissions, jobs, results and ranking config"),
        (name = "Editor", description = "CKEditor upload and image browser endpoints"),
        (name = "Project Files", description = "Files in a challenge's public folder"),
        (name = "Debug", description = "Upload pipeline test endpoints (debug mode only)"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(config.max_age))
}

/// Mount point for a configured URL prefix, or `None` when the prefix is not
/// a local path below `/`.
fn mount_point(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim_end_matches('/');
    (trimmed.starts_with('/') && trimmed.len() > 1).then(|| trimmed.to_string())
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let config = &state.config;

    let mut router = axum::Router::new()
        .nest("/api", routes::api_routes(config))
        .nest("/editor", routes::editor_routes(&config.uploads));

    match mount_point(&config.uploads.site_prefix) {
        Some(prefix) => router = router.nest(&prefix, routes::site_routes()),
        None => warn!(prefix = %config.uploads.site_prefix, "Site prefix is not a local path, project file server disabled"),
    }

    match mount_point(&config.uploads.media_url) {
        Some(prefix) => {
            router = router.nest_service(&prefix, ServeDir::new(&config.uploads.media_root))
        }
        None => warn!(media_url = %config.uploads.media_url, "Media URL is not a local path, media files are not served"),
    }

    let cors = cors_layer(&config.server.cors);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
}
