use axum::{
    Router,
    routing::{get, post},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    let router = Router::new()
        .nest("/auth", auth_routes())
        .nest("/challenges", challenge_routes());

    if config.server.debug {
        router.nest("/debug", debug_routes(config.uploads.max_upload_size))
    } else {
        router
    }
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn challenge_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::challenge::list_challenges).post(handlers::challenge::create_challenge),
        )
        .route("/{id}", get(handlers::challenge::get_challenge))
        .route(
            "/{id}/config",
            get(handlers::evaluation::get_config).put(handlers::evaluation::update_config),
        )
        .nest("/{id}/methods", method_routes())
        .nest("/{id}/submissions", submission_routes())
        .nest("/{id}/jobs", job_routes())
        .nest("/{id}/results", result_routes())
}

fn method_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::evaluation::list_methods).post(handlers::evaluation::create_method),
        )
        .route("/{pk}", get(handlers::evaluation::get_method))
}

fn submission_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::evaluation::list_submissions)
                .post(handlers::evaluation::create_submission),
        )
        .route(
            "/legacy",
            post(handlers::evaluation::create_legacy_submission),
        )
        .route("/{pk}", get(handlers::evaluation::get_submission))
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::evaluation::list_jobs).post(handlers::evaluation::create_job),
        )
        .route("/{pk}", get(handlers::evaluation::get_job))
}

fn result_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::evaluation::list_results).post(handlers::evaluation::create_result),
        )
        .route(
            "/{pk}",
            get(handlers::evaluation::get_result).patch(handlers::evaluation::update_result),
        )
}

fn debug_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/test-upload",
            post(handlers::debug::test_upload)
                .layer(handlers::editor::editor_upload_body_limit(max_upload_size)),
        )
        .route("/test-widget", get(handlers::debug::test_widget))
}
