//! HTTP API route definitions.

use std::path::Path;

use axum::handler::HandlerWithoutStateExt;
use axum::{routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_panic, history, index, metrics, not_found, status, AppState};

/// Create the API router.
///
/// `static_dir` is served under `/static` so the image paths in status
/// responses resolve.
pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/history", get(history))
        .route("/metrics", get(metrics))
        .nest_service(
            "/static",
            ServeDir::new(static_dir.as_ref()).not_found_service(not_found.into_service()),
        )
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
