//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{delete_files, download_file, list_files, upload_files, AppState};
use super::middleware::create_cors_layer;

/// Create the file API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String], body_limit: usize) -> Router {
    Router::new()
        .route("/upload/", post(upload_files))
        .route("/download/:file_name", get(download_file))
        .route("/files/", get(list_files).delete(delete_files))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the front end router.
///
/// Serves `static_path` under `/static` and redirects `/` to its index page.
/// Returns `None` if the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    if !Path::new(static_path).is_dir() {
        tracing::warn!("Static directory {} not found, front end disabled", static_path);
        return None;
    }

    Some(
        Router::new()
            .route("/", get(index_redirect))
            .nest_service("/static", ServeDir::new(static_path)),
    )
}

async fn index_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/static/index.html")])
}
