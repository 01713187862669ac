//! CORS configuration.

use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

/// Create a CORS layer from the configured origins.
///
/// With no usable origin any origin is allowed.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();

    let layer = CorsLayer::new()
        .allow_methods(METHODS)
        .expose_headers([CONTENT_DISPOSITION]);

    if parsed_origins.is_empty() {
        layer.allow_headers(Any).allow_origin(Any)
    } else {
        layer
            .allow_headers([CONTENT_TYPE, ACCEPT])
            .allow_origin(parsed_origins)
    }
}
