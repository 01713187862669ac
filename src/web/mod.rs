//! HTTP API for filebay.
//!
//! Thin axum layer over [`crate::file::FileService`]: multipart upload,
//! download by stored name, paginated listing and bulk delete.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
