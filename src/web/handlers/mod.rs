//! API handlers for the HTTP surface.

pub mod file;

pub use file::*;

use crate::file::FileService;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// File lifecycle service.
    pub files: FileService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}
