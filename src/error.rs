//! Error types for filebay.

use thiserror::Error;

/// Common error type for filebay.
#[derive(Error, Debug)]
pub enum FilebayError {
    /// Metadata store error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error while writing, reading or removing a blob.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The content-store root could not be created or accessed.
    #[error("directory error: {0}")]
    Directory(String),

    /// Validation error for an uploaded file or a query.
    #[error("validation error: {0}")]
    Validation(String),

    /// Record absent, or its blob is missing on disk.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FilebayError {
    fn from(e: sqlx::Error) -> Self {
        FilebayError::Database(e.to_string())
    }
}

/// Result type alias for filebay operations.
pub type Result<T> = std::result::Result<T, FilebayError>;
