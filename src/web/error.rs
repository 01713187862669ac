//! API error handling for the filebay HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::FilebayError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Not found (404).
    NotFound,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an unprocessable entity error.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FilebayError> for ApiError {
    fn from(err: FilebayError) -> Self {
        match &err {
            FilebayError::NotFound(_) => ApiError::not_found(err.to_string()),
            FilebayError::Validation(msg) => ApiError::unprocessable(msg.clone()),
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::UnprocessableEntity.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_filebay_error() {
        let err = ApiError::from(FilebayError::NotFound("file a.txt".to_string()));
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "file a.txt not found");

        let err = ApiError::from(FilebayError::Validation("file a.txt is empty".to_string()));
        assert_eq!(err.code(), ErrorCode::UnprocessableEntity);
        assert_eq!(err.message(), "file a.txt is empty");

        let err = ApiError::from(FilebayError::Database("disk I/O error".to_string()));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.message().contains("disk"));

        let err = ApiError::from(FilebayError::Directory("denied".to_string()));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: ErrorCode::UnprocessableEntity,
                message: "bad".to_string(),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "UNPROCESSABLE_ENTITY");
        assert_eq!(json["error"]["message"], "bad");
    }
}
