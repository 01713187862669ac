//! File handlers for the HTTP API.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::UploadFile;
use crate::web::dto::{
    DeleteFilesRequest, DeleteResponse, FileInfoResponse, ListFilesParams, PageResponse,
    UploadResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Multipart field carrying the files of an upload.
pub const UPLOAD_FIELD: &str = "files";

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename` parameter; names that need it also get an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// POST /upload/ - Upload one or more files.
///
/// Request body: multipart/form-data with one or more `files` fields.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file content: {}", e);
            ApiError::bad_request("Failed to read file")
        })?;

        uploads.push(UploadFile::from_bytes(filename, content.to_vec()));
    }

    if uploads.is_empty() {
        return Err(ApiError::bad_request("no files provided"));
    }

    let records = state.files.upload(uploads).await?;

    Ok(Json(UploadResponse::success(records)))
}

/// GET /download/{file_name} - Download a file by its stored name.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(raw_name): Path<String>,
) -> Result<Response, ApiError> {
    // the path extractor decodes once; names sent double-encoded decode again here
    let file_name = urlencoding::decode(&raw_name)
        .map_err(|_| ApiError::bad_request("invalid file name"))?
        .into_owned();

    let content = state.files.download(&file_name).await?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file_name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}

/// GET /files/ - List active files, newest first.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFilesParams>,
) -> Result<Json<PageResponse<FileInfoResponse>>, ApiError> {
    let query = params.into_query();
    let page = state.files.list_files(&query).await?;

    Ok(Json(PageResponse::from(page)))
}

/// DELETE /files/ - Remove files by id.
pub async fn delete_files(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteFilesRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.files.delete_by_ids(&req.ids).await?;

    Ok(Json(DeleteResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_header_simple_ascii() {
        let result = content_disposition_header("document_1f2e.txt");
        assert_eq!(result, "attachment; filename=\"document_1f2e.txt\"");
    }

    #[test]
    fn test_content_disposition_header_unicode() {
        let result = content_disposition_header("报告.pdf");
        assert!(result.starts_with("attachment; filename=\""));
        assert!(result.contains("filename*=UTF-8''"));
        assert!(result.contains("%E6%8A%A5%E5%91%8A"));
    }

    #[test]
    fn test_content_disposition_header_quote_and_backslash() {
        let result = content_disposition_header("a\"b\\c.txt");
        assert!(result.contains("filename=\"a_b_c.txt\""));
        assert!(result.contains("%22"));
    }

    #[test]
    fn test_content_disposition_header_strips_control_characters() {
        let result = content_disposition_header("x\r\nX-Injected: 1.txt");
        assert!(!result.contains('\r'));
        assert!(!result.contains('\n'));
        assert!(result.starts_with("attachment; filename="));
    }
}
