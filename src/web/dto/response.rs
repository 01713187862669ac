//! Response DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::file::{FileRecord, PageResult};

/// File metadata as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub id: u64,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    /// 0 = active, 1 = removed.
    pub status: i64,
    pub upload_date: DateTime<Utc>,
}

impl From<FileRecord> for FileInfoResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            file_path: record.file_path,
            file_size: record.file_size,
            status: record.status.code(),
            upload_date: record.upload_date,
        }
    }
}

/// Paginated listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    /// Matching items across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl From<PageResult<FileRecord>> for PageResponse<FileInfoResponse> {
    fn from(page: PageResult<FileRecord>) -> Self {
        Self {
            items: page.items.into_iter().map(FileInfoResponse::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

/// Upload result.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<FileInfoResponse>,
}

impl UploadResponse {
    pub fn success(records: Vec<FileRecord>) -> Self {
        Self {
            message: "upload success".to_string(),
            files: records.into_iter().map(FileInfoResponse::from).collect(),
        }
    }
}

/// Bulk delete result.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Number of files that changed to removed.
    pub deleted: u64,
}
