//! File management module for filebay.
//!
//! This module provides the file lifecycle:
//! - Blob storage with UUID-suffixed names
//! - File metadata with soft-delete status
//! - Upload, download, paginated listing, bulk delete and expiry sweeps

mod metadata;
mod service;
mod storage;

pub use metadata::{FileRecord, FileRepository, FileStatus};
pub use service::{
    FileService, ListQuery, PageResult, SweepReport, UploadFile, UploadPolicy,
    DEFAULT_PAGE_SIZE, DEFAULT_RETENTION_DAYS, DELETE_BATCH_SIZE, MAX_PAGE_SIZE,
};
pub use storage::{client_file_name, split_extension, FileStorage};
