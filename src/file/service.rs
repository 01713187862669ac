//! File lifecycle service.
//!
//! Upload validates a whole batch before writing anything, streams each blob
//! into the content store and commits all metadata rows in one transaction.
//! Download, listing, bulk delete and the expiry sweep only ever see
//! `Active` records; removal is a status flip, rows are never deleted.

use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, SubsecRound, Utc};
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

use super::metadata::{FileRecord, FileRepository, FileStatus};
use super::storage::{client_file_name, split_extension, FileStorage};
use crate::config::{parse_extension_list, FilesConfig};
use crate::db::Database;
use crate::id::IdGenerator;
use crate::{FilebayError, Result};

/// Number of ids handled per bulk delete round.
pub const DELETE_BATCH_SIZE: usize = 500;

/// Retention applied by the expiry sweep unless configured otherwise.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Page size used when the caller asks for less than one item.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One file of an upload batch.
pub struct UploadFile {
    /// Name as supplied by the client.
    pub name: String,
    /// Size the client claims, checked before any byte is read.
    pub declared_size: u64,
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl UploadFile {
    /// Create an upload from a byte stream.
    pub fn new(
        name: impl Into<String>,
        declared_size: u64,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            declared_size,
            reader: Box::new(reader),
        }
    }

    /// Create an upload from an in-memory buffer; the declared size is its length.
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let declared_size = content.len() as u64;
        Self::new(name, declared_size, Cursor::new(content))
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// Size limit and extension allow-list for uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    max_size: u64,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    /// Create a policy from a byte limit and a comma-separated extension list.
    pub fn new(max_size: u64, allowed_types: &str) -> Self {
        Self {
            max_size,
            allowed_extensions: parse_extension_list(allowed_types),
        }
    }

    /// Build the policy from the `[files]` configuration section.
    pub fn from_config(config: &FilesConfig) -> Self {
        Self {
            max_size: config.max_size,
            allowed_extensions: config.allowed_extensions(),
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Check one file against the policy using its declared size.
    pub fn validate(&self, name: &str, declared_size: u64) -> Result<()> {
        if name.is_empty() {
            return Err(FilebayError::Validation("file name is empty".to_string()));
        }
        if declared_size == 0 {
            return Err(FilebayError::Validation(format!("file {name} is empty")));
        }
        if declared_size > self.max_size {
            return Err(FilebayError::Validation(format!(
                "file {name} exceeds the size limit of {} bytes",
                self.max_size
            )));
        }

        let (_, ext) = split_extension(name);
        let ext = ext.trim_start_matches('.').to_lowercase();
        if !self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            return Err(FilebayError::Validation(format!(
                "file type of {name} is not allowed"
            )));
        }

        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&FilesConfig::default())
    }
}

/// Pagination and filter for a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub name_filter: Option<String>,
}

impl ListQuery {
    /// Build a query, clamping out-of-range paging values.
    pub fn new(page: i64, page_size: i64, name_filter: Option<String>) -> Self {
        let page = page.clamp(1, u32::MAX as i64) as u32;
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE as i64) as u32
        };
        let name_filter = name_filter.filter(|f| !f.is_empty());

        Self {
            page,
            page_size,
            name_filter,
        }
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE as i64, None)
    }
}

/// One page of results plus paging totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Matching rows across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size as u64)
        };

        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired active records found.
    pub scanned: usize,
    /// Records flipped to removed.
    pub removed: usize,
    /// Records left active because blob removal or the update failed.
    pub failed: usize,
}

/// File lifecycle operations over the metadata and content stores.
#[derive(Clone)]
pub struct FileService {
    db: Arc<Database>,
    storage: FileStorage,
    ids: Arc<IdGenerator>,
    policy: UploadPolicy,
}

impl FileService {
    /// Create a service with the default upload policy.
    pub fn new(db: Arc<Database>, storage: FileStorage, ids: Arc<IdGenerator>) -> Self {
        Self {
            db,
            storage,
            ids,
            policy: UploadPolicy::default(),
        }
    }

    /// Replace the upload policy.
    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    fn repo(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    /// Store a batch of files.
    ///
    /// The batch is all-or-nothing: on any error the blobs written so far are
    /// removed and no record is committed.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<FileRecord>> {
        if files.is_empty() {
            return Err(FilebayError::Validation("no files provided".to_string()));
        }

        self.storage.ensure_dir().await?;

        let mut batch = Vec::with_capacity(files.len());
        for file in files {
            let name = client_file_name(&file.name).to_string();
            self.policy.validate(&name, file.declared_size)?;
            batch.push((name, file));
        }

        let mut written: Vec<PathBuf> = Vec::with_capacity(batch.len());
        match self.store_batch(batch, &mut written).await {
            Ok(records) => {
                info!("Uploaded {} file(s)", records.len());
                Ok(records)
            }
            Err(e) => {
                warn!("Upload failed, discarding {} blob(s): {}", written.len(), e);
                for path in &written {
                    if let Err(remove_err) = self.storage.remove(path).await {
                        error!("Failed to discard blob {:?}: {}", path, remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn store_batch(
        &self,
        batch: Vec<(String, UploadFile)>,
        written: &mut Vec<PathBuf>,
    ) -> Result<Vec<FileRecord>> {
        let max_size = self.policy.max_size;
        let mut records = Vec::with_capacity(batch.len());

        for (name, mut file) in batch {
            let stored_name = FileStorage::stored_name(&name);
            let path = self.storage.path_for(&stored_name);
            written.push(path.clone());

            let size = self
                .storage
                .write_stream(&path, &mut file.reader, max_size.saturating_add(1))
                .await?;
            if size == 0 {
                return Err(FilebayError::Validation(format!("file {name} is empty")));
            }
            if size > max_size {
                return Err(FilebayError::Validation(format!(
                    "file {name} exceeds the size limit of {max_size} bytes"
                )));
            }

            debug!("Stored {} as {} ({} bytes)", name, stored_name, size);
            records.push(FileRecord {
                id: self.ids.next_id(),
                file_name: stored_name,
                file_path: path.to_string_lossy().into_owned(),
                file_size: size,
                status: FileStatus::Active,
                upload_date: Utc::now().trunc_subsecs(3),
            });
        }

        let mut tx = self.db.begin().await?;
        for record in &records {
            FileRepository::insert_with(&mut *tx, record).await?;
        }
        tx.commit().await?;

        Ok(records)
    }

    /// Read the blob of the active file with this stored name.
    ///
    /// A record whose blob has vanished is marked removed.
    pub async fn download(&self, file_name: &str) -> Result<Vec<u8>> {
        let repo = self.repo();
        let record = repo
            .find_active_by_name(file_name)
            .await?
            .ok_or_else(|| FilebayError::NotFound(format!("file {file_name}")))?;

        match self.storage.read(&record.file_path).await {
            Ok(content) => Ok(content),
            Err(FilebayError::NotFound(_)) => {
                warn!(
                    "Blob for file {} ({}) is missing, marking removed",
                    record.id, record.file_name
                );
                repo.mark_removed(record.id).await?;
                Err(FilebayError::NotFound(format!("file {file_name}")))
            }
            Err(e) => Err(e),
        }
    }

    /// List active files, newest first.
    pub async fn list_files(&self, query: &ListQuery) -> Result<PageResult<FileRecord>> {
        let repo = self.repo();
        let filter = query.name_filter.as_deref();

        let total = repo.count_active(filter).await?;
        let items = repo
            .list_active(filter, query.offset(), query.page_size as u64)
            .await?;

        Ok(PageResult::new(items, total, query.page, query.page_size))
    }

    /// Remove the blobs of the given files and mark them removed.
    ///
    /// Returns how many records changed to removed. Unknown or already
    /// removed ids are ignored; a blob that cannot be removed leaves its
    /// record active.
    pub async fn delete_by_ids(&self, ids: &[u64]) -> Result<u64> {
        let repo = self.repo();
        let mut deleted = 0;

        for chunk in ids.chunks(DELETE_BATCH_SIZE) {
            let records = repo.find_active_by_ids(chunk).await?;

            let mut processed = Vec::with_capacity(records.len());
            for record in records {
                match self.storage.remove(&record.file_path).await {
                    Ok(_) => processed.push(record.id),
                    Err(e) => warn!(
                        "Skipping file {}: cannot remove {}: {}",
                        record.id, record.file_path, e
                    ),
                }
            }

            deleted += repo.mark_removed_many(&processed).await?;
        }

        if deleted > 0 {
            info!("Deleted {} of {} requested file(s)", deleted, ids.len());
        }
        Ok(deleted)
    }

    /// Remove files uploaded more than `ttl` ago.
    ///
    /// Never fails; problems are logged and counted in the report.
    pub async fn sweep_expired(&self, ttl: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            error!("Expiry sweep skipped: retention {} is out of range", ttl);
            return report;
        };
        let repo = self.repo();

        let expired = match repo.list_active_uploaded_before(&cutoff).await {
            Ok(records) => records,
            Err(e) => {
                error!("Expiry sweep could not query files: {}", e);
                return report;
            }
        };
        report.scanned = expired.len();

        for record in expired {
            if let Err(e) = self.storage.remove(&record.file_path).await {
                warn!(
                    "Expiry sweep cannot remove blob {} of file {}: {}",
                    record.file_path, record.id, e
                );
                report.failed += 1;
                continue;
            }

            match repo.mark_removed(record.id).await {
                Ok(_) => {
                    debug!("Expired file {} ({})", record.id, record.file_name);
                    report.removed += 1;
                }
                Err(e) => {
                    error!("Expiry sweep cannot update file {}: {}", record.id, e);
                    report.failed += 1;
                }
            }
        }

        if report.scanned > 0 {
            info!(
                "Expiry sweep finished: {} scanned, {} removed, {} failed",
                report.scanned, report.removed, report.failed
            );
        }
        report
    }

    /// Get a record by id, whatever its status.
    pub async fn get_file(&self, id: u64) -> Result<FileRecord> {
        self.repo()
            .get_by_id(id)
            .await?
            .ok_or_else(|| FilebayError::NotFound(format!("file {id}")))
    }
}

impl fmt::Debug for FileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileService")
            .field("storage", &self.storage)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
