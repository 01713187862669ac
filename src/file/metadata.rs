//! File metadata types and repository.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::datetime;
use crate::db::DbPool;
use crate::{FilebayError, Result};

/// Lifecycle state of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Visible and downloadable.
    Active,
    /// Soft-deleted; the blob is gone but the row is kept.
    Removed,
}

impl FileStatus {
    /// Integer code stored in the `status` column.
    pub fn code(self) -> i64 {
        match self {
            FileStatus::Active => 0,
            FileStatus::Removed => 1,
        }
    }

    /// Decode a stored status code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FileStatus::Active),
            1 => Some(FileStatus::Removed),
            _ => None,
        }
    }
}

/// Metadata row for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Generator-assigned id.
    pub id: u64,
    /// Stored name, `{base}_{uuid}{ext}`.
    pub file_name: String,
    /// Location of the blob.
    pub file_path: String,
    /// Size in bytes at upload time.
    pub file_size: u64,
    pub status: FileStatus,
    /// Upload time, millisecond precision.
    pub upload_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    file_name: String,
    file_path: String,
    file_size: i64,
    status: i64,
    upload_date: String,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = FilebayError;

    fn try_from(row: FileRow) -> Result<Self> {
        let status = FileStatus::from_code(row.status).ok_or_else(|| {
            FilebayError::Database(format!("invalid status {} for file {}", row.status, row.id))
        })?;
        let upload_date = datetime::from_storage(&row.upload_date).ok_or_else(|| {
            FilebayError::Database(format!(
                "invalid upload_date '{}' for file {}",
                row.upload_date, row.id
            ))
        })?;

        Ok(Self {
            id: row.id as u64,
            file_name: row.file_name,
            file_path: row.file_path,
            file_size: row.file_size as u64,
            status,
            upload_date,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, file_name, file_path, file_size, status, upload_date FROM file_info";

fn into_records(rows: Vec<FileRow>) -> Result<Vec<FileRecord>> {
    rows.into_iter().map(FileRecord::try_from).collect()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Escape LIKE wildcards so the filter matches literally.
fn like_pattern(filter: &str) -> String {
    let mut escaped = String::with_capacity(filter.len() + 2);
    escaped.push('%');
    for c in filter.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn active_filter_clause(filter: Option<&str>) -> (&'static str, Option<String>) {
    match filter.filter(|f| !f.is_empty()) {
        Some(f) => (
            " WHERE status = 0 AND file_name LIKE ? ESCAPE '\\'",
            Some(like_pattern(f)),
        ),
        None => (" WHERE status = 0", None),
    }
}

/// Repository for file metadata.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a record through any executor, e.g. `&mut *tx`.
    pub async fn insert_with<'e, E>(executor: E, record: &FileRecord) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO file_info (id, file_name, file_path, file_size, status, upload_date)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id as i64)
        .bind(&record.file_name)
        .bind(&record.file_path)
        .bind(record.file_size as i64)
        .bind(record.status.code())
        .bind(datetime::to_storage(&record.upload_date))
        .execute(executor)
        .await
        .map_err(|e| FilebayError::Database(e.to_string()))?;

        Ok(())
    }

    /// Insert a record using the pool.
    pub async fn insert(&self, record: &FileRecord) -> Result<()> {
        Self::insert_with(self.pool, record).await
    }

    /// Get a record by id regardless of status.
    pub async fn get_by_id(&self, id: u64) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id as i64)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FilebayError::Database(e.to_string()))?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Find the active record with exactly this stored name.
    pub async fn find_active_by_name(&self, file_name: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "{SELECT_COLUMNS} WHERE file_name = ? AND status = 0 ORDER BY id DESC LIMIT 1"
        ))
        .bind(file_name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FilebayError::Database(e.to_string()))?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Find the active records among `ids`. Unknown or removed ids are skipped.
    pub async fn find_active_by_ids(&self, ids: &[u64]) -> Result<Vec<FileRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "{SELECT_COLUMNS} WHERE status = 0 AND id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut query_builder = sqlx::query_as::<_, FileRow>(&query);
        for id in ids {
            query_builder = query_builder.bind(*id as i64);
        }

        let rows = query_builder
            .fetch_all(self.pool)
            .await
            .map_err(|e| FilebayError::Database(e.to_string()))?;

        into_records(rows)
    }

    /// Count active records, optionally filtered by a name substring.
    pub async fn count_active(&self, filter: Option<&str>) -> Result<u64> {
        let (clause, pattern) = active_filter_clause(filter);
        let query = format!("SELECT COUNT(*) FROM file_info{clause}");

        let mut query_builder = sqlx::query_scalar::<_, i64>(&query);
        if let Some(pattern) = pattern {
            query_builder = query_builder.bind(pattern);
        }

        let count = query_builder
            .fetch_one(self.pool)
            .await
            .map_err(|e| FilebayError::Database(e.to_string()))?;

        Ok(count as u64)
    }

    /// List one page of active records, newest first.
    pub async fn list_active(
        &self,
        filter: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<FileRecord>> {
        let (clause, pattern) = active_filter_clause(filter);
        let query =
            format!("{SELECT_COLUMNS}{clause} ORDER BY upload_date DESC, id DESC LIMIT ? OFFSET ?");

        let mut query_builder = sqlx::query_as::<_, FileRow>(&query);
        if let Some(pattern) = pattern {
            query_builder = query_builder.bind(pattern);
        }

        let rows = query_builder
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FilebayError::Database(e.to_string()))?;

        into_records(rows)
    }

    /// List active records uploaded strictly before `cutoff`.
    pub async fn list_active_uploaded_before(
        &self,
        cutoff: &DateTime<Utc>,
    ) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "{SELECT_COLUMNS} WHERE status = 0 AND upload_date < ? ORDER BY upload_date, id"
        ))
        .bind(datetime::to_storage(cutoff))
        .fetch_all(self.pool)
        .await
        .map_err(|e| FilebayError::Database(e.to_string()))?;

        into_records(rows)
    }

    /// Mark one record removed. Returns `false` if it was not active.
    pub async fn mark_removed(&self, id: u64) -> Result<bool> {
        let result = sqlx::query("UPDATE file_info SET status = 1 WHERE id = ? AND status = 0")
            .bind(id as i64)
            .execute(self.pool)
            .await
            .map_err(|e| FilebayError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark many records removed in one statement. Returns how many changed.
    pub async fn mark_removed_many(&self, ids: &[u64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "UPDATE file_info SET status = 1 WHERE status = 0 AND id IN ({})",
            placeholders(ids.len())
        );
        let mut query_builder = sqlx::query(&query);
        for id in ids {
            query_builder = query_builder.bind(*id as i64);
        }

        let result = query_builder
            .execute(self.pool)
            .await
            .map_err(|e| FilebayError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
