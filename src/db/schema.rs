//! Database schema and migrations for filebay.
//!
//! Migrations are applied in order when the database is opened; the
//! schema_version table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: file metadata
    r#"
-- One row per uploaded file. Rows are never deleted; status 1 marks a removed file.
CREATE TABLE file_info (
    id          INTEGER PRIMARY KEY,        -- generator-assigned, stored bit-for-bit
    file_name   TEXT NOT NULL,              -- stored name: {base}_{uuid}{ext}
    file_path   TEXT NOT NULL,
    file_size   INTEGER NOT NULL,
    status      INTEGER NOT NULL DEFAULT 0, -- 0 = active, 1 = removed
    upload_date TEXT NOT NULL               -- UTC, 'YYYY-MM-DD HH:MM:SS.mmm'
);

CREATE INDEX idx_file_info_status_upload_date ON file_info(status, upload_date);
CREATE INDEX idx_file_info_file_name ON file_info(file_name);
"#,
];
