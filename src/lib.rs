//! filebay - file upload service
//!
//! Stores uploaded files under collision-resistant names, tracks them in
//! SQLite with time-ordered ids, and supports paginated listing, bulk
//! soft-delete and periodic expiry sweeps.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod id;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::{Database, DbPool};
pub use error::{FilebayError, Result};
pub use file::{
    FileRecord, FileService, FileStatus, FileStorage, ListQuery, PageResult, SweepReport,
    UploadFile, UploadPolicy,
};
pub use id::IdGenerator;
