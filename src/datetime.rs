//! Date/time utilities for filebay.
//!
//! Timestamps are stored in SQLite as fixed-width UTC text
//! (`YYYY-MM-DD HH:MM:SS.mmm`) so that string comparison matches
//! chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used for timestamps in the metadata store.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a UTC timestamp for storage.
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts the storage format and, for rows written by SQLite's
/// `datetime('now')`, the same format without milliseconds.
pub fn from_storage(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, STORAGE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}
