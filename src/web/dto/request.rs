//! Request DTOs for the HTTP API.

use serde::Deserialize;

use crate::file::ListQuery;

/// Query string of `GET /files/`.
///
/// Values are kept as strings so that malformed numbers fall back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
    /// Substring to match against stored file names.
    #[serde(default)]
    pub filename_filter: Option<String>,
}

impl ListFilesParams {
    /// Turn the raw parameters into a clamped listing query.
    pub fn into_query(self) -> ListQuery {
        let page = parse_or(self.page.as_deref(), 1);
        let page_size = parse_or(self.page_size.as_deref(), 0);
        ListQuery::new(page, page_size, self.filename_filter)
    }
}

fn parse_or(value: Option<&str>, fallback: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

/// Body of `DELETE /files/`.
#[derive(Debug, Deserialize)]
pub struct DeleteFilesRequest {
    /// Ids of the files to remove.
    pub ids: Vec<u64>,
}
