//! Shared query parameter types for API handlers.

use serde::Deserialize;
use utoipa::IntoParams;

/// Page size used when `limit` is omitted.
pub const DEFAULT_LIMIT: i64 = 10;
/// Largest accepted page size.
pub const MAX_LIMIT: i64 = 100;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaginationParams {
    /// Page size, 1-100 (default 10).
    pub limit: Option<i64>,
    /// Rows to skip (default 0).
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
