//! Upload job entity and DTOs.

use insight_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::status::JobStatus;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Job {
    #[serde(skip_serializing)]
    #[schema(value_type = i64)]
    pub id: DbId,
    /// Public identifier, `YYYYMMDDHHMMSS_xxxxxxxx`.
    pub job_id: String,
    #[serde(skip_serializing)]
    #[schema(value_type = i64)]
    pub user_id: DbId,
    pub filename: String,
    pub file_size: i64,
    pub file_sha256: String,
    pub status: JobStatus,
    pub progress: i64,
    pub rows_count: Option<i64>,
    pub quality_score: Option<i64>,
    pub error_message: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub started_at: Option<Timestamp>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub completed_at: Option<Timestamp>,
    /// Seconds between start and completion.
    pub processing_time: Option<f64>,
}

/// DTO for inserting a freshly uploaded job.
#[derive(Debug)]
pub struct CreateJob {
    pub job_id: String,
    pub user_id: DbId,
    pub filename: String,
    pub file_size: i64,
    pub file_sha256: String,
}

/// Figures recorded when processing succeeds.
#[derive(Debug, Clone, Copy)]
pub struct JobCompletion {
    pub rows_count: i64,
    pub quality_score: i64,
}
