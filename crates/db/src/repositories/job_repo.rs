//! Repository for the `jobs` table.
//!
//! Status transitions are guarded in SQL so that concurrent callers cannot
//! move a job out of order: only `queued` or `failed` jobs can start, and
//! only `processing` jobs can complete or fail.

use chrono::Utc;
use insight_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::job::{CreateJob, Job, JobCompletion};
use crate::models::status::JobStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, job_id, user_id, filename, file_size, file_sha256, status, progress, \
                        rows_count, quality_score, error_message, created_at, started_at, \
                        completed_at, processing_time";

/// Provides lifecycle operations for upload jobs.
pub struct JobRepo;

impl JobRepo {
    /// Consume one unit of the owner's upload quota and insert a `queued` job,
    /// atomically.
    ///
    /// Returns `None` (and inserts nothing) when the quota is exhausted.
    pub async fn create_with_quota_increment(
        pool: &SqlitePool,
        input: &CreateJob,
    ) -> Result<Option<Job>, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let charged = sqlx::query(
            "UPDATE users SET upload_count = upload_count + 1, updated_at = $1
             WHERE id = $2 AND upload_count < upload_limit",
        )
        .bind(now)
        .bind(input.user_id)
        .execute(&mut *tx)
        .await?;

        if charged.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO jobs (job_id, user_id, filename, file_size, file_sha256, status, progress, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7)
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(&input.job_id)
            .bind(input.user_id)
            .bind(&input.filename)
            .bind(input.file_size)
            .bind(&input.file_sha256)
            .bind(JobStatus::Queued)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(job))
    }

    /// Find a job by its public identifier.
    pub async fn find_by_job_id(
        pool: &SqlitePool,
        job_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE job_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's jobs, newest first.
    pub async fn list_by_user(
        pool: &SqlitePool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_user(pool: &SqlitePool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Move a `queued` or `failed` job to `processing`.
    ///
    /// Clears the outcome of any previous attempt. Returns the updated row,
    /// or `None` if the job is missing or in another status.
    pub async fn mark_processing(
        pool: &SqlitePool,
        job_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET
                status = $1, progress = 0, started_at = $2,
                completed_at = NULL, processing_time = NULL, error_message = NULL,
                rows_count = NULL, quality_score = NULL
             WHERE job_id = $3 AND status IN ($4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Processing)
            .bind(Utc::now())
            .bind(job_id)
            .bind(JobStatus::Queued)
            .bind(JobStatus::Failed)
            .fetch_optional(pool)
            .await
    }

    /// Update progress (0-100) of a running job.
    pub async fn update_progress(
        pool: &SqlitePool,
        job_id: &str,
        progress: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET progress = $1 WHERE job_id = $2 AND status = $3")
            .bind(progress.clamp(0, 100))
            .bind(job_id)
            .bind(JobStatus::Processing)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a running job as complete.
    ///
    /// Sets progress to 100 and derives `processing_time` from `started_at`.
    /// Returns `false` if the job was not `processing`.
    pub async fn complete(
        pool: &SqlitePool,
        job_id: &str,
        completion: &JobCompletion,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET
                status = $1, progress = 100, rows_count = $2, quality_score = $3,
                completed_at = $4,
                processing_time = MAX((julianday($4) - julianday(started_at)) * 86400.0, 0.0)
             WHERE job_id = $5 AND status = $6",
        )
        .bind(JobStatus::Complete)
        .bind(completion.rows_count)
        .bind(completion.quality_score.clamp(0, 100))
        .bind(Utc::now())
        .bind(job_id)
        .bind(JobStatus::Processing)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as failed with an error message.
    ///
    /// The job stays `failed` until it is explicitly restarted.
    pub async fn fail(pool: &SqlitePool, job_id: &str, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET
                status = $1, error_message = $2, completed_at = $3,
                processing_time = MAX(COALESCE((julianday($3) - julianday(started_at)) * 86400.0, 0.0), 0.0)
             WHERE job_id = $4 AND status = $5",
        )
        .bind(JobStatus::Failed)
        .bind(error)
        .bind(Utc::now())
        .bind(job_id)
        .bind(JobStatus::Processing)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a job row. Returns `true` if a row was removed.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return jobs interrupted mid-run to `queued` so they can be restarted.
    pub async fn requeue_processing(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $1, progress = 0, started_at = NULL WHERE status = $2",
        )
        .bind(JobStatus::Queued)
        .bind(JobStatus::Processing)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
