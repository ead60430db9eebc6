//! Handlers for the `/jobs` resource.
//!
//! Jobs are only visible to the user who uploaded them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use insight_core::error::CoreError;
use insight_core::job_id::is_valid_job_id;
use insight_core::types::DbId;
use insight_db::models::job::Job;
use insight_db::repositories::JobRepo;
use insight_db::DbPool;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage;

/// One page of the caller's jobs.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Total number of jobs owned by the caller.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Load a job and check that `user_id` owns it.
///
/// Malformed ids are reported as not found.
pub(crate) async fn load_owned_job(pool: &DbPool, job_id: &str, user_id: DbId) -> AppResult<Job> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        })
    };

    if !is_valid_job_id(job_id) {
        return Err(not_found());
    }
    let job = JobRepo::find_by_job_id(pool, job_id).await?.ok_or_else(not_found)?;
    if job.user_id != user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not authorized to access this job".into(),
        )));
    }
    Ok(job)
}

/// GET /api/v1/jobs/{job_id}
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    tag = "Jobs",
    security(("bearer_auth" = [])),
    params(("job_id" = String, Path, description = "Public job id")),
    responses(
        (status = 200, description = "Job detail", body = Job),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = load_owned_job(&state.pool, &job_id, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/jobs?limit=&offset=
///
/// The caller's jobs, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "Jobs",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of jobs", body = JobPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<JobPage>>> {
    let (limit, offset) = (params.limit(), params.offset());
    let jobs = JobRepo::list_by_user(&state.pool, auth_user.user_id, limit, offset).await?;
    let total = JobRepo::count_by_user(&state.pool, auth_user.user_id).await?;

    Ok(Json(DataResponse {
        data: JobPage {
            jobs,
            total,
            limit,
            offset,
        },
    }))
}

/// DELETE /api/v1/jobs/{job_id}
///
/// Remove the job's files, then the job itself. Returns 204 No Content.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{job_id}",
    tag = "Jobs",
    security(("bearer_auth" = [])),
    params(("job_id" = String, Path, description = "Public job id")),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn delete_job(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<StatusCode> {
    let job = load_owned_job(&state.pool, &job_id, auth_user.user_id).await?;

    storage::remove_job_dir(&state.config.upload.upload_dir, &job.job_id).await?;
    JobRepo::delete(&state.pool, job.id).await?;

    tracing::info!(user_id = auth_user.user_id, job_id = %job.job_id, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}
