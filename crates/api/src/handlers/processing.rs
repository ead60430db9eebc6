//! Handlers for starting processing, reading results and downloading job
//! files.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use insight_core::error::CoreError;
use insight_core::profiling::{
    preview_csv, read_processing_log, read_profile, CLEANED_DATA_FILE, PROCESSING_LOG_FILE,
    PROFILE_FILE,
};
use insight_db::models::status::JobStatus;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::load_owned_job;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage;

/// Rows of normalised data included in a results payload.
const PREVIEW_ROWS: usize = 5;

/// Outcome of a processing request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Download links for the artifacts of a completed job.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultFiles {
    pub cleaned_data: String,
    pub processing_log: String,
    pub profile: String,
}

/// Results of a job.
///
/// Only `job_id`, `status` and `message` are present until the job is
/// complete.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct JobResults {
    pub job_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_log: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub data_preview: Option<Vec<Map<String, Value>>>,
    /// Schema and dataset statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub profile: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<ResultFiles>,
}

/// POST /api/v1/process/{job_id}
///
/// Queue a job for (re)processing. Jobs that are already processing or
/// complete are left alone and reported with 200.
#[utoipa::path(
    post,
    path = "/api/v1/process/{job_id}",
    tag = "Processing",
    security(("bearer_auth" = [])),
    params(("job_id" = String, Path, description = "Public job id")),
    responses(
        (status = 202, description = "Job queued", body = ProcessResponse),
        (status = 200, description = "Job already processing or complete", body = ProcessResponse),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job or uploaded file not found"),
        (status = 503, description = "Processing queue full; retry later")
    )
)]
pub async fn start_processing(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<(StatusCode, Json<DataResponse<ProcessResponse>>)> {
    let job = load_owned_job(&state.pool, &job_id, auth_user.user_id).await?;

    if !job.status.is_startable() {
        let response = ProcessResponse {
            message: format!("Job is already {}", job.status),
            job_id: job.job_id,
            status: job.status,
        };
        return Ok((StatusCode::OK, Json(DataResponse { data: response })));
    }

    let upload = storage::upload_path(&state.config.upload.upload_dir, &job.job_id, &job.filename);
    if !tokio::fs::try_exists(&upload).await.unwrap_or(false) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Uploaded file",
            id: job.job_id,
        }));
    }

    if !state.jobs.enqueue(&job.job_id) {
        return Err(AppError::Core(CoreError::Unavailable(
            "Processing queue is busy. The job is still queued; please retry shortly.".into(),
        )));
    }

    tracing::info!(user_id = auth_user.user_id, job_id = %job.job_id, "Processing requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: ProcessResponse {
                job_id: job.job_id,
                status: job.status,
                message: "Processing started".to_string(),
            },
        }),
    ))
}

/// GET /api/v1/results/{job_id}
#[utoipa::path(
    get,
    path = "/api/v1/results/{job_id}",
    tag = "Processing",
    security(("bearer_auth" = [])),
    params(("job_id" = String, Path, description = "Public job id")),
    responses(
        (status = 200, description = "Results, or the job status when not complete", body = JobResults),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_results(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<JobResults>>> {
    let job = load_owned_job(&state.pool, &job_id, auth_user.user_id).await?;

    if job.status != JobStatus::Complete {
        return Ok(Json(DataResponse {
            data: JobResults {
                message: Some(format!(
                    "Job is {}. Results not available yet.",
                    job.status
                )),
                job_id: job.job_id,
                status: job.status.to_string(),
                ..Default::default()
            },
        }));
    }

    let dir = storage::job_dir(&state.config.upload.upload_dir, &job.job_id);
    let (processing_log, data_preview, profile) = tokio::task::spawn_blocking(move || {
        let log = read_processing_log(&dir)?;
        let preview = preview_csv(&dir.join(CLEANED_DATA_FILE), PREVIEW_ROWS)?;
        let profile = read_profile(&dir)?;
        Ok::<_, insight_core::profiling::ProfileError>((log, preview, profile))
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Results task failed: {e}")))?
    .map_err(|e| AppError::InternalError(format!("Failed to read results: {e}")))?;

    Ok(Json(DataResponse {
        data: JobResults {
            files: Some(ResultFiles {
                cleaned_data: download_link(&job.job_id, CLEANED_DATA_FILE),
                processing_log: download_link(&job.job_id, PROCESSING_LOG_FILE),
                profile: download_link(&job.job_id, PROFILE_FILE),
            }),
            job_id: job.job_id,
            status: job.status.to_string(),
            message: None,
            quality_score: job.quality_score,
            rows_count: job.rows_count,
            processing_time: job.processing_time,
            processing_log: Some(processing_log),
            data_preview: Some(data_preview),
            profile,
        },
    }))
}

/// GET /api/v1/download/{job_id}/{filename}
///
/// Stream a file from the job directory as an attachment.
#[utoipa::path(
    get,
    path = "/api/v1/download/{job_id}/{filename}",
    tag = "Processing",
    security(("bearer_auth" = [])),
    params(
        ("job_id" = String, Path, description = "Public job id"),
        ("filename" = String, Path, description = "File inside the job directory")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid filename"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job or file not found")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((job_id, filename)): Path<(String, String)>,
) -> AppResult<Response> {
    let job = load_owned_job(&state.pool, &job_id, auth_user.user_id).await?;
    let path = storage::download_path(&state.config.upload.upload_dir, &job.job_id, &filename)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "File",
                id: filename,
            }));
        }
        Err(e) => return Err(e.into()),
    };
    let file_size = file.metadata().await?.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            storage::attachment_disposition(&filename),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(format!("Failed to build download response: {e}")))
}

fn download_link(job_id: &str, filename: &str) -> String {
    format!("/api/v1/download/{job_id}/{filename}")
}
