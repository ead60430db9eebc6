//! Handler for `POST /upload`.
//!
//! Validation runs in a fixed order (quota, file name, extension, size,
//! content signature) so the first failing rule decides the error.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use insight_core::error::CoreError;
use insight_core::job_id::generate_job_id;
use insight_core::types::Timestamp;
use insight_core::upload::{check_content, sanitize_filename, sha256_hex, FileKind, UploadPolicy};
use insight_db::models::job::CreateJob;
use insight_db::models::status::JobStatus;
use insight_db::models::user::User;
use insight_db::repositories::{JobRepo, UserRepo};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage;

const UPLOADED_MESSAGE: &str = "File uploaded successfully. Processing will begin shortly.";

/// Multipart form accepted by `POST /upload`.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// CSV or Excel file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Payload returned once an upload has been stored and queued.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub job_id: String,
    pub filename: String,
    pub file_size: i64,
    pub status: JobStatus,
    pub message: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
}

/// POST /api/v1/upload
///
/// Accept a CSV or Excel file in the `file` field, store it under a new job
/// and queue the job for processing.
#[utoipa::path(
    post,
    path = "/api/v1/upload",
    tag = "Upload",
    security(("bearer_auth" = [])),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored and queued", body = UploadResponse),
        (status = 400, description = "Missing file, bad type, too large or content mismatch"),
        (status = 401, description = "Not authenticated"),
        (status = 429, description = "Upload limit reached")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadResponse>>)> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User not found".into())))?;
    if !user.has_upload_quota() {
        return Err(limit_reached(&user));
    }

    let policy = &state.config.upload.policy;
    let mut upload: Option<(String, FileKind, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, policy))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = sanitize_filename(field.file_name().unwrap_or_default())?;
        let kind = policy.check_extension(&filename)?;
        let data = read_limited(field, policy).await?;
        upload = Some((filename, kind, data));
        break;
    }

    let (filename, kind, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    check_content(kind, &data)?;

    let job_id = generate_job_id();
    let upload_dir = &state.config.upload.upload_dir;
    storage::save_upload(&storage::upload_path(upload_dir, &job_id, &filename), &data).await?;

    let input = CreateJob {
        job_id: job_id.clone(),
        user_id: user.id,
        filename,
        file_size: data.len() as i64,
        file_sha256: sha256_hex(&data),
    };

    let created = JobRepo::create_with_quota_increment(&state.pool, &input).await;
    let job = match created {
        Ok(Some(job)) => job,
        Ok(None) => {
            discard(upload_dir, &job_id).await;
            return Err(limit_reached(&user));
        }
        Err(e) => {
            discard(upload_dir, &job_id).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        user_id = user.id,
        job_id = %job.job_id,
        filename = %job.filename,
        file_size = job.file_size,
        "File uploaded",
    );

    // A full queue leaves the job queued; it can be started via /process.
    state.jobs.enqueue(&job.job_id);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResponse {
                job_id: job.job_id,
                filename: job.filename,
                file_size: job.file_size,
                status: job.status,
                message: UPLOADED_MESSAGE.to_string(),
                created_at: job.created_at,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a multipart field chunk by chunk, failing as soon as it exceeds the
/// size limit.
async fn read_limited(mut field: Field<'_>, policy: &UploadPolicy) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, policy))? {
        policy.check_size((data.len() + chunk.len()) as u64)?;
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn multipart_error(err: MultipartError, policy: &UploadPolicy) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return match policy.check_size(u64::MAX) {
            Err(size) => AppError::Core(size),
            Ok(()) => AppError::BadRequest(err.body_text()),
        };
    }
    AppError::BadRequest(err.body_text())
}

fn limit_reached(user: &User) -> AppError {
    AppError::Core(CoreError::LimitExceeded(format!(
        "Upload limit reached ({}/month). Please upgrade.",
        user.upload_limit
    )))
}

async fn discard(upload_dir: &std::path::Path, job_id: &str) {
    if let Err(e) = storage::remove_job_dir(upload_dir, job_id).await {
        tracing::warn!(job_id, error = %e, "Failed to remove orphaned upload");
    }
}
