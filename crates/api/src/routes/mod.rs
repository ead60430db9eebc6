pub mod auth;
pub mod health;
pub mod jobs;
pub mod processing;
pub mod upload;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /                                   API index (public)
///
/// /auth/register                      register (public)
/// /auth/login                         login (public)
/// /auth/me                            current user (requires auth)
/// /auth/logout                        logout (requires auth)
///
/// /upload                             upload a file (requires auth)
///
/// /jobs                               list own jobs
/// /jobs/{job_id}                      get, delete
///
/// /process/{job_id}                   start processing (POST)
/// /results/{job_id}                   processing results (GET)
/// /download/{job_id}/{filename}       download a job file (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_index))
        // Registration, login and token revocation.
        .nest("/auth", auth::router())
        // File intake.
        .nest("/upload", upload::router())
        // Job tracking.
        .nest("/jobs", jobs::router())
        // Processing, results and downloads.
        .merge(processing::router())
}

/// Endpoint groups advertised by the API index.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiEndpoints {
    pub auth: &'static str,
    pub upload: &'static str,
    pub jobs: &'static str,
    pub process: &'static str,
    pub results: &'static str,
    pub download: &'static str,
}

/// Response of `GET /api/v1`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiIndex {
    pub version: &'static str,
    pub endpoints: ApiEndpoints,
}

/// GET /api/v1
#[utoipa::path(
    get,
    path = "/api/v1",
    tag = "Service",
    responses((status = 200, description = "API version and endpoint groups", body = ApiIndex))
)]
pub async fn api_index() -> Json<ApiIndex> {
    Json(ApiIndex {
        version: "1.0",
        endpoints: ApiEndpoints {
            auth: "/api/v1/auth",
            upload: "/api/v1/upload",
            jobs: "/api/v1/jobs",
            process: "/api/v1/process",
            results: "/api/v1/results",
            download: "/api/v1/download",
        },
    })
}
