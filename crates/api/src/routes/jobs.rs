//! Route definitions for the `/jobs` resource.
//!
//! All endpoints require authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /            -> list_jobs
/// GET    /{job_id}    -> get_job
/// DELETE /{job_id}    -> delete_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/{job_id}", get(jobs::get_job).delete(jobs::delete_job))
}
