//! Route definitions for processing, results and downloads.
//!
//! These live at the top of `/api/v1` rather than under a shared prefix.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::processing;
use crate::state::AppState;

/// Processing routes, merged into `/api/v1`.
///
/// ```text
/// POST /process/{job_id}              -> start_processing
/// GET  /results/{job_id}              -> get_results
/// GET  /download/{job_id}/{filename}  -> download_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process/{job_id}", post(processing::start_processing))
        .route("/results/{job_id}", get(processing::get_results))
        .route("/download/{job_id}/{filename}", get(processing::download_file))
}
