//! Route definitions for `/upload`.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::upload;
use crate::state::AppState;

/// Routes mounted at `/upload`.
///
/// The default body limit is lifted here; the handler enforces the
/// configured maximum while streaming the file.
///
/// ```text
/// POST /  -> upload_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload::upload_file))
        .layer(DefaultBodyLimit::disable())
}
