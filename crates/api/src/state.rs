use std::sync::Arc;

use crate::background::processing::JobQueue;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: insight_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Processing queue feeding the background worker.
    pub jobs: JobQueue,
}
