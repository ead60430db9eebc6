use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use insight_core::types::Timestamp;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

const SERVICE_NAME: &str = "AI Data Insight Engine";

/// Service banner returned by `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub status: &'static str,
    pub environment: String,
    /// Location of the interactive API docs.
    pub docs: &'static str,
}

/// Per-dependency health results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub api: &'static str,
    /// `"ok"` or `"error"`.
    pub database: &'static str,
}

/// Health check response payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"healthy"` when every check passes, otherwise `"degraded"`.
    pub status: &'static str,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: Timestamp,
    pub environment: String,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// GET / -- service name, version and docs location.
#[utoipa::path(
    get,
    path = "/",
    tag = "Service",
    responses((status = 200, description = "Service information", body = ServiceInfo))
)]
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        environment: state.config.environment.clone(),
        docs: "/docs",
    })
}

/// GET /health -- returns service and database health.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Service",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match insight_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if db_healthy { "healthy" } else { "degraded" },
        timestamp: Utc::now(),
        environment: state.config.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            api: "ok",
            database: if db_healthy { "ok" } else { "error" },
        },
    })
}

/// Mount service routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
