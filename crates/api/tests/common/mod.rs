#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use insight_api::auth::jwt::JwtConfig;
use insight_api::background::processing::{JobQueue, Processor};
use insight_api::config::{ServerConfig, UploadConfig};
use insight_api::router::build_app_router;
use insight_api::state::AppState;
use insight_core::upload::UploadPolicy;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "insight-test-boundary";

/// Build a test `ServerConfig` with safe defaults and uploads under
/// `upload_dir`.
///
/// Uploads are capped at 1 KiB so size checks are cheap to exercise.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        cors_origins: vec!["http://localhost:8501".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-do-not-use".to_string(),
            expiration_minutes: 60,
        },
        upload: UploadConfig {
            upload_dir: upload_dir.to_path_buf(),
            policy: UploadPolicy {
                allowed_extensions: vec!["csv".into(), "xlsx".into(), "xls".into()],
                max_file_size_bytes: 1024,
            },
            max_rows: 10_000,
            default_upload_limit: 3,
        },
    }
}

/// Application under test plus the pieces tests need to inspect.
///
/// The processing worker is not running; tests drain `queue` themselves and
/// run jobs through [`TestApp::process_queued`].
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub queue: mpsc::Receiver<String>,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }

    pub fn processor(&self) -> Processor {
        Processor::new(self.state.pool.clone(), &self.state.config)
    }

    /// Run every job currently waiting in the queue; returns the job ids.
    pub async fn process_queued(&mut self) -> Vec<String> {
        let processor = self.processor();
        let mut processed = Vec::new();
        while let Ok(job_id) = self.queue.try_recv() {
            processor.process(&job_id).await;
            processed.push(job_id);
        }
        processed
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This goes through the same `build_app_router` as `main.rs` so integration
/// tests exercise the production middleware stack.
pub fn build_test_app(pool: SqlitePool) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = test_config(upload_dir.path());
    let (jobs, queue) = JobQueue::new(16);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        jobs,
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        queue,
        upload_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Multipart body with a single field named `field`.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, token: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Upload `data` as `filename` through `POST /api/v1/upload`.
pub async fn upload(app: Router, token: &str, filename: &str, data: &[u8]) -> Response {
    post_multipart(app, "/api/v1/upload", token, multipart_body("file", filename, data)).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const SALES_CSV: &[u8] = b"Date,Product,Sales,Region\n\
2024-01-01,A,1200,North\n\
2024-01-02,B,800,South\n\
2024-01-03,A,1500,North\n\
2024-01-04,C,,East\n\
2024-01-04,C,,East\n";

/// Register `email` with [`TEST_PASSWORD`] and return its access token.
pub async fn register(app: Router, email: &str) -> String {
    let body = serde_json::json!({
        "email": email,
        "password": TEST_PASSWORD,
        "full_name": "Test User",
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Upload [`SALES_CSV`] and return the new job id.
pub async fn upload_sales(app: Router, token: &str) -> String {
    let response = upload(app, token, "sales.csv", SALES_CSV).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}
