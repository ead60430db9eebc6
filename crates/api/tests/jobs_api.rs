//! HTTP-level integration tests for the `/jobs` endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get, get_auth, register, upload_sales};
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_job_returns_detail(pool: SqlitePool) {
    let test = common::build_test_app(pool);
    let token = register(test.app(), "owner@example.com").await;
    let job_id = upload_sales(test.app(), &token).await;

    let response = get_auth(test.app(), &format!("/api/v1/jobs/{job_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let job = body_json(response).await["data"].clone();
    assert_eq!(job["job_id"], job_id.as_str());
    assert_eq!(job["filename"], "sales.csv");
    assert_eq!(job["status"], "queued");
    assert_eq!(job["progress"], 0);
    assert!(job["rows_count"].is_null());
    // Internal keys stay private.
    assert!(job.get("id").is_none());
    assert!(job.get("user_id").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_job_enforces_ownership(pool: SqlitePool) {
    let test = common::build_test_app(pool);
    let owner = register(test.app(), "a@example.com").await;
    let other = register(test.app(), "b@example.com").await;
    let job_id = upload_sales(test.app(), &owner).await;

    let response = get_auth(test.app(), &format!("/api/v1/jobs/{job_id}"), &other).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Not authorized to access this job"
    );

    let response = get(test.app(), &format!("/api/v1/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_unknown_job_returns_404(pool: SqlitePool) {
    let test = common::build_test_app(pool);
    let token = register(test.app(), "c@example.com").await;

    for id in ["20240101000000_deadbeef", "not-a-job-id"] {
        let response = get_auth(test.app(), &format!("/api/v1/jobs/{id}"), &token).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{id}");
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_jobs_pages_newest_first(pool: SqlitePool) {
    let test = common::build_test_app(pool);
    let token = register(test.app(), "d@example.com").await;
    let other = register(test.app(), "e@example.com").await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(upload_sales(test.app(), &token).await);
    }
    upload_sales(test.app(), &other).await;

    let response = get_auth(test.app(), "/api/v1/jobs", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 10);
    assert_eq!(page["offset"], 0);
    let listed: Vec<&str> = page["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["job_id"].as_str().unwrap())
        .collect();
    let newest_first: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
    assert_eq!(listed, newest_first);

    let response = get_auth(test.app(), "/api/v1/jobs?limit=1&offset=1", &token).await;
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(page["jobs"][0]["job_id"], ids[1].as_str());
    assert_eq!(page["total"], 3);

    let response = get_auth(test.app(), "/api/v1/jobs?limit=1000", &token).await;
    assert_eq!(body_json(response).await["data"]["limit"], 100);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_delete_job_removes_files_and_row(pool: SqlitePool) {
    let test = common::build_test_app(pool);
    let token = register(test.app(), "f@example.com").await;
    let other = register(test.app(), "g@example.com").await;
    let job_id = upload_sales(test.app(), &token).await;
    let uri = format!("/api/v1/jobs/{job_id}");

    let response = delete_auth(test.app(), &uri, &other).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(test.app(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!test.upload_dir.path().join(&job_id).exists());

    let response = get_auth(test.app(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete_auth(test.app(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
