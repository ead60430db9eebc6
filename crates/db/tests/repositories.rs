//! Integration tests for the repository layer.
//!
//! Each test gets a fresh SQLite database with all migrations applied.

use chrono::{Duration, Utc};
use insight_db::models::job::{CreateJob, JobCompletion};
use insight_db::models::status::JobStatus;
use insight_db::models::user::{CreateUser, User};
use insight_db::repositories::{JobRepo, RevokedTokenRepo, UserRepo};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &SqlitePool, email: &str, upload_limit: i64) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            full_name: Some("Test User".to_string()),
            upload_limit,
        },
    )
    .await
    .unwrap()
}

fn new_job(user_id: i64, job_id: &str) -> CreateJob {
    CreateJob {
        job_id: job_id.to_string(),
        user_id,
        filename: "sales.csv".to_string(),
        file_size: 42,
        file_sha256: "ab".repeat(32),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_create_and_find_user(pool: SqlitePool) {
    let user = new_user(&pool, "alice@example.com", 10).await;
    assert!(user.is_active);
    assert!(!user.is_superuser);
    assert_eq!(user.upload_count, 0);
    assert_eq!(user.upload_limit, 10);
    assert!(user.last_login_at.is_none());

    let by_email = UserRepo::find_by_email(&pool, "alice@example.com")
        .await
        .unwrap()
        .expect("user by email");
    assert_eq!(by_email.id, user.id);

    let by_id = UserRepo::find_by_id(&pool, user.id).await.unwrap();
    assert!(by_id.is_some());
    assert!(UserRepo::find_by_email(&pool, "bob@example.com")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_email_is_unique_violation(pool: SqlitePool) {
    new_user(&pool, "dup@example.com", 10).await;
    let err = UserRepo::create(
        &pool,
        &CreateUser {
            email: "dup@example.com".to_string(),
            password_hash: "x".to_string(),
            full_name: None,
            upload_limit: 10,
        },
    )
    .await
    .unwrap_err();

    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_and_deactivate(pool: SqlitePool) {
    let user = new_user(&pool, "carol@example.com", 10).await;
    UserRepo::record_successful_login(&pool, user.id).await.unwrap();
    assert!(UserRepo::set_active(&pool, user.id, false).await.unwrap());

    let reloaded = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(reloaded.last_login_at.is_some());
    assert!(!reloaded.is_active);
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_create_job_consumes_quota(pool: SqlitePool) {
    let user = new_user(&pool, "quota@example.com", 2).await;

    let job = JobRepo::create_with_quota_increment(&pool, &new_job(user.id, "20240101000000_aaaaaaaa"))
        .await
        .unwrap()
        .expect("first upload fits the quota");
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.progress, 0);
    assert!(job.started_at.is_none());

    JobRepo::create_with_quota_increment(&pool, &new_job(user.id, "20240101000000_bbbbbbbb"))
        .await
        .unwrap()
        .expect("second upload fits the quota");

    let third = JobRepo::create_with_quota_increment(&pool, &new_job(user.id, "20240101000000_cccccccc"))
        .await
        .unwrap();
    assert!(third.is_none());

    let reloaded = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.upload_count, 2);
    assert!(!reloaded.has_upload_quota());
    assert_eq!(JobRepo::count_by_user(&pool, user.id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_jobs_newest_first_with_paging(pool: SqlitePool) {
    let user = new_user(&pool, "list@example.com", 10).await;
    let other = new_user(&pool, "other@example.com", 10).await;
    for suffix in ["00000001", "00000002", "00000003"] {
        JobRepo::create_with_quota_increment(&pool, &new_job(user.id, &format!("20240101000000_{suffix}")))
            .await
            .unwrap()
            .unwrap();
    }
    JobRepo::create_with_quota_increment(&pool, &new_job(other.id, "20240101000000_00000009"))
        .await
        .unwrap()
        .unwrap();

    let page = JobRepo::list_by_user(&pool, user.id, 2, 0).await.unwrap();
    let ids: Vec<&str> = page.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec!["20240101000000_00000003", "20240101000000_00000002"]);

    let rest = JobRepo::list_by_user(&pool, user.id, 2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(JobRepo::count_by_user(&pool, user.id).await.unwrap(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_job_lifecycle(pool: SqlitePool) {
    let user = new_user(&pool, "life@example.com", 10).await;
    let job_id = "20240101000000_deadbeef";
    JobRepo::create_with_quota_increment(&pool, &new_job(user.id, job_id))
        .await
        .unwrap()
        .unwrap();

    // Complete is rejected until the job is running.
    let early = JobRepo::complete(
        &pool,
        job_id,
        &JobCompletion {
            rows_count: 1,
            quality_score: 100,
        },
    )
    .await
    .unwrap();
    assert!(!early);

    let running = JobRepo::mark_processing(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(running.status, JobStatus::Processing);
    assert!(running.started_at.is_some());

    // A running job cannot be started twice.
    assert!(JobRepo::mark_processing(&pool, job_id).await.unwrap().is_none());

    JobRepo::update_progress(&pool, job_id, 50).await.unwrap();
    let done = JobRepo::complete(
        &pool,
        job_id,
        &JobCompletion {
            rows_count: 120,
            quality_score: 97,
        },
    )
    .await
    .unwrap();
    assert!(done);

    let job = JobRepo::find_by_job_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.progress, 100);
    assert_eq!(job.rows_count, Some(120));
    assert_eq!(job.quality_score, Some(97));
    assert!(job.completed_at.is_some());
    assert!(job.processing_time.unwrap() >= 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failed_job_can_restart(pool: SqlitePool) {
    let user = new_user(&pool, "fail@example.com", 10).await;
    let job_id = "20240101000000_0badf00d";
    JobRepo::create_with_quota_increment(&pool, &new_job(user.id, job_id))
        .await
        .unwrap()
        .unwrap();

    JobRepo::mark_processing(&pool, job_id).await.unwrap().unwrap();
    assert!(JobRepo::fail(&pool, job_id, "File is empty").await.unwrap());

    let failed = JobRepo::find_by_job_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("File is empty"));
    assert!(failed.completed_at.is_some());

    let restarted = JobRepo::mark_processing(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(restarted.status, JobStatus::Processing);
    assert!(restarted.error_message.is_none());
    assert!(restarted.completed_at.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_requeue_interrupted_jobs(pool: SqlitePool) {
    let user = new_user(&pool, "crash@example.com", 10).await;
    let job_id = "20240101000000_c0ffee00";
    JobRepo::create_with_quota_increment(&pool, &new_job(user.id, job_id))
        .await
        .unwrap()
        .unwrap();
    JobRepo::mark_processing(&pool, job_id).await.unwrap().unwrap();

    assert_eq!(JobRepo::requeue_processing(&pool).await.unwrap(), 1);
    let job = JobRepo::find_by_job_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_user_cascades_to_jobs(pool: SqlitePool) {
    let user = new_user(&pool, "cascade@example.com", 10).await;
    let job = JobRepo::create_with_quota_increment(&pool, &new_job(user.id, "20240101000000_12345678"))
        .await
        .unwrap()
        .unwrap();

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(JobRepo::find_by_job_id(&pool, &job.job_id).await.unwrap().is_none());
    assert!(!JobRepo::delete(&pool, job.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Revoked tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_revoke_and_sweep_tokens(pool: SqlitePool) {
    let user = new_user(&pool, "tokens@example.com", 10).await;
    let now = Utc::now();

    RevokedTokenRepo::revoke(&pool, "live", user.id, now + Duration::hours(1))
        .await
        .unwrap();
    RevokedTokenRepo::revoke(&pool, "stale", user.id, now - Duration::hours(1))
        .await
        .unwrap();
    // Idempotent.
    RevokedTokenRepo::revoke(&pool, "live", user.id, now + Duration::hours(1))
        .await
        .unwrap();

    assert!(RevokedTokenRepo::is_revoked(&pool, "live").await.unwrap());
    assert!(!RevokedTokenRepo::is_revoked(&pool, "unknown").await.unwrap());

    assert_eq!(RevokedTokenRepo::delete_expired(&pool, now).await.unwrap(), 1);
    assert!(RevokedTokenRepo::is_revoked(&pool, "live").await.unwrap());
    assert!(!RevokedTokenRepo::is_revoked(&pool, "stale").await.unwrap());
}
