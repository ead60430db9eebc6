//! Repository for the `revoked_tokens` denylist.

use chrono::Utc;
use insight_core::types::{DbId, Timestamp};
use sqlx::SqlitePool;

pub struct RevokedTokenRepo;

impl RevokedTokenRepo {
    /// Add a token id to the denylist. Revoking twice is a no-op.
    pub async fn revoke(
        pool: &SqlitePool,
        jti: &str,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, user_id, expires_at, revoked_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn is_revoked(pool: &SqlitePool, jti: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
            .bind(jti)
            .fetch_one(pool)
            .await
    }

    /// Remove entries whose token has expired. Returns the number deleted.
    pub async fn delete_expired(pool: &SqlitePool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE julianday(expires_at) <= julianday($1)")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
