//! Periodic cleanup of the revoked-token denylist.
//!
//! Revoked tokens only need to be remembered until they would have expired
//! on their own; after that signature validation rejects them anyway.

use std::time::Duration;

use chrono::Utc;
use insight_db::repositories::RevokedTokenRepo;
use insight_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    tracing::info!(interval_secs = SWEEP_INTERVAL.as_secs(), "Token sweeper started");

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Token sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                match RevokedTokenRepo::delete_expired(&pool, Utc::now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Token sweeper: purged expired revocations");
                    }
                    Ok(_) => tracing::debug!("Token sweeper: nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Token sweeper: cleanup failed"),
                }
            }
        }
    }
}
