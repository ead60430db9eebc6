//! Upload processing worker.
//!
//! Handlers enqueue job ids on a bounded channel; a single worker task
//! drains it and runs the profiling pipeline for each job. Table work is
//! CPU-bound and runs on the blocking thread pool.

use std::path::PathBuf;

use insight_core::profiling::{profile_file, ProfileOptions};
use insight_core::upload::{extension_of, FileKind};
use insight_db::models::job::JobCompletion;
use insight_db::repositories::JobRepo;
use insight_db::DbPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::storage;

/// Capacity of the processing queue.
pub const QUEUE_CAPACITY: usize = 256;

/// Progress reported once a job has been picked up.
const PROGRESS_STARTED: i64 = 10;

/// Sending half of the processing queue, shared through `AppState`.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<String>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a job for processing without waiting.
    ///
    /// Returns `false` when the queue is full or the worker has stopped; the
    /// job then stays `queued` and can be restarted later.
    pub fn enqueue(&self, job_id: &str) -> bool {
        match self.tx.try_send(job_id.to_string()) {
            Ok(()) => {
                tracing::debug!(job_id, "Job queued for processing");
                true
            }
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Failed to queue job for processing");
                false
            }
        }
    }
}

/// Everything the worker needs to process a job.
#[derive(Debug, Clone)]
pub struct Processor {
    pool: DbPool,
    upload_dir: PathBuf,
    options: ProfileOptions,
}

impl Processor {
    pub fn new(pool: DbPool, config: &ServerConfig) -> Self {
        Self {
            pool,
            upload_dir: config.upload.upload_dir.clone(),
            options: ProfileOptions {
                max_rows: config.upload.max_rows,
            },
        }
    }

    /// Process one job end to end.
    ///
    /// Jobs that are not `queued` or `failed` are skipped. Pipeline errors
    /// are recorded on the job, never returned.
    pub async fn process(&self, job_id: &str) {
        let job = match JobRepo::mark_processing(&self.pool, job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::debug!(job_id, "Job not startable, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to start job");
                return;
            }
        };

        tracing::info!(job_id, filename = %job.filename, "Processing started");

        if let Err(e) = JobRepo::update_progress(&self.pool, job_id, PROGRESS_STARTED).await {
            tracing::warn!(job_id, error = %e, "Failed to update progress");
        }

        let dir = storage::job_dir(&self.upload_dir, job_id);
        let path = storage::upload_path(&self.upload_dir, job_id, &job.filename);
        let kind = extension_of(&job.filename).and_then(|ext| FileKind::from_extension(&ext));
        let options = self.options;

        let outcome = tokio::task::spawn_blocking(move || {
            let kind = kind.ok_or_else(|| "Unsupported file type".to_string())?;
            let outcome = profile_file(&path, kind, &options).map_err(|e| e.to_string())?;
            outcome.write_artifacts(&dir).map_err(|e| e.to_string())?;
            Ok::<_, String>(outcome)
        })
        .await
        .unwrap_or_else(|e| Err(format!("Processing task aborted: {e}")));

        match outcome {
            Ok(outcome) => {
                let completion = JobCompletion {
                    rows_count: outcome.table.row_count() as i64,
                    quality_score: outcome.quality_score(),
                };
                match JobRepo::complete(&self.pool, job_id, &completion).await {
                    Ok(_) => tracing::info!(
                        job_id,
                        rows = completion.rows_count,
                        quality_score = completion.quality_score,
                        "Processing complete"
                    ),
                    Err(e) => tracing::error!(job_id, error = %e, "Failed to record completion"),
                }
            }
            Err(message) => {
                tracing::warn!(job_id, error = %message, "Processing failed");
                if let Err(e) = JobRepo::fail(&self.pool, job_id, &message).await {
                    tracing::error!(job_id, error = %e, "Failed to record failure");
                }
            }
        }
    }
}

/// Run the processing worker until `cancel` fires or every sender is gone.
///
/// A job that is already running when cancellation arrives is finished first.
pub async fn run(processor: Processor, mut rx: mpsc::Receiver<String>, cancel: CancellationToken) {
    tracing::info!(capacity = QUEUE_CAPACITY, "Processing worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Processing worker stopping");
                break;
            }
            next = rx.recv() => match next {
                Some(job_id) => processor.process(&job_id).await,
                None => {
                    tracing::info!("Processing queue closed");
                    break;
                }
            }
        }
    }
}
