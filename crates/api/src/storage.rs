//! On-disk layout of job files.
//!
//! ```text
//! {UPLOAD_DIR}/{job_id}/{original filename}
//! {UPLOAD_DIR}/{job_id}/cleaned_data.csv
//! {UPLOAD_DIR}/{job_id}/cleaning_log.txt
//! {UPLOAD_DIR}/{job_id}/profile.json
//! ```

use std::io;
use std::path::{Path, PathBuf};

use insight_core::error::CoreError;

/// Directory holding every file that belongs to `job_id`.
pub fn job_dir(upload_dir: &Path, job_id: &str) -> PathBuf {
    upload_dir.join(job_id)
}

/// Path of the original upload of a job.
pub fn upload_path(upload_dir: &Path, job_id: &str, filename: &str) -> PathBuf {
    job_dir(upload_dir, job_id).join(filename)
}

/// Resolve a client-supplied download name inside a job directory.
///
/// Only plain file names are accepted; anything that could escape the job
/// directory is rejected.
pub fn download_path(upload_dir: &Path, job_id: &str, filename: &str) -> Result<PathBuf, CoreError> {
    let invalid = filename.is_empty()
        || filename.contains(['/', '\\', '\0'])
        || filename == "."
        || filename.contains("..");
    if invalid {
        return Err(CoreError::BadRequest("Invalid filename".into()));
    }
    Ok(job_dir(upload_dir, job_id).join(filename))
}

/// `Content-Disposition` value for downloading `filename` as an attachment.
///
/// Characters outside `[A-Za-z0-9._ -]` become `_` so the quoted name is
/// always a valid header value.
pub fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// Store an upload, creating the job directory.
pub async fn save_upload(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await
}

/// Remove a job directory and everything in it. A missing directory is fine.
pub async fn remove_job_dir(upload_dir: &Path, job_id: &str) -> io::Result<()> {
    match tokio::fs::remove_dir_all(job_dir(upload_dir, job_id)).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
