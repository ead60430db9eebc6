//! Public job identifiers.
//!
//! Jobs are addressed in URLs and on disk by a sortable string id of the
//! form `YYYYMMDDHHMMSS_xxxxxxxx`: the UTC creation second followed by the
//! first eight hex digits of a v4 UUID.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Length of the timestamp prefix (`YYYYMMDDHHMMSS`).
const TIMESTAMP_LEN: usize = 14;

/// Length of the random suffix.
const SUFFIX_LEN: usize = 8;

/// Generate a job id stamped with the current time.
pub fn generate_job_id() -> String {
    generate_job_id_at(Utc::now())
}

/// Generate a job id stamped with `now`.
pub fn generate_job_id_at(now: DateTime<Utc>) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}", now.format("%Y%m%d%H%M%S"), &uuid[..SUFFIX_LEN])
}

/// Check that `id` has the shape produced by [`generate_job_id`].
///
/// Job ids become directory names, so anything else is rejected before it
/// reaches the filesystem.
pub fn is_valid_job_id(id: &str) -> bool {
    let Some((stamp, suffix)) = id.split_once('_') else {
        return false;
    };
    stamp.len() == TIMESTAMP_LEN
        && stamp.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == SUFFIX_LEN
        && suffix.bytes().all(|b| b.is_ascii_hexdigit())
}
