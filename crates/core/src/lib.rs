//! Domain layer for the insight engine.
//!
//! Holds everything that does not need HTTP or a database connection:
//! shared id/timestamp types, the [`error::CoreError`] taxonomy, upload
//! validation, public job identifiers, and the table profiling pipeline.

pub mod error;
pub mod job_id;
pub mod profiling;
pub mod types;
pub mod upload;
