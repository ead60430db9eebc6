//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers delegate persistence to the repositories in `insight_db` and
//! map errors via [`AppError`](crate::error::AppError).

pub mod auth;
pub mod jobs;
pub mod processing;
pub mod upload;
