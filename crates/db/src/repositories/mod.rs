//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&SqlitePool` as the first argument.

pub mod job_repo;
pub mod revoked_token_repo;
pub mod user_repo;

pub use job_repo::JobRepo;
pub use revoked_token_repo::RevokedTokenRepo;
pub use user_repo::UserRepo;
