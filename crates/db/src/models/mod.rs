//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where rows are inserted from the API, a create DTO.

pub mod job;
pub mod status;
pub mod user;
