//! Request extractors shared by handlers.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`json::ValidatedJson`] -- JSON body that is deserialised and validated.

pub mod auth;
pub mod json;
