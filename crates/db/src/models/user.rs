//! User entity model and DTOs.

use insight_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub upload_count: i64,
    pub upload_limit: i64,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn has_upload_quota(&self) -> bool {
        self.upload_count < self.upload_limit
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = i64)]
    pub id: DbId,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub upload_count: i64,
    pub upload_limit: i64,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_login_at: Option<Timestamp>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            upload_count: user.upload_count,
            upload_limit: user.upload_limit,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user. The email is expected to be normalised.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub upload_limit: i64,
}
