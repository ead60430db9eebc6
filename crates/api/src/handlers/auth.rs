//! Handlers for the `/auth` resource (register, login, me, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use insight_core::error::CoreError;
use insight_db::models::user::{CreateUser, User, UserResponse};
use insight_db::repositories::{RevokedTokenRepo, UserRepo};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::json::ValidatedJson;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Incorrect email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 100, message = "Password must be 8-100 characters"))]
    pub password: String,
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    pub email: String,
    pub password: String,
}

/// Successful authentication response returned by register and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and return an access token for it.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Email already registered"),
        (status = 422, description = "Invalid email or password")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let email = normalize_email(&input.email);

    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create = CreateUser {
        email,
        password_hash,
        full_name: input
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        upload_limit: state.config.upload.default_upload_limit,
    };

    // A concurrent registration can still win the race to the unique index.
    let user = UserRepo::create(&state.pool, &create).await.map_err(|e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            email_taken()
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(token_response(&state, user)?)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Incorrect email or password"),
        (status = 403, description = "Inactive user")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())));
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden("Inactive user".into())));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let user = UserRepo::find_by_id(&state.pool, user.id).await?.unwrap_or(user);

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(token_response(&state, user)?))
}

/// GET /api/v1/auth/me
///
/// Return the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing, invalid or revoked token")
    )
)]
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User not found".into())))?;
    Ok(Json(user.into()))
}

/// POST /api/v1/auth/logout
///
/// Revoke the presented token. Returns 204 No Content.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing, invalid or revoked token")
    )
)]
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    RevokedTokenRepo::revoke(
        &state.pool,
        &auth_user.jti,
        auth_user.user_id,
        auth_user.expires_at,
    )
    .await?;
    tracing::info!(user_id = auth_user.user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip surrounding whitespace before validation sees the value.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_taken() -> AppError {
    AppError::Core(CoreError::BadRequest("Email already registered".into()))
}

fn token_response(state: &AppState, user: User) -> AppResult<TokenResponse> {
    let access_token = generate_access_token(user.id, &user.email, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.config.jwt.expires_in_secs(),
        user: user.into(),
    })
}
