#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed request payload (bad email, short password, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A well-formed request that the domain rejects (bad upload, duplicate email).
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A per-user quota has been used up.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// A temporary condition; the client may retry the same request.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
