//! Error types for session operations

/// Coarse error category, used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    /// Redirect URI outside the allow-list. Reported to clients as a bad
    /// request but kept separate so audit logs can tell the two apart.
    Forbidden,
    NotFound,
    Internal,
}

/// Errors from session operations.
///
/// The `&'static str` payloads are stable, client-visible reasons. `Internal`
/// carries a detail message that is logged but never returned to callers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::BadRequest(_) => ErrorKind::BadRequest,
            AuthError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Client-safe reason string.
    pub fn reason(&self) -> &str {
        match self {
            AuthError::BadRequest(reason)
            | AuthError::Unauthorized(reason)
            | AuthError::Forbidden(reason)
            | AuthError::NotFound(reason) => reason,
            AuthError::Internal(_) => "internal error",
        }
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, AuthError>;
