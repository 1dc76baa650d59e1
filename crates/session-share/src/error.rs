//! Share registry errors

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("share not found")]
    NotFound,

    #[error("share expired")]
    Expired,

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Backend failure; the detail is for logs only
    #[error("share storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ShareError>;
