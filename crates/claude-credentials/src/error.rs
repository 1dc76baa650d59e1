//! Error types for credential resolution

/// Errors from credential providers.
///
/// A provider that simply has nothing to offer returns `Ok(None)`; these
/// variants mean a source was present but could not be used.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("home directory unavailable: {0}")]
    HomeDir(String),
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
