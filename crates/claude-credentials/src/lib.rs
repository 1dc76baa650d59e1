//! Model API credential resolution for agent sessions
//!
//! Locates the Claude OAuth credentials an agent session should run with.
//! Each source implements [`CredentialProvider`]; the [`ChainCredentialProvider`]
//! asks them in order and returns the first usable set.
//!
//! Resolution flow used by the session bootstrap:
//! 1. Build a chain, typically `[FileCredentialProvider, EnvCredentialProvider]`
//! 2. Call `load(user_id)` on the chain
//! 3. `Ok(Some(creds))` → write `creds.to_json()` into the session
//! 4. `Ok(None)` → no credentials anywhere, session runs without model access
//! 5. `Err(_)` → a source exists but is broken; surface it to the operator

pub mod chain;
pub mod credentials;
pub mod env;
pub mod error;
pub mod file;

pub use chain::{ChainCredentialProvider, CredentialProvider, LoadFuture};
pub use credentials::ClaudeCredentials;
pub use env::{
    ACCESS_TOKEN_VAR, EXPIRES_AT_VAR, EnvCredentialProvider, REFRESH_TOKEN_VAR,
};
pub use error::{Error, Result};
pub use file::{BaseDirHomeResolver, CREDENTIALS_RELATIVE_PATH, FileCredentialProvider, UserHomeResolver};
