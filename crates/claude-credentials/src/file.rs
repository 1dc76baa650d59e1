//! Credentials file provider
//!
//! Reads `<home>/.claude/.credentials.json`. For a named user the home
//! directory comes from a [`UserHomeResolver`]; for the empty user id it is
//! the home of the process owner.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::chain::{CredentialProvider, LoadFuture};
use crate::credentials::{ClaudeCredentials, CredentialsFile};
use crate::error::{Error, Result};

/// Location of the credentials file relative to a home directory.
pub const CREDENTIALS_RELATIVE_PATH: &str = ".claude/.credentials.json";

/// Maps a platform user id to the home directory its sessions run under.
pub trait UserHomeResolver: Send + Sync {
    fn home_dir(&self, user_id: &str) -> Result<PathBuf>;
}

/// Resolves user homes as `<root>/<user_id>`.
///
/// User ids are restricted to a conservative character set so that a crafted
/// id cannot point outside `root`.
#[derive(Debug, Clone)]
pub struct BaseDirHomeResolver {
    root: PathBuf,
}

impl BaseDirHomeResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl UserHomeResolver for BaseDirHomeResolver {
    fn home_dir(&self, user_id: &str) -> Result<PathBuf> {
        let valid = !user_id.is_empty()
            && user_id != "."
            && user_id != ".."
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
        if !valid {
            return Err(Error::HomeDir(format!("invalid user id {user_id:?}")));
        }
        Ok(self.root.join(user_id))
    }
}

/// Loads credentials from the per-user credentials file.
///
/// A missing file is not an error (`Ok(None)`). A file that is not valid JSON
/// is an error. Valid JSON without an access token is `Ok(None)`. The file
/// text is kept as the credentials' raw payload so the session bootstrap can
/// write it back without dropping fields this crate does not model.
pub struct FileCredentialProvider {
    resolver: Arc<dyn UserHomeResolver>,
    default_home: Option<PathBuf>,
}

impl FileCredentialProvider {
    pub fn new(resolver: Arc<dyn UserHomeResolver>) -> Self {
        Self {
            resolver,
            default_home: None,
        }
    }

    /// Override the home used for the empty user id (defaults to the
    /// process owner's home directory).
    pub fn with_default_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.default_home = Some(home.into());
        self
    }

    /// Path of the credentials file for `user_id`.
    pub fn credentials_path(&self, user_id: &str) -> Result<PathBuf> {
        let home = if user_id.is_empty() {
            match &self.default_home {
                Some(home) => home.clone(),
                None => dirs::home_dir()
                    .ok_or_else(|| Error::HomeDir("no home directory for current user".into()))?,
            }
        } else {
            self.resolver.home_dir(user_id)?
        };
        Ok(home.join(CREDENTIALS_RELATIVE_PATH))
    }
}

impl CredentialProvider for FileCredentialProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn load<'a>(&'a self, user_id: &'a str) -> LoadFuture<'a> {
        Box::pin(async move {
            let path = self.credentials_path(user_id)?;
            read_credentials_file(&path).await
        })
    }
}

async fn read_credentials_file(path: &Path) -> Result<Option<ClaudeCredentials>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "credentials file not found");
            return Ok(None);
        }
        Err(e) => {
            return Err(Error::Io(format!(
                "reading credentials file {}: {e}",
                path.display()
            )));
        }
    };

    let file: CredentialsFile = serde_json::from_str(&contents).map_err(|e| {
        Error::CredentialParse(format!("parsing credentials file {}: {e}", path.display()))
    })?;

    match file.into_credentials() {
        Some(credentials) => {
            debug!(path = %path.display(), "loaded credentials file");
            Ok(Some(credentials.with_raw_json(contents)))
        }
        None => {
            debug!(path = %path.display(), "credentials file has no access token");
            Ok(None)
        }
    }
}
