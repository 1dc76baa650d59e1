//! Environment variable provider

use tracing::debug;

use crate::chain::{CredentialProvider, LoadFuture};
use crate::credentials::ClaudeCredentials;

/// Access token variable. Its absence means "no credentials here".
pub const ACCESS_TOKEN_VAR: &str = "CLAUDE_ACCESS_TOKEN";
pub const REFRESH_TOKEN_VAR: &str = "CLAUDE_REFRESH_TOKEN";
/// Expiry as epoch milliseconds, passed through as a string.
pub const EXPIRES_AT_VAR: &str = "CLAUDE_TOKEN_EXPIRES_AT";

/// Reads credentials from process environment variables.
///
/// Applies to the whole process, so the user id is ignored. Refresh token
/// and expiry are optional and come back as empty strings when unset.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    access_var: String,
    refresh_var: String,
    expires_var: String,
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::with_vars(ACCESS_TOKEN_VAR, REFRESH_TOKEN_VAR, EXPIRES_AT_VAR)
    }
}

impl EnvCredentialProvider {
    /// Read from custom variable names.
    pub fn with_vars(access: &str, refresh: &str, expires: &str) -> Self {
        Self {
            access_var: access.to_string(),
            refresh_var: refresh.to_string(),
            expires_var: expires.to_string(),
        }
    }

    fn read(&self) -> Option<ClaudeCredentials> {
        let access = std::env::var(&self.access_var).unwrap_or_default();
        if access.is_empty() {
            return None;
        }
        let refresh = std::env::var(&self.refresh_var).unwrap_or_default();
        let expires = std::env::var(&self.expires_var).unwrap_or_default();
        Some(ClaudeCredentials::new(access, refresh, expires))
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> &str {
        "env"
    }

    fn load<'a>(&'a self, _user_id: &'a str) -> LoadFuture<'a> {
        let credentials = self.read();
        if credentials.is_none() {
            debug!(var = %self.access_var, "access token variable not set");
        }
        Box::pin(async move { Ok(credentials) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn test_provider(prefix: &str) -> EnvCredentialProvider {
        EnvCredentialProvider::with_vars(
            &format!("{prefix}_ACCESS"),
            &format!("{prefix}_REFRESH"),
            &format!("{prefix}_EXPIRES"),
        )
    }

    #[tokio::test]
    async fn unset_access_token_returns_none() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CCENV_UNSET_ACCESS") };
        unsafe { set_env("CCENV_UNSET_REFRESH", "rt_orphan") };

        let provider = test_provider("CCENV_UNSET");
        assert!(provider.load("alice").await.unwrap().is_none());

        unsafe { remove_env("CCENV_UNSET_REFRESH") };
    }

    #[tokio::test]
    async fn empty_access_token_returns_none() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CCENV_EMPTY_ACCESS", "") };

        let provider = test_provider("CCENV_EMPTY");
        assert!(provider.load("").await.unwrap().is_none());

        unsafe { remove_env("CCENV_EMPTY_ACCESS") };
    }

    #[tokio::test]
    async fn returns_all_three_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CCENV_FULL_ACCESS", "at_env") };
        unsafe { set_env("CCENV_FULL_REFRESH", "rt_env") };
        unsafe { set_env("CCENV_FULL_EXPIRES", "1735500000000") };

        let provider = test_provider("CCENV_FULL");
        let creds = provider.load("ignored").await.unwrap().unwrap();
        assert_eq!(creds.access_token(), "at_env");
        assert_eq!(creds.refresh_token(), "rt_env");
        assert_eq!(creds.expires_at(), "1735500000000");
        assert!(creds.raw_json().is_none());

        unsafe { remove_env("CCENV_FULL_ACCESS") };
        unsafe { remove_env("CCENV_FULL_REFRESH") };
        unsafe { remove_env("CCENV_FULL_EXPIRES") };
    }

    #[tokio::test]
    async fn optional_values_default_to_empty() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CCENV_PARTIAL_ACCESS", "at_only") };
        unsafe { remove_env("CCENV_PARTIAL_REFRESH") };
        unsafe { remove_env("CCENV_PARTIAL_EXPIRES") };

        let provider = test_provider("CCENV_PARTIAL");
        let creds = provider.load("").await.unwrap().unwrap();
        assert_eq!(creds.access_token(), "at_only");
        assert_eq!(creds.refresh_token(), "");
        assert_eq!(creds.expires_at(), "");

        unsafe { remove_env("CCENV_PARTIAL_ACCESS") };
    }

    #[test]
    fn default_uses_well_known_names() {
        let provider = EnvCredentialProvider::default();
        assert_eq!(provider.access_var, ACCESS_TOKEN_VAR);
        assert_eq!(provider.refresh_var, REFRESH_TOKEN_VAR);
        assert_eq!(provider.expires_var, EXPIRES_AT_VAR);
    }
}
