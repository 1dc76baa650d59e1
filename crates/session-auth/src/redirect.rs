//! Redirect URI allow-list
//!
//! A login request names where the identity provider should send the user
//! back. Only URIs that equal or start with a configured entry are accepted;
//! without configuration only local development origins are.

use tracing::warn;
use url::Url;

use crate::error::{AuthError, Result};

/// Prefixes accepted when no allow-list is configured.
pub const DEFAULT_ALLOWED_PREFIXES: &[&str] = &[
    "http://localhost",
    "https://localhost",
    "http://127.0.0.1",
    "https://127.0.0.1",
];

#[derive(Debug, Clone, Default)]
pub struct RedirectPolicy {
    allowed: Vec<String>,
}

impl RedirectPolicy {
    /// Build a policy from explicit entries. Blank entries are dropped; an
    /// empty result falls back to the localhost defaults.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { allowed }
    }

    /// Parse the comma-separated `OAUTH_ALLOWED_REDIRECT_URIS` format.
    pub fn from_comma_separated(value: &str) -> Self {
        Self::new(value.split(','))
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Case-sensitive prefix match. An exact match is the degenerate prefix.
    pub fn is_allowed(&self, redirect_uri: &str) -> bool {
        if self.allowed.is_empty() {
            DEFAULT_ALLOWED_PREFIXES
                .iter()
                .any(|prefix| redirect_uri.starts_with(prefix))
        } else {
            self.allowed
                .iter()
                .any(|entry| redirect_uri.starts_with(entry.as_str()))
        }
    }

    /// Validate a redirect URI from a login request.
    ///
    /// Empty or non-absolute URIs are bad requests. Well-formed URIs outside
    /// the allow-list are `Forbidden` and logged; they are never rewritten.
    pub fn check(&self, redirect_uri: &str) -> Result<()> {
        if redirect_uri.is_empty() {
            return Err(AuthError::BadRequest("missing redirect_uri"));
        }

        let parsed =
            Url::parse(redirect_uri).map_err(|_| AuthError::BadRequest("invalid redirect_uri"))?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(AuthError::BadRequest("invalid redirect_uri"));
        }

        if !self.is_allowed(redirect_uri) {
            warn!(redirect_uri, "rejected redirect URI outside allow-list");
            return Err(AuthError::Forbidden("redirect_uri not allowed"));
        }
        Ok(())
    }
}
