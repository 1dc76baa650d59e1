//! Claude OAuth credential value and on-disk file format
//!
//! The CLI stores its OAuth tokens as
//! `{"claudeAiOauth": {"accessToken", "refreshToken", "expiresAt"}}` where
//! `expiresAt` is a unix timestamp in milliseconds. Other keys (scopes,
//! subscription type) may be present and are preserved only through
//! `raw_json`.

use common::Secret;
use serde::Deserialize;

/// Resolved credentials for one user.
///
/// `expires_at` is kept as the string form of the epoch-millis value because
/// the environment source hands it over as a string and consumers forward it
/// without doing arithmetic. Use [`ClaudeCredentials::expires_at_millis`] when
/// a number is needed.
#[derive(Debug, Clone)]
pub struct ClaudeCredentials {
    access_token: Secret<String>,
    refresh_token: Secret<String>,
    expires_at: String,
    raw_json: Option<Secret<String>>,
}

impl ClaudeCredentials {
    pub fn new(access_token: String, refresh_token: String, expires_at: String) -> Self {
        Self {
            access_token: Secret::new(access_token),
            refresh_token: Secret::new(refresh_token),
            expires_at,
            raw_json: None,
        }
    }

    /// Attach the original source payload so it can be written back verbatim.
    pub fn with_raw_json(mut self, raw: String) -> Self {
        self.raw_json = Some(Secret::new(raw));
        self
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose()
    }

    pub fn expires_at(&self) -> &str {
        &self.expires_at
    }

    pub fn raw_json(&self) -> Option<&str> {
        self.raw_json.as_ref().map(|raw| raw.expose().as_str())
    }

    /// Expiry as epoch milliseconds, if the stored string is a number.
    pub fn expires_at_millis(&self) -> Option<u64> {
        self.expires_at.trim().parse().ok()
    }

    /// Serialize for writing into a session's credentials file.
    ///
    /// Returns the raw source payload untouched when one was captured,
    /// otherwise the canonical `claudeAiOauth` document.
    pub fn to_json(&self) -> String {
        if let Some(raw) = self.raw_json() {
            return raw.to_string();
        }

        let mut oauth = serde_json::json!({
            "accessToken": self.access_token(),
            "refreshToken": self.refresh_token(),
        });
        if let Some(millis) = self.expires_at_millis() {
            oauth["expiresAt"] = serde_json::json!(millis);
        }
        serde_json::json!({ "claudeAiOauth": oauth }).to_string()
    }
}

/// Top-level shape of the credentials file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialsFile {
    #[serde(default)]
    pub claude_ai_oauth: Option<OAuthSection>,
}

/// The `claudeAiOauth` object. Missing fields default so that an absent
/// access token reads as "no credentials" instead of a parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OAuthSection {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl CredentialsFile {
    /// Convert into credentials, or `None` when no access token is present.
    pub(crate) fn into_credentials(self) -> Option<ClaudeCredentials> {
        let oauth = self.claude_ai_oauth?;
        if oauth.access_token.is_empty() {
            return None;
        }
        let expires_at = oauth
            .expires_at
            .map(|millis| millis.to_string())
            .unwrap_or_default();
        Some(ClaudeCredentials::new(
            oauth.access_token,
            oauth.refresh_token,
            expires_at,
        ))
    }
}
