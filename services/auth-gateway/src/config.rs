//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret comes from OAUTH_CLIENT_SECRET or
//! client_secret_file and is never read from the TOML directly.

use common::Secret;
use serde::Deserialize;
use session_auth::OAuthEndpoints;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CLIENT_SECRET_VAR: &str = "OAUTH_CLIENT_SECRET";
pub const ALLOWED_REDIRECTS_VAR: &str = "OAUTH_ALLOWED_REDIRECT_URIS";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub shares: SharesConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Identity provider registration
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    /// Provider name used in logs
    #[serde(default = "default_provider")]
    pub provider: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    #[serde(default)]
    pub orgs_url: Option<String>,
    #[serde(default)]
    pub teams_url: Option<String>,
    #[serde(default)]
    pub revoke_url: Option<String>,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub scopes: String,
    /// Exact-or-prefix redirect URI entries; empty means localhost only
    #[serde(default)]
    pub allowed_redirect_uris: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct SharesConfig {
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Lifetime applied when a share request names none; 0 = never expires
    #[serde(default)]
    pub default_ttl_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for SharesConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
            default_ttl_secs: 0,
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_provider() -> String {
    "github".into()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_session_ttl() -> u64 {
    86_400
}

fn default_sweep_interval() -> u64 {
    900
}

fn default_cleanup_interval() -> u64 {
    300
}

fn require_http_url(field: &str, value: &str) -> common::Result<()> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {value}"
        )));
    }
    Ok(())
}

fn require_non_zero(field: &str, value: u64) -> common::Result<()> {
    if value == 0 {
        return Err(common::Error::Config(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. OAUTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    ///
    /// OAUTH_ALLOWED_REDIRECT_URIS, when set, replaces `allowed_redirect_uris`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        let oauth = &config.oauth;
        require_http_url("authorize_url", &oauth.authorize_url)?;
        require_http_url("token_url", &oauth.token_url)?;
        require_http_url("userinfo_url", &oauth.userinfo_url)?;
        for (field, url) in [
            ("orgs_url", &oauth.orgs_url),
            ("teams_url", &oauth.teams_url),
            ("revoke_url", &oauth.revoke_url),
        ] {
            if let Some(url) = url {
                require_http_url(field, url)?;
            }
        }
        if oauth.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        require_non_zero("request_timeout_secs", oauth.request_timeout_secs)?;
        require_non_zero("ttl_secs", config.sessions.ttl_secs)?;
        require_non_zero("sweep_interval_secs", config.sessions.sweep_interval_secs)?;
        require_non_zero("cleanup_interval_secs", config.shares.cleanup_interval_secs)?;
        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var(CLIENT_SECRET_VAR) {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }
        if config.oauth.client_secret.as_ref().is_none_or(|s| s.is_empty()) {
            return Err(common::Error::Config(format!(
                "OAuth client secret missing: set {CLIENT_SECRET_VAR} or client_secret_file"
            )));
        }

        if let Ok(list) = std::env::var(ALLOWED_REDIRECTS_VAR) {
            config.oauth.allowed_redirect_uris = list
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("auth-gateway.toml")
    }
}

impl OAuthConfig {
    pub fn endpoints(&self) -> OAuthEndpoints {
        OAuthEndpoints {
            authorize_url: self.authorize_url.clone(),
            token_url: self.token_url.clone(),
            userinfo_url: self.userinfo_url.clone(),
            orgs_url: self.orgs_url.clone(),
            teams_url: self.teams_url.clone(),
            revoke_url: self.revoke_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self
                .client_secret
                .clone()
                .unwrap_or_else(|| Secret::new(String::new())),
            scopes: self.scopes.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl SharesConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_secs > 0).then(|| Duration::from_secs(self.default_ttl_secs))
    }
}
