//! Authorization-code + PKCE provider for GitHub-style identity providers
//!
//! Flow:
//! 1. `authorization_url()` generates a PKCE verifier and a random state,
//!    remembers them (with the redirect URI) and returns the authorize URL
//! 2. `exchange_code()` consumes the pending state, posts the code and
//!    verifier to the token endpoint, then reads the user profile and,
//!    when configured, org and team memberships
//! 3. `revoke_token()` posts the upstream token to the RFC 7009 revocation
//!    endpoint, if one is configured
//!
//! Pending states live for 10 minutes and are single-use. Expired entries are
//! pruned lazily whenever a new flow starts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::Secret;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::pkce::{compute_challenge, generate_state, generate_verifier};
use crate::provider::{AuthorizationRequest, OAuthProvider, ProviderError, ProviderFuture};
use crate::session::UserContext;

/// Maximum age of a pending state before the callback is refused.
const STATE_EXPIRY: Duration = Duration::from_secs(600);

const CLIENT_USER_AGENT: &str = concat!("agent-auth-gateway/", env!("CARGO_PKG_VERSION"));

/// Identity provider endpoints and client registration.
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub orgs_url: Option<String>,
    pub teams_url: Option<String>,
    pub revoke_url: Option<String>,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Space-separated scope list
    pub scopes: String,
}

struct PendingState {
    verifier: String,
    redirect_uri: String,
    created_at: Instant,
}

pub struct StandardOAuthProvider {
    id: String,
    endpoints: OAuthEndpoints,
    http: reqwest::Client,
    pending: Mutex<HashMap<String, PendingState>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    /// GitHub reports exchange failures as 200 with an `error` field
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct UserInfo {
    /// Numeric on GitHub, string elsewhere
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct OrgInfo {
    login: String,
}

#[derive(Deserialize)]
struct TeamInfo {
    slug: String,
    organization: OrgInfo,
}

impl UserInfo {
    fn user_id(&self) -> Option<String> {
        match &self.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => self.sub.clone().filter(|s| !s.is_empty()),
        }
    }
}

impl StandardOAuthProvider {
    pub fn new(id: impl Into<String>, endpoints: OAuthEndpoints, http: reqwest::Client) -> Self {
        Self {
            id: id.into(),
            endpoints,
            http,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Number of flows started but not yet completed or expired.
    pub async fn pending_flows(&self) -> usize {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, p| p.created_at.elapsed() < STATE_EXPIRY);
        pending.len()
    }

    fn build_authorize_url(
        &self,
        redirect_uri: &str,
        state: &str,
        challenge: &str,
    ) -> Result<String, ProviderError> {
        let url = Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", self.endpoints.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.endpoints.scopes.as_str()),
                ("state", state),
                ("code_challenge", challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| ProviderError::AuthorizationUrl(e.to_string()))?;
        Ok(url.into())
    }

    async fn take_pending(&self, state: &str) -> Result<PendingState, ProviderError> {
        let pending = self
            .pending
            .lock()
            .await
            .remove(state)
            .ok_or_else(|| ProviderError::InvalidState("unknown or already used state".into()))?;
        if pending.created_at.elapsed() > STATE_EXPIRY {
            return Err(ProviderError::InvalidState("state expired".into()));
        }
        Ok(pending)
    }

    async fn request_token(&self, code: &str, pending: &PendingState) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", pending.redirect_uri.as_str()),
                ("client_id", self.endpoints.client_id.as_str()),
                ("client_secret", self.endpoints.client_secret.expose().as_str()),
                ("code_verifier", pending.verifier.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Http(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(ProviderError::TokenExchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ProviderError::TokenExchange(format!("invalid token response: {e}")))?;
        if let Some(error) = token.error {
            let description = token.error_description.unwrap_or_default();
            return Err(ProviderError::TokenExchange(format!("{error}: {description}")));
        }
        if token.access_token.is_empty() {
            return Err(ProviderError::TokenExchange("response has no access_token".into()));
        }
        Ok(token.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::Http(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UserLookup(format!("{url} returned {status}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::UserLookup(format!("invalid response from {url}: {e}")))
    }

    async fn fetch_user(&self, access_token: String) -> Result<UserContext, ProviderError> {
        let info: UserInfo = self
            .get_json(&self.endpoints.userinfo_url, &access_token)
            .await?;
        let user_id = info
            .user_id()
            .ok_or_else(|| ProviderError::UserLookup("profile has no user id".into()))?;
        let login = info
            .login
            .or(info.preferred_username)
            .unwrap_or_else(|| user_id.clone());
        let name = info.name.unwrap_or_else(|| login.clone());

        // Membership lookups are best-effort: a failure leaves the list empty,
        // which only ever narrows what the user can reach.
        let orgs = match &self.endpoints.orgs_url {
            Some(url) => match self.get_json::<Vec<OrgInfo>>(url, &access_token).await {
                Ok(orgs) => orgs.into_iter().map(|o| o.login).collect(),
                Err(e) => {
                    warn!(provider = %self.id, user = %login, error = %e, "org lookup failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let teams = match &self.endpoints.teams_url {
            Some(url) => match self.get_json::<Vec<TeamInfo>>(url, &access_token).await {
                Ok(teams) => teams
                    .into_iter()
                    .map(|t| format!("{}/{}", t.organization.login, t.slug))
                    .collect(),
                Err(e) => {
                    warn!(provider = %self.id, user = %login, error = %e, "team lookup failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Ok(UserContext {
            user_id,
            login,
            name,
            access_token: Secret::new(access_token),
            orgs,
            teams,
        })
    }
}

impl OAuthProvider for StandardOAuthProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn authorization_url<'a>(&'a self, redirect_uri: &'a str) -> ProviderFuture<'a, AuthorizationRequest> {
        Box::pin(async move {
            let verifier = generate_verifier();
            let state = generate_state();
            let auth_url = self.build_authorize_url(redirect_uri, &state, &compute_challenge(&verifier))?;

            let mut pending = self.pending.lock().await;
            pending.retain(|_, p| p.created_at.elapsed() < STATE_EXPIRY);
            pending.insert(
                state.clone(),
                PendingState {
                    verifier,
                    redirect_uri: redirect_uri.to_string(),
                    created_at: Instant::now(),
                },
            );
            debug!(provider = %self.id, pending = pending.len(), "authorization flow started");

            Ok(AuthorizationRequest { auth_url, state })
        })
    }

    fn exchange_code<'a>(&'a self, code: &'a str, state: &'a str) -> ProviderFuture<'a, UserContext> {
        Box::pin(async move {
            let pending = self.take_pending(state).await?;
            let access_token = self.request_token(code, &pending).await?;
            let user = self.fetch_user(access_token).await?;
            info!(provider = %self.id, user = %user.login, orgs = user.orgs.len(), "identity resolved");
            Ok(user)
        })
    }

    fn revoke_token<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let Some(url) = &self.endpoints.revoke_url else {
                debug!(provider = %self.id, "no revocation endpoint configured");
                return Ok(());
            };

            let response = self
                .http
                .post(url)
                .basic_auth(&self.endpoints.client_id, Some(self.endpoints.client_secret.expose()))
                .header(USER_AGENT, CLIENT_USER_AGENT)
                .form(&[("token", access_token), ("token_type_hint", "access_token")])
                .send()
                .await
                .map_err(|e| ProviderError::Http(format!("revocation request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Revocation(format!(
                    "revocation endpoint returned {status}"
                )));
            }
            Ok(())
        })
    }
}
