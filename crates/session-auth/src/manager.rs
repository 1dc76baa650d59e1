//! OAuth session manager
//!
//! Owns the session store. All foreground operations and the background sweep
//! go through one async mutex; no provider call is ever made while it is held.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::redact;
use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::pkce::random_token;
use crate::provider::{AuthorizationRequest, OAuthProvider};
use crate::redirect::RedirectPolicy;
use crate::request::session_id_from_request;
use crate::session::{OAuthSession, SessionDescriptor, UserContext};

/// Lifetime of a new or refreshed session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on a single identity provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Random bytes in a session id (43 URL-safe characters once encoded).
const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub provider_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// Issues, validates, refreshes and revokes bearer sessions.
pub struct OAuthSessionManager {
    provider: Arc<dyn OAuthProvider>,
    redirect_policy: RedirectPolicy,
    ttl: TimeDelta,
    provider_timeout: Duration,
    sessions: Mutex<HashMap<String, OAuthSession>>,
}

impl OAuthSessionManager {
    pub fn new(
        provider: Arc<dyn OAuthProvider>,
        redirect_policy: RedirectPolicy,
        settings: SessionSettings,
    ) -> Self {
        Self {
            provider,
            redirect_policy,
            ttl: TimeDelta::from_std(settings.ttl).unwrap_or(TimeDelta::MAX),
            provider_timeout: settings.provider_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn redirect_policy(&self) -> &RedirectPolicy {
        &self.redirect_policy
    }

    fn deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Start a login: check the redirect URI, then ask the provider for an
    /// authorization URL and state.
    pub async fn initiate_login(&self, redirect_uri: &str) -> Result<AuthorizationRequest> {
        self.redirect_policy.check(redirect_uri)?;

        let request = tokio::time::timeout(
            self.provider_timeout,
            self.provider.authorization_url(redirect_uri),
        )
        .await
        .map_err(|_| AuthError::Internal("authorization URL request timed out".into()))?
        .map_err(|e| AuthError::Internal(e.to_string()))?;

        metrics::counter!("auth_logins_total", "result" => "initiated").increment(1);
        info!(provider = self.provider.id(), redirect_uri, "login initiated");
        Ok(request)
    }

    /// Finish a login: exchange code and state for an identity and open a
    /// session for it.
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<SessionDescriptor> {
        if code.is_empty() || state.is_empty() {
            return Err(AuthError::BadRequest("missing code or state"));
        }

        let exchanged = tokio::time::timeout(
            self.provider_timeout,
            self.provider.exchange_code(code, state),
        )
        .await;

        let user = match exchanged {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => {
                metrics::counter!("auth_logins_total", "result" => "failed").increment(1);
                warn!(provider = self.provider.id(), error = %e, "code exchange failed");
                return Err(AuthError::Unauthorized("code exchange failed"));
            }
            Err(_) => {
                metrics::counter!("auth_logins_total", "result" => "failed").increment(1);
                warn!(
                    provider = self.provider.id(),
                    timeout_secs = self.provider_timeout.as_secs(),
                    "code exchange timed out"
                );
                return Err(AuthError::Unauthorized("code exchange failed"));
            }
        };

        let now = Utc::now();
        let session = OAuthSession {
            id: random_token(SESSION_ID_BYTES),
            user,
            created_at: now,
            expires_at: self.deadline_from(now),
        };
        let descriptor = session.descriptor();

        let active = {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(session.id.clone(), session);
            sessions.len()
        };

        metrics::counter!("auth_logins_total", "result" => "completed").increment(1);
        metrics::gauge!("auth_sessions_active").set(active as f64);
        info!(
            session = %redact(&descriptor.session_id),
            user = %descriptor.user.login,
            expires_at = %descriptor.expires_at,
            "session created"
        );
        Ok(descriptor)
    }

    /// End a session and revoke its upstream token.
    ///
    /// Revocation is best-effort: its failure or timeout is logged and the
    /// logout still succeeds, since the session is already gone.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        if session_id.is_empty() {
            return Err(AuthError::BadRequest("missing session id"));
        }

        let (session, active) = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .remove(session_id)
                .ok_or(AuthError::NotFound("session not found"))?;
            (session, sessions.len())
        };

        metrics::counter!("auth_logouts_total").increment(1);
        metrics::gauge!("auth_sessions_active").set(active as f64);
        info!(session = %redact(session_id), user = %session.user.login, "session logged out");

        let upstream = session.user.access_token.expose();
        if upstream.is_empty() {
            return Ok(());
        }
        match tokio::time::timeout(self.provider_timeout, self.provider.revoke_token(upstream)).await
        {
            Ok(Ok(())) => debug!(session = %redact(session_id), "upstream token revoked"),
            Ok(Err(e)) => warn!(session = %redact(session_id), error = %e, "token revocation failed"),
            Err(_) => warn!(session = %redact(session_id), "token revocation timed out"),
        }
        Ok(())
    }

    /// Push a live session's expiry out to `now + ttl`.
    pub async fn refresh(&self, session_id: &str) -> Result<SessionDescriptor> {
        if session_id.is_empty() {
            return Err(AuthError::BadRequest("missing session id"));
        }

        let now = Utc::now();
        let deadline = self.deadline_from(now);
        let mut sessions = self.sessions.lock().await;
        match sessions.entry(session_id.to_string()) {
            Entry::Vacant(_) => Err(AuthError::NotFound("session not found")),
            Entry::Occupied(entry) if entry.get().is_expired_at(now) => {
                entry.remove();
                metrics::gauge!("auth_sessions_active").set(sessions.len() as f64);
                debug!(session = %redact(session_id), "refresh of expired session");
                Err(AuthError::Unauthorized("session expired"))
            }
            Entry::Occupied(mut entry) => {
                let session = entry.get_mut();
                session.extend_to(deadline);
                debug!(session = %redact(session_id), expires_at = %session.expires_at, "session refreshed");
                Ok(session.descriptor())
            }
        }
    }

    /// Resolve the session id on a request and return its user.
    pub async fn validate(&self, headers: &HeaderMap, query: Option<&str>) -> Result<UserContext> {
        let Some(session_id) = session_id_from_request(headers, query) else {
            metrics::counter!("auth_validations_total", "result" => "missing").increment(1);
            return Err(AuthError::Unauthorized("no session id"));
        };
        self.validate_session(&session_id).await
    }

    /// Look up a session by id. Expired sessions are deleted on sight.
    pub async fn validate_session(&self, session_id: &str) -> Result<UserContext> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            None => {
                metrics::counter!("auth_validations_total", "result" => "not_found").increment(1);
                return Err(AuthError::Unauthorized("session not found"));
            }
            Some(session) if !session.is_expired_at(now) => {
                metrics::counter!("auth_validations_total", "result" => "ok").increment(1);
                return Ok(session.user.clone());
            }
            Some(_) => {}
        }

        sessions.remove(session_id);
        metrics::gauge!("auth_sessions_active").set(sessions.len() as f64);
        metrics::counter!("auth_validations_total", "result" => "expired").increment(1);
        debug!(session = %redact(session_id), "expired session removed on validation");
        Err(AuthError::Unauthorized("session expired"))
    }

    /// Delete every session whose expiry has passed. Returns how many went.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        let removed = before - sessions.len();

        if removed > 0 {
            metrics::counter!("auth_sessions_swept_total").increment(removed as u64);
            metrics::gauge!("auth_sessions_active").set(sessions.len() as f64);
            info!(removed, remaining = sessions.len(), "swept expired sessions");
        }
        removed
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn force_expiry(&self, session_id: &str, expires_at: DateTime<Utc>) {
        if let Some(session) = self.sessions.lock().await.get_mut(session_id) {
            session.expires_at = expires_at;
        }
    }
}
