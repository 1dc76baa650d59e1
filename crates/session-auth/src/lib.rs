//! OAuth login and bearer sessions for the agent gateway
//!
//! Converts a third-party identity into a short-lived bearer session. The
//! identity provider side is pluggable ([`OAuthProvider`]); this crate owns the
//! session store, its expiry rules and the background sweep.
//!
//! Session flow:
//! 1. `OAuthSessionManager::initiate_login()` checks the redirect URI against
//!    the allow-list and asks the provider for an authorization URL + state
//! 2. The identity provider redirects back with `code` and `state`
//! 3. `complete_login()` exchanges them for a `UserContext` and stores a
//!    session valid for 24 hours
//! 4. Requests present the session id; `validate()` resolves it to the user
//! 5. `refresh()` pushes expiry forward, `logout()` removes the session and
//!    revokes the upstream token
//! 6. `spawn_sweeper()` periodically drops sessions nobody touched after expiry

pub mod error;
pub mod manager;
pub mod pkce;
pub mod provider;
pub mod redirect;
pub mod request;
pub mod session;
pub mod standard;
pub mod sweep;

pub use error::{AuthError, ErrorKind, Result};
pub use manager::{DEFAULT_PROVIDER_TIMEOUT, DEFAULT_SESSION_TTL, OAuthSessionManager, SessionSettings};
pub use provider::{AuthorizationRequest, OAuthProvider, ProviderError, ProviderFuture};
pub use redirect::{DEFAULT_ALLOWED_PREFIXES, RedirectPolicy};
pub use request::{SESSION_HEADER, SESSION_QUERY_PARAM, session_id_from_request};
pub use session::{OAuthSession, SessionDescriptor, TOKEN_TYPE, UserContext};
pub use standard::{OAuthEndpoints, StandardOAuthProvider};
pub use sweep::{DEFAULT_SWEEP_INTERVAL, SweepHandle, spawn_sweeper};
