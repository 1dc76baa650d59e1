//! Identity provider abstraction
//!
//! The session manager never talks to an identity provider directly. It asks
//! an [`OAuthProvider`] for an authorization URL, hands it the code/state pair
//! from the callback, and asks it to revoke tokens on logout. The provider
//! owns all state/nonce bookkeeping between the first two calls.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::session::UserContext;

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = std::result::Result<T, ProviderError>> + Send + 'a>>;

/// Authorization URL plus the anti-forgery state embedded in it.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub state: String,
}

/// Errors from identity provider calls.
///
/// The session manager collapses all of these into `Unauthorized` for the
/// caller; the variants exist for logs.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("user lookup failed: {0}")]
    UserLookup(String),

    #[error("token revocation failed: {0}")]
    Revocation(String),

    #[error("authorization URL construction failed: {0}")]
    AuthorizationUrl(String),
}

/// Relying-party side of an OAuth identity provider.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn OAuthProvider>`).
pub trait OAuthProvider: Send + Sync {
    /// Identifier for logging (e.g. "github")
    fn id(&self) -> &str;

    /// Build the authorization URL the user is sent to, and the state value
    /// the callback must echo back.
    fn authorization_url<'a>(&'a self, redirect_uri: &'a str)
    -> ProviderFuture<'a, AuthorizationRequest>;

    /// Exchange an authorization code for the user's identity. Must reject
    /// unknown, reused or expired `state` values.
    fn exchange_code<'a>(&'a self, code: &'a str, state: &'a str) -> ProviderFuture<'a, UserContext>;

    /// Revoke an upstream access token.
    fn revoke_token<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, ()>;
}
