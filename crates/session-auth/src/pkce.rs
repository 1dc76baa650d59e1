//! PKCE (Proof Key for Code Exchange) per RFC 7636
//!
//! The verifier stays server-side in the provider's pending-state map; only
//! the S256 challenge goes into the authorization URL.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a PKCE code verifier.
///
/// 32 random bytes encoded as URL-safe base64 without padding: 43 characters,
/// the RFC 7636 minimum length.
pub fn generate_verifier() -> String {
    random_token(32)
}

/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Opaque anti-forgery value for the `state` parameter.
pub fn generate_state() -> String {
    random_token(24)
}

/// `len` random bytes, URL-safe base64 without padding.
pub(crate) fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}
