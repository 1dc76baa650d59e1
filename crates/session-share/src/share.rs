//! Share records and token generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Length of a share token in hex characters.
pub const TOKEN_LEN: usize = 32;

/// Random bytes per token (hex doubles the length).
const TOKEN_BYTES: usize = TOKEN_LEN / 2;

/// A capability granting access to one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionShare {
    pub token: String,
    pub session_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// `None` means the share never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionShare {
    /// New non-expiring share with a fresh token.
    pub fn new(session_id: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            token: generate_token(),
            session_id: session_id.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// 16 bytes from the OS random source, lowercase hex.
///
/// Never fails: if the OS source errors, a time-derived value of the same
/// shape is used and a warning is logged.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    match getrandom::fill(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(e) => {
            warn!(error = %e, "OS random source failed, using time-derived share token");
            fallback_token()
        }
    }
}

static FALLBACK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Nanosecond clock mixed with a process-wide counter, as 32 hex chars.
fn fallback_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = u128::from(FALLBACK_SEQ.fetch_add(1, Ordering::Relaxed));
    format!("{:032x}", nanos ^ (seq << 96))
}
