//! Session records and the identity they carry

use chrono::{DateTime, Utc};
use common::Secret;
use serde::Serialize;

/// Token type reported to clients. The session id is the bearer credential.
pub const TOKEN_TYPE: &str = "Bearer";

/// Identity resolved by the OAuth provider during code exchange.
///
/// The upstream access token is needed for revocation on logout and never
/// leaves the process: it is skipped during serialization and redacted in
/// Debug output.
#[derive(Debug, Clone, Serialize)]
pub struct UserContext {
    pub user_id: String,
    pub login: String,
    pub name: String,
    #[serde(skip)]
    pub access_token: Secret<String>,
    pub orgs: Vec<String>,
    /// Team memberships as `org/team` slugs
    pub teams: Vec<String>,
}

/// An ephemeral bearer session.
///
/// `expires_at` starts at `created_at + ttl` and only ever moves forward.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub id: String,
    pub user: UserContext,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthSession {
    /// Whether the session has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Push expiry to `until`, ignoring values earlier than the current one.
    pub fn extend_to(&mut self, until: DateTime<Utc>) {
        if until > self.expires_at {
            self.expires_at = until;
        }
    }

    pub fn descriptor(&self) -> SessionDescriptor {
        SessionDescriptor {
            session_id: self.id.clone(),
            access_token: self.id.clone(),
            token_type: TOKEN_TYPE,
            expires_at: self.expires_at,
            user: self.user.clone(),
        }
    }
}

/// What a client receives after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDescriptor {
    pub session_id: String,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserContext,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn test_user() -> UserContext {
        UserContext {
            user_id: "583231".into(),
            login: "octocat".into(),
            name: "The Octocat".into(),
            access_token: Secret::new("gho_upstream".into()),
            orgs: vec!["github".into()],
            teams: vec!["github/core".into()],
        }
    }

    fn test_session(now: DateTime<Utc>) -> OAuthSession {
        OAuthSession {
            id: "sess_abc".into(),
            user: test_user(),
            created_at: now,
            expires_at: now + TimeDelta::hours(1),
        }
    }

    #[test]
    fn serialized_user_omits_upstream_token() {
        let json = serde_json::to_value(test_user()).unwrap();
        assert_eq!(json["login"], "octocat");
        assert_eq!(json["orgs"][0], "github");
        assert!(json.get("access_token").is_none());
        assert!(!json.to_string().contains("gho_upstream"));
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let now = Utc::now();
        let session = test_session(now);
        assert!(!session.is_expired_at(now));
        assert!(!session.is_expired_at(session.expires_at));
        assert!(session.is_expired_at(session.expires_at + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn extend_never_moves_backwards() {
        let now = Utc::now();
        let mut session = test_session(now);
        let original = session.expires_at;

        session.extend_to(now);
        assert_eq!(session.expires_at, original);

        session.extend_to(now + TimeDelta::hours(24));
        assert_eq!(session.expires_at, now + TimeDelta::hours(24));
    }

    #[test]
    fn descriptor_uses_session_id_as_bearer_token() {
        let session = test_session(Utc::now());
        let descriptor = session.descriptor();
        assert_eq!(descriptor.session_id, "sess_abc");
        assert_eq!(descriptor.access_token, "sess_abc");
        assert_eq!(descriptor.token_type, "Bearer");

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["user"]["user_id"], "583231");
    }
}
