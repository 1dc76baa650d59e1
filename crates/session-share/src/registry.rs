//! Share issuance and lifecycle on top of a [`ShareStore`]

use std::sync::Arc;

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use crate::error::{Result, ShareError};
use crate::share::SessionShare;
use crate::store::ShareStore;

#[derive(Clone)]
pub struct ShareRegistry {
    store: Arc<dyn ShareStore>,
}

impl ShareRegistry {
    pub fn new(store: Arc<dyn ShareStore>) -> Self {
        Self { store }
    }

    /// Issue a non-expiring share for `session_id`, superseding any earlier
    /// share for that session.
    ///
    /// The first issuer holds the session until their share is revoked or
    /// expires. While it is live, anyone else gets `NotFound`, the same
    /// answer `revoke` gives, and the existing token keeps working.
    pub async fn create_share(&self, session_id: &str, created_by: &str) -> Result<SessionShare> {
        self.issue(session_id, created_by, None).await
    }

    /// Issue a share that stops resolving after `ttl`.
    pub async fn create_share_expiring(
        &self,
        session_id: &str,
        created_by: &str,
        ttl: TimeDelta,
    ) -> Result<SessionShare> {
        self.issue(session_id, created_by, Some(ttl)).await
    }

    async fn issue(
        &self,
        session_id: &str,
        created_by: &str,
        ttl: Option<TimeDelta>,
    ) -> Result<SessionShare> {
        if session_id.is_empty() {
            return Err(ShareError::InvalidInput("missing session id"));
        }
        if created_by.is_empty() {
            return Err(ShareError::InvalidInput("missing creator"));
        }

        let mut share = SessionShare::new(session_id, created_by);
        if let Some(ttl) = ttl {
            let expires_at = share
                .created_at
                .checked_add_signed(ttl)
                .ok_or(ShareError::InvalidInput("ttl out of range"))?;
            share = share.with_expiry(expires_at);
        }

        if let Err(err) = self.store.claim(share.clone()).await {
            if matches!(err, ShareError::NotFound) {
                warn!(session_id, created_by, "share refused, session held by another user");
            }
            return Err(err);
        }
        metrics::counter!("share_tokens_issued_total").increment(1);
        info!(
            session_id,
            created_by,
            expires_at = ?share.expires_at,
            "share issued"
        );
        Ok(share)
    }

    /// Resolve a token to a live share.
    ///
    /// Unlike the raw store lookup this checks expiry: an expired share is
    /// deleted and reported as `Expired`.
    pub async fn resolve(&self, token: &str) -> Result<SessionShare> {
        let result = self.store.find_live_by_token(token).await;
        if matches!(result, Err(ShareError::Expired)) {
            metrics::counter!("share_tokens_expired_total").increment(1);
            debug!("expired share removed on lookup");
        }
        result
    }

    /// Delete a share on behalf of `requester`.
    ///
    /// Only the creator may revoke; anyone else gets `NotFound` so the
    /// existence of the token is not disclosed.
    pub async fn revoke(&self, token: &str, requester: &str) -> Result<()> {
        let share = self.store.find_by_token(token).await?;
        if share.created_by != requester {
            return Err(ShareError::NotFound);
        }
        self.store.delete_by_token(token).await?;
        info!(session_id = %share.session_id, requester, "share revoked");
        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<SessionShare> {
        self.store.find_by_token(token).await
    }

    pub async fn find_by_session_id(&self, session_id: &str) -> Result<SessionShare> {
        self.store.find_by_session_id(session_id).await
    }

    pub async fn save(&self, share: SessionShare) -> Result<()> {
        self.store.save(share).await
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.store.delete(session_id).await
    }

    pub async fn delete_by_token(&self, token: &str) -> Result<()> {
        self.store.delete_by_token(token).await
    }

    pub async fn cleanup_expired(&self) -> Result<usize> {
        let removed = self.store.cleanup_expired().await?;
        if removed > 0 {
            metrics::counter!("share_tokens_expired_total").increment(removed as u64);
            info!(removed, "cleaned up expired shares");
        }
        Ok(removed)
    }
}
