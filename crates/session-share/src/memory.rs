//! In-process share store

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ShareError;
use crate::share::SessionShare;
use crate::store::{ShareStore, StoreFuture};

#[derive(Default)]
struct Indexes {
    by_token: HashMap<String, SessionShare>,
    /// session id → token
    by_session: HashMap<String, String>,
}

impl Indexes {
    fn remove_token(&mut self, token: &str) -> Option<SessionShare> {
        let share = self.by_token.remove(token)?;
        if self.by_session.get(&share.session_id).map(String::as_str) == Some(token) {
            self.by_session.remove(&share.session_id);
        }
        Some(share)
    }

    fn insert(&mut self, share: SessionShare) {
        if let Some(old_token) = self.by_session.remove(&share.session_id) {
            self.by_token.remove(&old_token);
            debug!(session_id = %share.session_id, "superseded previous share");
        }
        // A reused token must not leave a dangling session mapping behind
        self.remove_token(&share.token);
        self.by_session
            .insert(share.session_id.clone(), share.token.clone());
        self.by_token.insert(share.token.clone(), share);
    }

    fn current(&self, session_id: &str) -> Option<&SessionShare> {
        self.by_session
            .get(session_id)
            .and_then(|token| self.by_token.get(token))
    }
}

/// Share store backed by two hash maps under one async mutex.
///
/// Both indexes change inside a single critical section, so readers never
/// see a token whose session points elsewhere.
#[derive(Default)]
pub struct MemoryShareStore {
    inner: Mutex<Indexes>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_token.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl ShareStore for MemoryShareStore {
    fn save(&self, share: SessionShare) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.inner.lock().await.insert(share);
            Ok(())
        })
    }

    fn claim(&self, share: SessionShare) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let held_by_other = inner.current(&share.session_id).is_some_and(|existing| {
                existing.created_by != share.created_by && !existing.is_expired_at(Utc::now())
            });
            if held_by_other {
                return Err(ShareError::NotFound);
            }
            inner.insert(share);
            Ok(())
        })
    }

    fn find_live_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, SessionShare> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let share = inner.by_token.get(token).ok_or(ShareError::NotFound)?;
            if share.is_expired_at(Utc::now()) {
                inner.remove_token(token);
                return Err(ShareError::Expired);
            }
            Ok(share.clone())
        })
    }

    fn find_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, SessionShare> {
        Box::pin(async move {
            self.inner
                .lock()
                .await
                .by_token
                .get(token)
                .cloned()
                .ok_or(ShareError::NotFound)
        })
    }

    fn find_by_session_id<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, SessionShare> {
        Box::pin(async move {
            self.inner
                .lock()
                .await
                .current(session_id)
                .cloned()
                .ok_or(ShareError::NotFound)
        })
    }

    fn delete<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if let Some(token) = inner.by_session.remove(session_id) {
                inner.by_token.remove(&token);
            }
            Ok(())
        })
    }

    fn delete_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.inner.lock().await.remove_token(token);
            Ok(())
        })
    }

    fn cleanup_expired(&self) -> StoreFuture<'_, usize> {
        Box::pin(async move {
            let now = Utc::now();
            let mut inner = self.inner.lock().await;
            let expired: Vec<String> = inner
                .by_token
                .values()
                .filter(|share| share.is_expired_at(now))
                .map(|share| share.token.clone())
                .collect();
            for token in &expired {
                inner.remove_token(token);
            }
            Ok(expired.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn share(token: &str, session_id: &str) -> SessionShare {
        owned_share(token, session_id, "alice")
    }

    fn owned_share(token: &str, session_id: &str, created_by: &str) -> SessionShare {
        SessionShare {
            token: token.into(),
            session_id: session_id.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn finds_by_both_indexes() {
        let store = MemoryShareStore::new();
        store.save(share("t1", "s1")).await.unwrap();

        assert_eq!(store.find_by_token("t1").await.unwrap().session_id, "s1");
        assert_eq!(store.find_by_session_id("s1").await.unwrap().token, "t1");
        assert!(matches!(
            store.find_by_token("t2").await,
            Err(ShareError::NotFound)
        ));
        assert!(matches!(
            store.find_by_session_id("s2").await,
            Err(ShareError::NotFound)
        ));
    }

    #[tokio::test]
    async fn second_share_supersedes_first() {
        let store = MemoryShareStore::new();
        store.save(share("old", "s1")).await.unwrap();
        store.save(share("new", "s1")).await.unwrap();

        assert!(matches!(
            store.find_by_token("old").await,
            Err(ShareError::NotFound)
        ));
        assert_eq!(store.find_by_token("new").await.unwrap().session_id, "s1");
        assert_eq!(store.find_by_session_id("s1").await.unwrap().token, "new");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn reused_token_moves_to_new_session() {
        let store = MemoryShareStore::new();
        store.save(share("t1", "s1")).await.unwrap();
        store.save(share("t1", "s2")).await.unwrap();

        assert_eq!(store.find_by_token("t1").await.unwrap().session_id, "s2");
        assert!(store.find_by_session_id("s1").await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn deletes_keep_indexes_in_sync() {
        let store = MemoryShareStore::new();
        store.save(share("t1", "s1")).await.unwrap();
        store.save(share("t2", "s2")).await.unwrap();

        store.delete("s1").await.unwrap();
        assert!(store.find_by_token("t1").await.is_err());

        store.delete_by_token("t2").await.unwrap();
        assert!(store.find_by_session_id("s2").await.is_err());
        assert!(store.is_empty().await);

        // Missing entries are a no-op
        store.delete("s1").await.unwrap();
        store.delete_by_token("nope").await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_removes_exactly_the_expired() {
        let store = MemoryShareStore::new();
        let past = Utc::now() - TimeDelta::minutes(1);
        let future = Utc::now() + TimeDelta::hours(1);
        store.save(share("a", "s1").with_expiry(past)).await.unwrap();
        store.save(share("b", "s2").with_expiry(past)).await.unwrap();
        store.save(share("c", "s3").with_expiry(future)).await.unwrap();
        store.save(share("d", "s4")).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 2);
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);

        assert!(store.find_by_session_id("s1").await.is_err());
        assert!(store.find_by_token("b").await.is_err());
        assert!(store.find_by_token("c").await.is_ok());
        assert!(store.find_by_token("d").await.is_ok());
    }

    #[tokio::test]
    async fn lookups_do_not_check_expiry() {
        let store = MemoryShareStore::new();
        let expired = share("t1", "s1").with_expiry(Utc::now() - TimeDelta::hours(1));
        store.save(expired).await.unwrap();
        assert!(store.find_by_token("t1").await.unwrap().is_expired());
    }

    #[tokio::test]
    async fn claim_refuses_a_live_share_held_by_someone_else() {
        let store = MemoryShareStore::new();
        store.claim(owned_share("t1", "s1", "alice")).await.unwrap();

        assert!(matches!(
            store.claim(owned_share("t2", "s1", "mallory")).await,
            Err(ShareError::NotFound)
        ));
        assert_eq!(store.find_by_session_id("s1").await.unwrap().token, "t1");
        assert!(store.find_by_token("t2").await.is_err());

        // The holder can reissue
        store.claim(owned_share("t3", "s1", "alice")).await.unwrap();
        assert_eq!(store.find_by_session_id("s1").await.unwrap().token, "t3");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn claim_takes_over_an_expired_share() {
        let store = MemoryShareStore::new();
        let stale = owned_share("t1", "s1", "alice").with_expiry(Utc::now() - TimeDelta::seconds(1));
        store.save(stale).await.unwrap();

        store.claim(owned_share("t2", "s1", "bob")).await.unwrap();
        assert_eq!(store.find_by_session_id("s1").await.unwrap().created_by, "bob");
        assert!(store.find_by_token("t1").await.is_err());
    }

    #[tokio::test]
    async fn find_live_removes_expired_share() {
        let store = MemoryShareStore::new();
        store.save(share("live", "s1")).await.unwrap();
        let expired = share("dead", "s2").with_expiry(Utc::now() - TimeDelta::seconds(1));
        store.save(expired).await.unwrap();

        assert_eq!(store.find_live_by_token("live").await.unwrap().session_id, "s1");
        assert!(matches!(
            store.find_live_by_token("dead").await,
            Err(ShareError::Expired)
        ));
        assert!(store.find_by_session_id("s2").await.is_err());
        assert!(matches!(
            store.find_live_by_token("dead").await,
            Err(ShareError::NotFound)
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_leave_one_consistent_share() {
        let store = std::sync::Arc::new(MemoryShareStore::new());
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.save(share(&format!("t{i}"), "s1")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 1);
        let current = store.find_by_session_id("s1").await.unwrap();
        assert_eq!(store.find_by_token(&current.token).await.unwrap(), current);
        for i in 0..32 {
            let token = format!("t{i}");
            assert_eq!(store.find_by_token(&token).await.is_ok(), token == current.token);
        }
    }
}
