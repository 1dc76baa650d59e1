//! Storage contract for shares

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::share::SessionShare;

/// Future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistent home for shares, indexed by token and by session id.
///
/// Implementations must keep both indexes consistent and make `save`
/// atomic with respect to superseding an older share for the same session.
/// Uses `Pin<Box<dyn Future>>` return types so the registry can hold an
/// `Arc<dyn ShareStore>`.
pub trait ShareStore: Send + Sync {
    /// Store a share, replacing any existing share for the same session.
    fn save(&self, share: SessionShare) -> StoreFuture<'_, ()>;

    /// Store a share unless the session already has a live share issued by
    /// someone else, in which case nothing changes and `ShareError::NotFound`
    /// is returned. The check and the replacement happen atomically.
    fn claim(&self, share: SessionShare) -> StoreFuture<'_, ()>;

    /// Look up a live share by token. An expired share is removed in the
    /// same step and reported as `ShareError::Expired`.
    fn find_live_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, SessionShare>;

    /// Look up by token. No expiry check. Missing → `ShareError::NotFound`.
    fn find_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, SessionShare>;

    /// Look up by session id. No expiry check. Missing → `ShareError::NotFound`.
    fn find_by_session_id<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, SessionShare>;

    /// Remove the share for a session. Missing is not an error.
    fn delete<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, ()>;

    /// Remove a share by token. Missing is not an error.
    fn delete_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, ()>;

    /// Remove every share whose expiry has passed; returns how many.
    fn cleanup_expired(&self) -> StoreFuture<'_, usize>;
}
