//! Share token endpoints and the periodic expiry cleanup
//!
//! - POST   /shares         : issue a share for a session (authenticated)
//! - GET    /shares/{token} : resolve a live share
//! - DELETE /shares/{token} : revoke a share (authenticated, creator only)

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use chrono::TimeDelta;
use serde::Deserialize;
use session_share::{SessionShare, ShareRegistry};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::AppState;
use crate::auth::authenticate;
use crate::error::ApiError;

#[derive(Deserialize)]
struct CreateShareRequest {
    #[serde(default)]
    session_id: String,
    /// Overrides the configured default; 0 = never expires
    #[serde(default)]
    ttl_secs: Option<u64>,
}

fn share_ttl(requested: Option<u64>, default: Option<Duration>) -> Result<Option<TimeDelta>, ApiError> {
    let ttl = match requested {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => default,
    };
    ttl.map(|d| TimeDelta::from_std(d).map_err(|_| ApiError::bad_request("ttl_secs out of range")))
        .transpose()
}

/// POST /shares: body `{"session_id": "...", "ttl_secs": 3600}`.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state, &headers, &uri).await?;
    let request: CreateShareRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("invalid request body"))?;

    let share = match share_ttl(request.ttl_secs, state.share_default_ttl)? {
        Some(ttl) => {
            state
                .shares
                .create_share_expiring(&request.session_id, &user.user_id, ttl)
                .await?
        }
        None => {
            state
                .shares
                .create_share(&request.session_id, &user.user_id)
                .await?
        }
    };

    Ok((
        StatusCode::CREATED,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!(share).to_string(),
    ))
}

/// What a token holder learns about a share; the creator stays private.
fn public_view(share: &SessionShare) -> serde_json::Value {
    serde_json::json!({
        "token": share.token,
        "session_id": share.session_id,
        "created_at": share.created_at,
        "expires_at": share.expires_at,
    })
}

/// GET /shares/{token}
pub async fn resolve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let share = state.shares.resolve(&token).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        public_view(&share).to_string(),
    ))
}

/// DELETE /shares/{token}
pub async fn revoke(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state, &headers, &uri).await?;
    state.shares.revoke(&token, &user.user_id).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!({ "message": "share revoked" }).to_string(),
    ))
}

/// Spawn a task that removes expired shares every `interval` until `cancel`
/// fires. The first pass runs one full interval after spawn.
pub fn spawn_cleanup(
    registry: ShareRegistry,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = registry.cleanup_expired().await {
                warn!(error = %e, "share cleanup failed, will retry next cycle");
            }
        }
        info!("share cleanup stopped");
    })
}
