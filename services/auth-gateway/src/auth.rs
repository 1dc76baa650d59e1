//! Login flow endpoints
//!
//! - POST /auth/login    : check redirect URI, return authorization URL + state
//! - GET  /auth/callback : exchange code/state for a bearer session
//! - POST /auth/logout   : end the session, revoke the upstream token
//! - POST /auth/refresh  : extend the session to a full TTL
//! - GET  /auth/me       : the user behind the presented session

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use serde::Deserialize;
use session_auth::{UserContext, session_id_from_request};
use tracing::warn;

use crate::AppState;
use crate::error::ApiError;

fn json_ok(body: serde_json::Value) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Resolve the caller's session to a user, for endpoints that need one.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<UserContext, ApiError> {
    Ok(state.sessions.validate(headers, uri.query()).await?)
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    redirect_uri: String,
}

/// POST /auth/login: body `{"redirect_uri": "..."}`.
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("invalid request body"))?;

    let authorization = state.sessions.initiate_login(&request.redirect_uri).await?;
    Ok(json_ok(serde_json::json!({
        "auth_url": authorization.auth_url,
        "state": authorization.state,
    })))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
    /// Set by the identity provider when the user denied access
    #[serde(default)]
    error: Option<String>,
}

/// GET /auth/callback?code=...&state=...
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(error) = params.error {
        warn!(error = %error, "identity provider returned an authorization error");
        return Err(ApiError::unauthorized("authorization denied"));
    }

    let descriptor = state
        .sessions
        .complete_login(&params.code, &params.state)
        .await?;
    Ok(json_ok(serde_json::json!(descriptor)))
}

/// POST /auth/logout: session from `X-Session-ID` or `session_id` query.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = session_id_from_request(&headers, uri.query()).unwrap_or_default();
    state.sessions.logout(&session_id).await?;
    Ok(json_ok(serde_json::json!({ "message": "logged out" })))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = session_id_from_request(&headers, uri.query()).unwrap_or_default();
    let descriptor = state.sessions.refresh(&session_id).await?;
    Ok(json_ok(serde_json::json!({
        "access_token": descriptor.access_token,
        "token_type": descriptor.token_type,
        "expires_at": descriptor.expires_at,
        "user": descriptor.user,
    })))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state, &headers, &uri).await?;
    Ok(json_ok(serde_json::json!(user)))
}
