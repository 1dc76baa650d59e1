//! HTTP error responses
//!
//! Every failure maps to one status code and a stable reason string.
//! Internal details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use session_auth::{AuthError, ErrorKind};
use session_share::ShareError;
use tracing::{error, warn};

/// Error returned from gateway handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_type: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: "invalid_request_error",
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error_type: "authentication_error",
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error_type: "not_found_error",
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error_type: "api_error",
            message: "internal error".into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => Self::bad_request(err.reason()),
            // Reported as a bad request, logged separately as an authorization failure
            ErrorKind::Forbidden => {
                warn!(reason = err.reason(), "authorization failure");
                Self::bad_request(err.reason())
            }
            ErrorKind::Unauthorized => Self::unauthorized(err.reason()),
            ErrorKind::NotFound => Self::not_found(err.reason()),
            ErrorKind::Internal => {
                error!(error = %err, "session operation failed");
                Self::internal()
            }
        }
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::NotFound => Self::not_found("share not found"),
            ShareError::Expired => Self::unauthorized("share expired"),
            ShareError::InvalidInput(reason) => Self::bad_request(reason),
            ShareError::Storage(detail) => {
                error!(error = %detail, "share storage failed");
                Self::internal()
            }
        }
    }
}

/// JSON error body: {"error":{"type":"...","message":"...","request_id":"req_..."}}
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let body = serde_json::json!({
            "error": {
                "type": self.error_type,
                "message": self.message,
                "request_id": request_id,
            }
        });
        (
            self.status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn auth_kinds_map_to_statuses() {
        let cases = [
            (AuthError::BadRequest("missing code or state"), StatusCode::BAD_REQUEST),
            (AuthError::Forbidden("redirect_uri not allowed"), StatusCode::BAD_REQUEST),
            (AuthError::Unauthorized("session expired"), StatusCode::UNAUTHORIZED),
            (AuthError::NotFound("session not found"), StatusCode::NOT_FOUND),
            (AuthError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn share_errors_map_to_statuses() {
        assert_eq!(ApiError::from(ShareError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(ShareError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ShareError::InvalidInput("missing session id")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ShareError::Storage("disk full".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn body_has_type_message_and_request_id() {
        let (status, json) = body_json(AuthError::Unauthorized("no session id").into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["type"], "authentication_error");
        assert_eq!(json["error"]["message"], "no session id");
        let request_id = json["error"]["request_id"].as_str().unwrap();
        assert!(request_id.starts_with("req_"));
        assert_eq!(request_id.len(), 4 + 32);
    }

    #[tokio::test]
    async fn internal_details_stay_out_of_the_body() {
        let (_, json) = body_json(AuthError::Internal("token endpoint said: secret".into()).into()).await;
        assert_eq!(json["error"]["message"], "internal error");
        assert!(!json.to_string().contains("secret"));
    }
}
