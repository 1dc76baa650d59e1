//! Locating the session id on an incoming request

use reqwest::header::{AUTHORIZATION, HeaderMap};

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";
/// Query parameter fallback, for clients that cannot set headers.
pub const SESSION_QUERY_PARAM: &str = "session_id";

/// Extract a session id from request headers and query string.
///
/// Lookup order: `X-Session-ID` header, then the `session_id` query
/// parameter, then an `Authorization: Bearer` token. Empty values are
/// skipped.
pub fn session_id_from_request(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(id) = from_header {
        return Some(id.to_string());
    }

    let from_query = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, value)| key == SESSION_QUERY_PARAM && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    });
    if from_query.is_some() {
        return from_query;
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
