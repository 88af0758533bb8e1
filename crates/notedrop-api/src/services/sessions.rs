//! Cookie-based session management on top of the KV store.
//!
//! Sessions live under `session:{uuid}` with a 30-day TTL and are carried
//! by an HttpOnly cookie. The [`Session`] extractor rejects requests
//! without a live session.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use uuid::Uuid;

use notedrop_core::{Result, SessionData};

use crate::error::ApiError;
use crate::AppState;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "__session";

/// Session lifetime: 30 days.
pub const SESSION_TTL_SECONDS: u64 = 30 * 86_400;

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Pull the session ID out of a Cookie header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(&format!("{}=", SESSION_COOKIE)[..]))
        .filter(|id| !id.is_empty())
}

/// Create a session and return (session_id, Set-Cookie value).
pub async fn create_session(state: &AppState, username: &str) -> Result<(String, String)> {
    let session_id = Uuid::new_v4().to_string();
    let data = SessionData {
        username: username.to_string(),
        logged_in_at: Utc::now(),
    };
    state
        .kv
        .put_json(&session_key(&session_id), &data, Some(SESSION_TTL_SECONDS))
        .await?;

    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE, session_id, SESSION_TTL_SECONDS
    );
    Ok((session_id, cookie))
}

/// Revoke the session carried by the given Cookie header, if any.
/// Returns the Set-Cookie value that clears the cookie.
pub async fn revoke_session(state: &AppState, cookie_header: Option<&str>) -> Result<String> {
    if let Some(session_id) = cookie_header.and_then(session_id_from_cookies) {
        state.kv.delete(&session_key(session_id)).await?;
    }
    Ok(format!(
        "{}=; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
        SESSION_COOKIE
    ))
}

/// Authenticated session extractor.
///
/// ```rust,ignore
/// async fn my_handler(session: Session) -> impl IntoResponse { ... }
/// ```
pub struct Session(pub SessionData);

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let session_id = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(session_id_from_cookies)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

        let data: Option<SessionData> = state.kv.get_json(&session_key(session_id)).await?;
        data.map(Session)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_parsed_from_cookie_header() {
        let header = "theme=dark; __session=abc-123; other=1";
        assert_eq!(session_id_from_cookies(header), Some("abc-123"));
    }

    #[test]
    fn test_missing_session_cookie() {
        assert_eq!(session_id_from_cookies("theme=dark"), None);
    }

    #[test]
    fn test_empty_session_cookie_value() {
        assert_eq!(session_id_from_cookies("__session="), None);
    }

    #[test]
    fn test_session_key_format() {
        assert_eq!(session_key("abc"), "session:abc");
    }
}
