//! Login and logout against the configured credentials.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::services::sessions::{create_session, revoke_session};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username != state.config.admin_username || req.password != state.config.admin_password {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let (_, cookie) = create_session(&state, &req.username).await?;
    info!(username = %req.username, "login");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    ))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let clear_cookie = revoke_session(&state, cookie_header).await?;
    Ok((
        [(header::SET_COOKIE, clear_cookie)],
        Json(json!({ "success": true })),
    ))
}
