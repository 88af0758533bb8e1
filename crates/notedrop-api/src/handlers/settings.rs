//! User settings handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use notedrop_core::Settings;

use crate::error::ApiError;
use crate::services::sessions::Session;
use crate::services::settings;
use crate::AppState;

/// GET /api/settings
pub async fn get_settings(
    State(state): State<AppState>,
    _session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let settings = settings::load(&state.kv).await?;
    Ok(Json(settings))
}

/// PUT /api/settings
pub async fn put_settings(
    State(state): State<AppState>,
    _session: Session,
    Json(new_settings): Json<Settings>,
) -> Result<impl IntoResponse, ApiError> {
    settings::store(&state.kv, &new_settings).await?;
    Ok(Json(json!({ "success": true })))
}
