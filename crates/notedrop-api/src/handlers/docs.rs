//! Hierarchical docs tree handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use notedrop_core::{CreateDocNodeRequest, DocNodeKind, DocRepository};

use crate::error::ApiError;
use crate::services::sessions::Session;
use crate::AppState;

/// GET /api/docs/tree
pub async fn docs_tree(
    State(state): State<AppState>,
    _session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state.db.docs.tree().await?;
    Ok(Json(tree))
}

#[derive(Debug, Deserialize)]
pub struct CreateNodeBody {
    #[serde(rename = "type")]
    kind: DocNodeKind,
    title: String,
    #[serde(default)]
    parent_id: Option<Uuid>,
}

/// POST /api/docs/node
pub async fn create_node(
    State(state): State<AppState>,
    _session: Session,
    Json(body): Json<CreateNodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let node = state
        .db
        .docs
        .create(CreateDocNodeRequest {
            kind: body.kind,
            title: body.title,
            parent_id: body.parent_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// GET /api/docs/node/:id
pub async fn get_node(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let node = state.db.docs.get(id).await?;
    Ok(Json(node))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNodeBody {
    content: String,
}

/// PUT /api/docs/node/:id
pub async fn update_node(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.docs.update_content(id, &body.content).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct RenameNodeBody {
    new_title: String,
}

/// POST /api/docs/node/:id/rename
pub async fn rename_node(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameNodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.docs.rename(id, &body.new_title).await?;
    Ok(Json(json!({
        "success": true,
        "new_title": body.new_title.trim(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct MoveNodeBody {
    new_parent_id: Option<Uuid>,
}

/// PATCH /api/docs/node/:id
pub async fn move_node(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveNodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.docs.move_node(id, body.new_parent_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/docs/node/:id
///
/// Descendants are removed by the database cascade; only the requested
/// node ID is reported back.
pub async fn delete_node(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.docs.delete(id).await?;
    Ok(Json(json!({ "success": true, "deletedIds": [id] })))
}
