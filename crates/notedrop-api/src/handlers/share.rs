//! Public share links: creation, revocation, and the unauthenticated
//! public note/file endpoints.

use axum::extract::{Host, Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use notedrop_core::{FileShare, NoteRepository};
use notedrop_db::{note_file_key, upload_key, StorageBackend};

use crate::error::ApiError;
use crate::handlers::files::effective_content_type;
use crate::services::sessions::Session;
use crate::services::share;
use crate::AppState;

/// Scheme + host prefix for building absolute share URLs.
fn base_url(headers: &HeaderMap, host: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

/// GET /share/:public_id
///
/// Redirects to the static share page with the public ID as a query
/// parameter.
pub async fn share_page_redirect(Path(public_id): Path<String>) -> impl IntoResponse {
    Redirect::temporary(&format!("/share.html?id={}", public_id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareNoteBody {
    pub public_id: Option<String>,
    pub expiration_ttl: Option<i64>,
}

/// POST /api/notes/:id/share
///
/// Creates (or returns) the note's share link. With `publicId` and
/// `expirationTtl` in the body, updates the TTL of an existing link
/// instead.
pub async fn share_note(
    State(state): State<AppState>,
    _session: Session,
    Path(note_id): Path<i64>,
    Host(host): Host,
    headers: HeaderMap,
    body: Option<Json<ShareNoteBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    if let (Some(public_id), Some(ttl)) = (&body.public_id, body.expiration_ttl) {
        share::update_note_share_ttl(&state.kv, note_id, public_id, ttl).await?;
        return Ok(Json(json!({
            "success": true,
            "message": "Expiration updated.",
        })));
    }

    // The note must exist before a link is minted for it.
    state.db.notes.fetch(note_id).await?;

    let public_id = share::share_note(&state.kv, note_id, body.expiration_ttl).await?;
    let base = base_url(&headers, &host);

    Ok(Json(json!({
        "displayUrl": format!("{}/share/{}", base, public_id),
        "rawUrl": format!("{}/api/public/note/raw/{}", base, public_id),
        "publicId": public_id,
    })))
}

/// DELETE /api/notes/:id/share
pub async fn unshare_note(
    State(state): State<AppState>,
    _session: Session,
    Path(note_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    share::unshare_note(&state.kv, note_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Sharing has been revoked.",
    })))
}

/// POST /api/notes/:note_id/files/:file_id/share
pub async fn share_file(
    State(state): State<AppState>,
    _session: Session,
    Path((note_id, file_id)): Path<(i64, Uuid)>,
    Host(host): Host,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.db.notes.fetch(note_id).await?;
    let mut files = note.files;
    let Some(index) = files.iter().position(|f| f.id == Some(file_id)) else {
        return Err(ApiError::NotFound("File not found in this note".to_string()));
    };

    let public_id = match files[index].public_id {
        Some(existing) => existing,
        None => {
            let payload = FileShare {
                note_id: Some(note_id),
                file_id: Some(file_id),
                file_name: Some(files[index].name.clone()),
                content_type: Some(files[index].content_type.clone()),
                ..Default::default()
            };
            let public_id = share::create_file_share(&state.kv, &payload).await?;

            // Persist so re-sharing returns the same link.
            files[index].public_id = Some(public_id);
            state.db.notes.update_files(note_id, &files).await?;
            public_id
        }
    };

    let base = base_url(&headers, &host);
    Ok(Json(json!({
        "url": format!("{}/api/public/file/{}", base, public_id),
    })))
}

/// GET /api/public/note/:public_id
///
/// Unauthenticated. Serves shared note content with private media URLs
/// rewritten to public file links and the note ID withheld.
pub async fn public_note(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(note_share) = share::resolve_note_share(&state.kv, &public_id).await? else {
        return Err(ApiError::NotFound(
            "Shared note not found or has expired".to_string(),
        ));
    };

    let note = state
        .db
        .notes
        .fetch(note_share.note_id)
        .await
        .map_err(|_| ApiError::NotFound("Shared note content not found".to_string()))?;

    let content = share::rewrite_private_urls(&state.kv, &note.content).await?;

    // Attachments get their own public links alongside their metadata.
    let mut files = Vec::new();
    for file in &note.files {
        let mut entry = serde_json::to_value(file).map_err(notedrop_core::Error::from)?;
        if let Some(file_id) = file.id {
            let payload = FileShare {
                note_id: Some(note.id),
                file_id: Some(file_id),
                file_name: Some(file.name.clone()),
                content_type: Some(file.content_type.clone()),
                ..Default::default()
            };
            let file_public_id = share::create_file_share(&state.kv, &payload).await?;
            entry["public_url"] = json!(format!("/api/public/file/{}", file_public_id));
        }
        files.push(entry);
    }

    Ok(Json(json!({
        "content": content,
        "updated_at": note.updated_at,
        "files": files,
    })))
}

/// GET /api/public/note/raw/:public_id
pub async fn public_raw_note(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(note_share) = share::resolve_note_share(&state.kv, &public_id).await? else {
        return Err(ApiError::NotFound("Not Found".to_string()));
    };

    let note = state.db.notes.fetch(note_share.note_id).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        note.content,
    ))
}

/// GET /api/public/file/:public_id
///
/// Unauthenticated. Serves both shared note attachments and shared
/// standalone images.
pub async fn public_file(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(file_share) = share::resolve_file_share(&state.kv, &public_id).await? else {
        return Err(ApiError::NotFound(
            "Public link not found or has expired.".to_string(),
        ));
    };

    let (key, file_name, content_type) = match &file_share {
        FileShare {
            standalone_image_id: Some(image_id),
            ..
        } => (
            upload_key(*image_id),
            file_share
                .file_name
                .clone()
                .unwrap_or_else(|| format!("image_{}.png", image_id)),
            file_share
                .content_type
                .clone()
                .unwrap_or_else(|| "image/png".to_string()),
        ),
        FileShare {
            note_id: Some(note_id),
            file_id: Some(file_id),
            ..
        } => (
            note_file_key(*note_id, *file_id),
            file_share.file_name.clone().unwrap_or_default(),
            file_share.content_type.clone().unwrap_or_default(),
        ),
        _ => {
            return Err(ApiError::Internal(notedrop_core::Error::Internal(
                "invalid public link data".to_string(),
            )))
        }
    };

    let data = state
        .storage
        .read(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found in storage".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400, immutable"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&effective_content_type(&file_name, &content_type))
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    if let Ok(value) =
        HeaderValue::from_str(&crate::handlers::files::content_disposition("inline", &file_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, data))
}
