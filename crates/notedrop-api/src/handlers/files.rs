//! File attachment serving, standalone image uploads, the cross-note
//! attachment browser, and the Imgur proxy.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use notedrop_core::NoteRepository;
use notedrop_db::{note_file_key, upload_key, StorageBackend};

use crate::error::ApiError;
use crate::services::sessions::Session;
use crate::AppState;

/// Attachments per page in the cross-note browser.
const ATTACHMENTS_PER_PAGE: i64 = 20;

/// Extensions served as plain text so the browser previews instead of
/// downloading.
const TEXT_LIKE_EXTENSIONS: [&str; 16] = [
    "txt", "md", "log", "json", "js", "css", "html", "xml", "yaml", "yml", "toml", "py", "sh",
    "rb", "go", "rs",
];

/// Pick the Content-Type a stored file should be served with.
pub fn effective_content_type(file_name: &str, declared: &str) -> String {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if declared.starts_with("text/") || TEXT_LIKE_EXTENSIONS.contains(&extension.as_str()) {
        "text/plain; charset=utf-8".to_string()
    } else if declared.is_empty() {
        "application/octet-stream".to_string()
    } else {
        declared.to_string()
    }
}

/// Encode a filename for a Content-Disposition header.
pub(crate) fn content_disposition(disposition: &str, file_name: &str) -> String {
    let encoded: String = file_name
        .bytes()
        .flat_map(|b| {
            if b.is_ascii_alphanumeric() || b"-_.~".contains(&b) {
                vec![b as char]
            } else {
                format!("%{:02X}", b).chars().collect()
            }
        })
        .collect();
    format!("{}; filename*=UTF-8''{}", disposition, encoded)
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("application/octet-stream"))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    preview: Option<bool>,
}

/// GET /api/files/:note_id/:file_id
pub async fn serve_note_file(
    State(state): State<AppState>,
    _session: Session,
    Path((note_id, file_id)): Path<(i64, Uuid)>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // Metadata may be absent for ingested media that is only referenced
    // from content; the blob itself decides existence.
    let meta = match state.db.notes.fetch(note_id).await {
        Ok(note) => note.files.into_iter().find(|f| f.id == Some(file_id)),
        Err(_) => None,
    };

    let data = state
        .storage
        .read(&note_file_key(note_id, file_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found in storage".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400, immutable"),
    );

    match meta {
        Some(meta) => {
            headers.insert(
                header::CONTENT_TYPE,
                header_value(effective_content_type(&meta.name, &meta.content_type)),
            );
            let disposition = if query.preview.unwrap_or(false) {
                "inline"
            } else {
                "attachment"
            };
            headers.insert(
                header::CONTENT_DISPOSITION,
                header_value(content_disposition(disposition, &meta.name)),
            );
        }
        None => {
            let sniffed = infer::get(&data)
                .map(|k| k.mime_type())
                .unwrap_or("application/octet-stream");
            headers.insert(header::CONTENT_TYPE, header_value(sniffed.to_string()));
            headers.insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("inline"),
            );
        }
    }

    Ok((headers, data))
}

/// POST /api/upload/image
///
/// Standalone image upload (paste flow); the blob lands under `uploads/`
/// so it is independent of any note's lifecycle.
pub async fn upload_image(
    State(state): State<AppState>,
    _session: Session,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if data.is_empty() {
            break;
        }

        let image_id = Uuid::new_v4();
        state.storage.write(&upload_key(image_id), &data).await?;
        return Ok(Json(json!({
            "success": true,
            "url": format!("/api/images/{}", image_id),
        })));
    }

    Err(ApiError::BadRequest(
        "A file is required for upload.".to_string(),
    ))
}

/// GET /api/images/:image_id
pub async fn serve_image(
    State(state): State<AppState>,
    _session: Session,
    Path(image_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state
        .storage
        .read(&upload_key(image_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let sniffed = infer::get(&data)
        .map(|k| k.mime_type())
        .unwrap_or("application/octet-stream");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header_value(sniffed.to_string()));
    // Uploaded images never change.
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok((headers, data))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
}

/// GET /api/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (attachments, has_more) = state
        .db
        .notes
        .list_attachments(query.page.unwrap_or(1), ATTACHMENTS_PER_PAGE)
        .await?;

    Ok(Json(json!({
        "attachments": attachments,
        "hasMore": has_more,
    })))
}

#[derive(Debug, Deserialize)]
struct ImgurData {
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    success: bool,
    data: Option<ImgurData>,
}

/// POST /api/proxy/upload/imgur
///
/// Uploads an image to Imgur on the client's behalf so the browser never
/// talks to Imgur directly. The client supplies its own client ID.
pub async fn imgur_proxy_upload(
    State(_state): State<AppState>,
    _session: Session,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut client_id: Option<String> = None;
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("clientId") => {
                client_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                )
            }
            Some("file") => {
                image = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?
                        .to_vec(),
                )
            }
            _ => {}
        }
    }

    let client_id =
        client_id.ok_or_else(|| ApiError::BadRequest("Imgur Client ID is required.".to_string()))?;
    let image = image.ok_or_else(|| ApiError::BadRequest("An image is required.".to_string()))?;

    let form = reqwest::multipart::Form::new()
        .part("image", reqwest::multipart::Part::bytes(image));

    let response = reqwest::Client::new()
        .post("https://api.imgur.com/3/image")
        .header(header::AUTHORIZATION, format!("Client-ID {}", client_id))
        .multipart(form)
        .send()
        .await
        .map_err(notedrop_core::Error::from)?;

    if !response.status().is_success() {
        return Err(ApiError::BadRequest(format!(
            "Imgur API responded with status {}",
            response.status()
        )));
    }

    let body: ImgurResponse = response.json().await.map_err(notedrop_core::Error::from)?;
    let link = body
        .data
        .and_then(|d| d.link)
        .filter(|_| body.success)
        .ok_or_else(|| {
            ApiError::BadRequest("Imgur API returned a failure response.".to_string())
        })?;

    Ok(Json(json!({ "success": true, "url": link })))
}
