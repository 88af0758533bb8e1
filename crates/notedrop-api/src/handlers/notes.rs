//! Note CRUD, search, and merge handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use notedrop_core::{
    CreateNoteRequest, FileMeta, ListNotesRequest, NoteFlag, NoteRepository, TagRepository,
};
use notedrop_db::{note_file_key, StorageBackend};

use crate::error::ApiError;
use crate::services::sessions::Session;
use crate::services::share::storage_key_for_url;
use crate::AppState;

/// Query parameters shared by listing and search.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub tag: Option<String>,
    pub favorites: Option<bool>,
    pub archived: Option<bool>,
    /// Millisecond epoch range over `updated_at`.
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    pub q: Option<String>,
}

impl ListQuery {
    fn to_request(&self) -> ListNotesRequest {
        ListNotesRequest {
            page: self.page.unwrap_or(1),
            tag: self.tag.clone(),
            favorites: self.favorites.unwrap_or(false),
            archived: self.archived.unwrap_or(false),
            updated_after: self.start_timestamp.and_then(millis_to_datetime),
            updated_before: self.end_timestamp.and_then(millis_to_datetime),
        }
    }
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// A file part pulled from a multipart form.
struct UploadedFile {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Everything a note create/update form can carry.
#[derive(Default)]
struct NoteForm {
    content: Option<String>,
    files: Vec<UploadedFile>,
    files_to_delete: Vec<Uuid>,
    /// `update_timestamp=false` preserves `updated_at` on edits.
    keep_timestamp: bool,
    is_pinned: Option<bool>,
    is_favorited: Option<bool>,
    is_archived: Option<bool>,
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart body: {}", e))
}

async fn read_note_form(mut multipart: Multipart) -> Result<NoteForm, ApiError> {
    let mut form = NoteForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("content") => {
                form.content = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(bad_multipart)?;
                if !file_name.is_empty() && !data.is_empty() {
                    form.files.push(UploadedFile {
                        name: file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            Some("filesToDelete") => {
                let raw = field.text().await.map_err(bad_multipart)?;
                form.files_to_delete = serde_json::from_str(&raw).unwrap_or_default();
            }
            Some("update_timestamp") => {
                form.keep_timestamp = field.text().await.map_err(bad_multipart)? == "false";
            }
            Some("isPinned") => {
                form.is_pinned = Some(field.text().await.map_err(bad_multipart)? == "true");
            }
            Some("isFavorited") => {
                form.is_favorited = Some(field.text().await.map_err(bad_multipart)? == "true");
            }
            Some("is_archived") => {
                form.is_archived = Some(field.text().await.map_err(bad_multipart)? == "true");
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Store the form's non-image files as note attachments.
///
/// Images are not attachments: they arrive through the image upload
/// endpoint and live embedded in the content.
async fn store_attachments(
    state: &AppState,
    note_id: i64,
    files: &[UploadedFile],
) -> Result<Vec<FileMeta>, ApiError> {
    let mut metas = Vec::new();
    for file in files {
        if file.content_type.starts_with("image/") {
            continue;
        }
        let file_id = Uuid::new_v4();
        state
            .storage
            .write(&note_file_key(note_id, file_id), &file.data)
            .await?;
        metas.push(FileMeta::stored(
            file_id,
            &file.name,
            file.data.len() as i64,
            &file.content_type,
        ));
    }
    Ok(metas)
}

/// GET /api/notes
pub async fn list_notes(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.db.notes.list(query.to_request()).await?;
    Ok(Json(response))
}

/// GET /api/search
///
/// An empty query falls back to plain listing so the client can reuse one
/// endpoint; short queries return an empty page.
pub async fn search_notes(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let response = match query.q.as_deref().map(str::trim) {
        None | Some("") => state.db.notes.list(query.to_request()).await?,
        Some(q) => state.db.search.search(q, &query.to_request()).await?,
    };
    Ok(Json(response))
}

/// POST /api/notes
pub async fn create_note(
    State(state): State<AppState>,
    _session: Session,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_note_form(multipart).await?;
    let content = form.content.unwrap_or_default();

    if content.trim().is_empty() && form.files.is_empty() {
        return Err(ApiError::BadRequest(
            "Content or file is required.".to_string(),
        ));
    }

    let note_id = state
        .db
        .notes
        .insert(CreateNoteRequest {
            content: content.clone(),
            ..Default::default()
        })
        .await?;

    let files_meta = store_attachments(&state, note_id, &form.files).await?;
    if !files_meta.is_empty() {
        state.db.notes.update_files(note_id, &files_meta).await?;
    }

    state.db.tags.sync_note_tags(note_id, &content).await?;

    let note = state.db.notes.fetch(note_id).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /api/notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.db.notes.fetch(id).await?;
    let form = read_note_form(multipart).await?;

    if let Some(content) = &form.content {
        let mut current_files = existing.files.clone();

        if !form.files_to_delete.is_empty() {
            let keys: Vec<String> = form
                .files_to_delete
                .iter()
                .map(|file_id| note_file_key(id, *file_id))
                .collect();
            state.storage.delete_many(&keys).await?;
            current_files.retain(|f| !f.id.map(|fid| form.files_to_delete.contains(&fid)).unwrap_or(false));
        }

        // A note emptied of both content and files is deleted outright.
        if content.trim().is_empty() && current_files.is_empty() && form.files.is_empty() {
            let leftover: Vec<String> = existing
                .files
                .iter()
                .filter_map(|f| f.id.map(|fid| note_file_key(id, fid)))
                .collect();
            state.storage.delete_many(&leftover).await?;
            state.db.notes.delete(id).await?;
            return Ok(Json(json!({ "success": true, "noteDeleted": true })));
        }

        current_files.extend(store_attachments(&state, id, &form.files).await?);

        state
            .db
            .notes
            .update_content(id, content, &current_files, !form.keep_timestamp)
            .await?;
        state.db.tags.sync_note_tags(id, content).await?;
    }

    if let Some(pinned) = form.is_pinned {
        state.db.notes.set_flag(id, NoteFlag::Pinned, pinned).await?;
    }
    if let Some(favorited) = form.is_favorited {
        state
            .db
            .notes
            .set_flag(id, NoteFlag::Favorited, favorited)
            .await?;
    }
    if let Some(archived) = form.is_archived {
        state
            .db
            .notes
            .set_flag(id, NoteFlag::Archived, archived)
            .await?;
    }

    let updated = state.db.notes.fetch(id).await?;
    Ok(Json(serde_json::to_value(updated).map_err(notedrop_core::Error::from)?))
}

/// DELETE /api/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.db.notes.fetch(id).await?;

    // Attachment blobs plus any locally stored pics embedded in content.
    let mut keys: Vec<String> = note
        .files
        .iter()
        .filter_map(|f| f.id.map(|fid| note_file_key(id, fid)))
        .collect();
    keys.extend(note.pics.iter().filter_map(|url| storage_key_for_url(url)));

    state.storage.delete_many(&keys).await?;
    state.db.notes.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub source_note_id: i64,
    pub target_note_id: i64,
    #[serde(default)]
    pub add_separator: bool,
}

/// POST /api/notes/merge
pub async fn merge_notes(
    State(state): State<AppState>,
    _session: Session,
    Json(req): Json<MergeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (merged, source_files) = state
        .db
        .notes
        .merge(req.source_note_id, req.target_note_id, req.add_separator)
        .await?;

    // Relocate the source note's blobs under the target's key prefix.
    for file in source_files {
        let Some(file_id) = file.id else { continue };
        let old_key = note_file_key(req.source_note_id, file_id);
        let new_key = note_file_key(req.target_note_id, file_id);
        if let Some(data) = state.storage.read(&old_key).await? {
            state.storage.write(&new_key, &data).await?;
            state.storage.delete(&old_key).await?;
        }
    }

    state
        .db
        .tags
        .sync_note_tags(merged.id, &merged.content)
        .await?;

    Ok(Json(merged))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default();
        let req = query.to_request();
        assert_eq!(req.page, 1);
        assert!(!req.favorites);
        assert!(!req.archived);
        assert!(req.updated_after.is_none());
    }

    #[test]
    fn test_list_query_timestamp_conversion() {
        let query = ListQuery {
            start_timestamp: Some(1_700_000_000_000),
            end_timestamp: Some(1_700_086_400_000),
            ..Default::default()
        };
        let req = query.to_request();
        assert_eq!(req.updated_after.unwrap().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(req.updated_before.unwrap().timestamp_millis(), 1_700_086_400_000);
    }

    #[test]
    fn test_merge_request_field_names() {
        let req: MergeRequest = serde_json::from_str(
            r#"{"sourceNoteId": 1, "targetNoteId": 2, "addSeparator": true}"#,
        )
        .unwrap();
        assert_eq!(req.source_note_id, 1);
        assert_eq!(req.target_note_id, 2);
        assert!(req.add_separator);
    }

    #[test]
    fn test_merge_request_separator_defaults_off() {
        let req: MergeRequest =
            serde_json::from_str(r#"{"sourceNoteId": 1, "targetNoteId": 2}"#).unwrap();
        assert!(!req.add_separator);
    }
}
