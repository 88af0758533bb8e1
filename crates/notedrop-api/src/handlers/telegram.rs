//! Telegram webhook ingestion and the media proxy.
//!
//! The webhook always answers 200 OK once the secret matches — Telegram
//! retries anything else, and a malformed or unauthorized update should be
//! dropped, not redelivered.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use uuid::Uuid;

use notedrop_core::{CreateNoteRequest, Error, FileMeta, NoteRepository, TagRepository};
use notedrop_db::{note_file_key, StorageBackend};
use notedrop_ingest::{
    assemble_note, forward_header, image_embed, message_markdown, reply_quote, video_embed,
    Message, Update,
};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::services::settings;
use crate::AppState;

/// GET /api/tg-media-proxy/:file_id
///
/// Resolves a Telegram `file_id` to a short-lived download URL and
/// redirects the client there.
pub async fn media_proxy(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(bot) = &state.bot else {
        return Err(ApiError::Internal(Error::Config(
            "Bot not configured".to_string(),
        )));
    };

    let file_path = bot.get_file_path(&file_id).await?;
    Ok(Redirect::temporary(&bot.download_url(&file_path)))
}

/// POST /api/telegram_webhook/:secret
pub async fn webhook(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    Json(update): Json<Update>,
) -> Result<impl IntoResponse, ApiError> {
    let expected = state.config.telegram_webhook_secret.as_deref();
    if expected.is_none() || expected != Some(secret.as_str()) {
        return Err(ApiError::Unauthorized("Unauthorized".to_string()));
    }

    let Some(message) = update.message() else {
        return Ok(StatusCode::OK);
    };
    let chat_id = message.chat.id;

    match ingest_message(&state, message).await {
        Ok(Some(note_id)) => {
            info!(note_id, chat_id, "ingested telegram message");
            if let Some(bot) = &state.bot {
                bot.send_message(chat_id, &format!("✅ Note saved (ID: {})", note_id))
                    .await;
            }
        }
        Ok(None) => {}
        Err(e) => {
            error!(chat_id, error = %e, "telegram ingestion failed");
            if let Some(bot) = &state.bot {
                bot.send_message(chat_id, &format!("❌ Failed to save note: {}", e))
                    .await;
            }
        }
    }

    // Always acknowledged; see module docs.
    Ok(StatusCode::OK)
}

/// Turn an authorized message into a stored note.
///
/// Returns `Ok(None)` when the message is ignored (unauthorized sender or
/// nothing to store).
async fn ingest_message(state: &AppState, message: &Message) -> notedrop_core::Result<Option<i64>> {
    let Some(allowed) = state.config.telegram_allowed_user else {
        warn!("TELEGRAM_ALLOWED_USER is not set; dropping message");
        return Ok(None);
    };
    let sender = message.from.as_ref().map(|u| u.id);
    if sender != Some(allowed) {
        info!(?sender, "blocked message from unauthorized sender");
        return Ok(None);
    }

    let bot = state
        .bot
        .as_ref()
        .ok_or_else(|| Error::Config("TELEGRAM_BOT_TOKEN is not set".to_string()))?;

    let body = message_markdown(message);
    let photo = message.largest_photo();
    let document = message.document.as_ref();
    let video = message.video.as_ref();

    if body.trim().is_empty() && photo.is_none() && document.is_none() && video.is_none() {
        return Ok(None);
    }

    let settings = settings::load(&state.kv).await?;

    // The row is created first so media keys can carry the note ID.
    let note_id = state.db.notes.insert(CreateNoteRequest::default()).await?;

    let mut files_meta: Vec<FileMeta> = Vec::new();
    let mut videos: Vec<String> = Vec::new();
    let mut media_embeds: Vec<String> = Vec::new();

    if let Some(photo) = photo {
        let file_path = bot.get_file_path(&photo.file_id).await?;
        let extension = file_path.rsplit('.').next().unwrap_or("jpg");
        let file_name = format!("photo_{}.{}", message.message_id, extension);
        let data = bot.download(&file_path).await?;

        let file_id = Uuid::new_v4();
        state
            .storage
            .write(&note_file_key(note_id, file_id), &data)
            .await?;
        let url = format!("/api/files/{}/{}", note_id, file_id);
        media_embeds.push(image_embed(&file_name, &url));
    }

    if let Some(video) = video {
        if settings.telegram_proxy {
            let url = format!("/api/tg-media-proxy/{}", video.file_id);
            videos.push(url.clone());
            media_embeds.push(video_embed(&url));
        } else {
            let file_path = bot.get_file_path(&video.file_id).await?;
            let data = bot.download(&file_path).await?;

            let file_id = Uuid::new_v4();
            state
                .storage
                .write(&note_file_key(note_id, file_id), &data)
                .await?;
            let url = format!("/api/files/{}/{}", note_id, file_id);
            videos.push(url.clone());
            media_embeds.push(video_embed(&url));
        }
    }

    if let Some(document) = document {
        let file_name = document
            .file_name
            .clone()
            .unwrap_or_else(|| format!("document_{}", message.message_id));

        if settings.telegram_proxy {
            // Proxied documents keep only their Telegram identity; there is
            // no local blob to address.
            files_meta.push(FileMeta {
                id: None,
                name: file_name,
                size: document.file_size.unwrap_or(0),
                content_type: "telegram_document".to_string(),
                public_id: None,
                file_id: Some(document.file_id.clone()),
            });
        } else {
            let file_path = bot.get_file_path(&document.file_id).await?;
            let data = bot.download(&file_path).await?;

            let content_type = document.mime_type.clone().unwrap_or_else(|| {
                infer::get(&data)
                    .map(|k| k.mime_type().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string())
            });

            let file_id = Uuid::new_v4();
            state
                .storage
                .write(&note_file_key(note_id, file_id), &data)
                .await?;
            files_meta.push(FileMeta::stored(
                file_id,
                file_name,
                data.len() as i64,
                content_type,
            ));
        }
    }

    let content = assemble_note(
        forward_header(message),
        &media_embeds,
        reply_quote(message),
        &body,
    );

    state
        .db
        .notes
        .update_content(note_id, &content, &files_meta, true)
        .await?;
    if !videos.is_empty() {
        state.db.notes.set_videos(note_id, &videos).await?;
    }
    state.db.tags.sync_note_tags(note_id, &content).await?;

    Ok(Some(note_id))
}
