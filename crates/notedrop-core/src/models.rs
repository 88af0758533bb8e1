//! Core data models for notedrop.
//!
//! These types are shared across all notedrop crates and represent
//! the core domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note with its content and denormalized media references.
///
/// `files` holds non-image attachments; `pics` and `videos` hold URLs of
/// media referenced from the content body (images embedded via Markdown
/// syntax, videos embedded via HTML tags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub files: Vec<FileMeta>,
    pub pics: Vec<String>,
    pub videos: Vec<String>,
    pub is_pinned: bool,
    pub is_favorited: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for a file attached to a note.
///
/// For blob-backed attachments `id` is the storage key component. Proxied
/// Telegram documents carry a `file_id` instead and no local blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Public share link ID, set once the file has been shared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_id: Option<Uuid>,
    /// Telegram file_id for proxy-mode documents (no local blob).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl FileMeta {
    /// Metadata for a locally stored attachment blob.
    pub fn stored(id: Uuid, name: impl Into<String>, size: i64, content_type: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            size,
            content_type: content_type.into(),
            public_id: None,
            file_id: None,
        }
    }
}

/// A tag together with the number of notes that carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Aggregate counters shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub memos: i64,
    pub tags: i64,
    pub oldest_note_timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// DOC NODE TYPES
// =============================================================================

/// Kind of a hierarchical doc node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocNodeKind {
    File,
    Folder,
}

/// A single doc node row (flat, parent-pointer form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: DocNodeKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A doc node with its children resolved, as served by the tree endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocTreeNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: DocNodeKind,
    pub title: String,
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<DocTreeNode>,
}

// =============================================================================
// ATTACHMENT BROWSER TYPES
// =============================================================================

/// Kind of an entry in the cross-note attachment listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

/// One entry in the cross-note attachment listing.
///
/// Images and videos carry a `url`; file attachments carry name/size/id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub note_id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Where pasted editor images are uploaded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageUploadDestination {
    Local,
    Imgur,
}

/// User-tunable settings persisted in the KV store.
///
/// Every field has a default so that settings written by older versions
/// deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub show_search_bar: bool,
    pub show_stats_card: bool,
    pub show_calendar: bool,
    pub show_tags: bool,
    pub show_timeline: bool,
    pub show_right_sidebar: bool,
    pub hide_editor_in_waterfall: bool,
    pub show_heatmap: bool,
    pub image_upload_destination: ImageUploadDestination,
    pub imgur_client_id: String,
    pub surface_color: String,
    pub surface_color_dark: String,
    pub surface_opacity: f32,
    pub background_opacity: f32,
    pub background_image: String,
    pub background_blur: u32,
    pub waterfall_card_width: u32,
    pub enable_date_grouping: bool,
    /// Serve Telegram media through the proxy endpoint instead of
    /// re-uploading it into blob storage.
    pub telegram_proxy: bool,
    pub show_favorites: bool,
    pub show_archive: bool,
    pub enable_pinning: bool,
    pub enable_sharing: bool,
    pub show_docs: bool,
    pub enable_content_truncation: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_search_bar: true,
            show_stats_card: true,
            show_calendar: true,
            show_tags: true,
            show_timeline: true,
            show_right_sidebar: true,
            hide_editor_in_waterfall: false,
            show_heatmap: true,
            image_upload_destination: ImageUploadDestination::Local,
            imgur_client_id: String::new(),
            surface_color: "#ffffff".to_string(),
            surface_color_dark: "#151f31".to_string(),
            surface_opacity: 1.0,
            background_opacity: 1.0,
            background_image: "/bg.jpg".to_string(),
            background_blur: 0,
            waterfall_card_width: 320,
            enable_date_grouping: false,
            telegram_proxy: false,
            show_favorites: true,
            show_archive: true,
            enable_pinning: true,
            enable_sharing: true,
            show_docs: true,
            enable_content_truncation: false,
        }
    }
}

// =============================================================================
// SESSIONS & SHARE LINKS
// =============================================================================

/// Session payload stored in the KV store under `session:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

/// KV payload for a public note share link (`public_memo:{public_id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteShare {
    pub note_id: i64,
}

/// KV payload for a public file share link (`public_file:{public_id}`).
///
/// Either a note attachment (`note_id` + `file_id`) or a standalone
/// uploaded image (`standalone_image_id`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileShare {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standalone_image_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}
