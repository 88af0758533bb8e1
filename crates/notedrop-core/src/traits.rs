//! Core traits for notedrop abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Request for listing notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// 1-based page number.
    pub page: i64,
    /// Filter by tag name (exact match).
    pub tag: Option<String>,
    /// Only favorited notes.
    pub favorites: bool,
    /// Only archived notes. When false, archived notes are excluded.
    pub archived: bool,
    /// Only notes updated at or after this instant.
    pub updated_after: Option<DateTime<Utc>>,
    /// Only notes updated before this instant.
    pub updated_before: Option<DateTime<Utc>>,
}

/// Response for listing or searching notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotesResponse {
    pub notes: Vec<Note>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// Request for creating a new note.
///
/// Tracked pic URLs are derived from the content's Markdown image syntax
/// by the repository, not supplied here. Videos cannot be derived (they
/// are embedded as HTML) and are passed through.
#[derive(Debug, Clone, Default)]
pub struct CreateNoteRequest {
    pub content: String,
    pub files: Vec<FileMeta>,
    pub videos: Vec<String>,
}

/// One boolean note flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFlag {
    Pinned,
    Favorited,
    Archived,
}

/// Repository for note CRUD operations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note and return its ID.
    async fn insert(&self, req: CreateNoteRequest) -> Result<i64>;

    /// Fetch a note by ID.
    async fn fetch(&self, id: i64) -> Result<Note>;

    /// List notes with filtering and limit+1 pagination.
    async fn list(&self, req: ListNotesRequest) -> Result<ListNotesResponse>;

    /// Replace content, attachment metadata, and tracked pic URLs.
    /// `touch` controls whether `updated_at` is bumped.
    async fn update_content(
        &self,
        id: i64,
        content: &str,
        files: &[FileMeta],
        touch: bool,
    ) -> Result<()>;

    /// Replace attachment metadata only.
    async fn update_files(&self, id: i64, files: &[FileMeta]) -> Result<()>;

    /// Replace the tracked video URLs only.
    async fn set_videos(&self, id: i64, videos: &[String]) -> Result<()>;

    /// Set a single boolean flag (pin/favorite/archive).
    async fn set_flag(&self, id: i64, flag: NoteFlag, value: bool) -> Result<()>;

    /// Delete a note row. Tag links go with it via FK cascade.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Merge `source` into `target`: concatenated content (target first),
    /// concatenated files, target's timestamp kept, source row deleted.
    /// Returns the merged note and the source's files so the caller can
    /// relocate their blobs.
    async fn merge(
        &self,
        source_id: i64,
        target_id: i64,
        add_separator: bool,
    ) -> Result<(Note, Vec<FileMeta>)>;

    /// Aggregate dashboard counters.
    async fn stats(&self) -> Result<NoteStats>;

    /// All note update timestamps, newest first, for timeline bucketing.
    async fn update_timestamps(&self) -> Result<Vec<DateTime<Utc>>>;

    /// All media entries across notes, newest note first, limit+1 paginated.
    async fn list_attachments(&self, page: i64, per_page: i64)
        -> Result<(Vec<AttachmentEntry>, bool)>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for tag management.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Re-derive a note's tag links from its content hashtags.
    async fn sync_note_tags(&self, note_id: i64, content: &str) -> Result<()>;

    /// All used tags with note counts, count desc then name asc.
    async fn list_with_counts(&self) -> Result<Vec<TagCount>>;
}

// =============================================================================
// DOC REPOSITORY
// =============================================================================

/// Request for creating a doc node.
#[derive(Debug, Clone)]
pub struct CreateDocNodeRequest {
    pub kind: DocNodeKind,
    pub title: String,
    pub parent_id: Option<Uuid>,
}

/// Repository for hierarchical doc nodes.
#[async_trait]
pub trait DocRepository: Send + Sync {
    /// Fetch all nodes and fold them into a tree.
    async fn tree(&self) -> Result<Vec<DocTreeNode>>;

    /// Create a node. File nodes are seeded with a `# {title}` heading.
    async fn create(&self, req: CreateDocNodeRequest) -> Result<DocNode>;

    /// Fetch a single node with content.
    async fn get(&self, id: Uuid) -> Result<DocNode>;

    /// Replace a node's content.
    async fn update_content(&self, id: Uuid, content: &str) -> Result<()>;

    /// Rename a node.
    async fn rename(&self, id: Uuid, title: &str) -> Result<()>;

    /// Re-parent a node. Validates the target is an existing folder and
    /// not the node itself or one of its descendants.
    async fn move_node(&self, id: Uuid, new_parent_id: Option<Uuid>) -> Result<()>;

    /// Delete a node; children are removed by the DB cascade.
    async fn delete(&self, id: Uuid) -> Result<()>;
}
