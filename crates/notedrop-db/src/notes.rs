//! Note repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};

use notedrop_core::{
    AttachmentEntry, AttachmentKind, CreateNoteRequest, Error, FileMeta, ListNotesRequest,
    ListNotesResponse, Note, NoteFlag, NoteRepository, NoteStats, Result,
};

use crate::content::extract_image_urls;

/// Notes per page for listing and search.
pub const NOTES_PER_PAGE: i64 = 10;

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_in_tx(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<Note> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;
        row.map(|r| note_from_row(&r))
            .ok_or(Error::NoteNotFound(id))
    }
}

/// Deserialize a JSONB column leniently; malformed data becomes empty.
fn json_vec<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Vec<T> {
    serde_json::from_value(value).unwrap_or_default()
}

/// Map a database row to a Note.
pub(crate) fn note_from_row(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        content: row.get("content"),
        files: json_vec(row.get::<serde_json::Value, _>("files")),
        pics: json_vec(row.get::<serde_json::Value, _>("pics")),
        videos: json_vec(row.get::<serde_json::Value, _>("videos")),
        is_pinned: row.get("is_pinned"),
        is_favorited: row.get("is_favorited"),
        is_archived: row.get("is_archived"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Build WHERE/JOIN fragments shared by list and search queries.
///
/// Returns (join clause, where clauses, next free parameter index).
pub(crate) fn build_note_filters(
    req: &ListNotesRequest,
    mut param_idx: usize,
) -> (&'static str, Vec<String>, usize) {
    let mut clauses: Vec<String> = Vec::new();

    // The default listing (favorites included) excludes archived notes.
    if req.archived {
        clauses.push("n.is_archived = TRUE".to_string());
    } else {
        clauses.push("n.is_archived = FALSE".to_string());
    }

    if req.updated_after.is_some() && req.updated_before.is_some() {
        clauses.push(format!(
            "n.updated_at >= ${} AND n.updated_at < ${}",
            param_idx,
            param_idx + 1
        ));
        param_idx += 2;
    }

    let mut join = "";
    if req.tag.is_some() {
        join = "JOIN note_tags nt ON nt.note_id = n.id JOIN tags t ON t.id = nt.tag_id";
        clauses.push(format!("t.name = ${}", param_idx));
        param_idx += 1;
    }

    if req.favorites {
        clauses.push("n.is_favorited = TRUE".to_string());
    }

    (join, clauses, param_idx)
}

/// Macro to bind ListNotesRequest filter parameters in clause order.
macro_rules! bind_note_filters {
    ($query:expr, $req:expr) => {{
        let mut q = $query;
        if let (Some(after), Some(before)) = (&$req.updated_after, &$req.updated_before) {
            q = q.bind(after).bind(before);
        }
        if let Some(tag) = &$req.tag {
            q = q.bind(tag);
        }
        q
    }};
}

pub(crate) use bind_note_filters;

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<i64> {
        let pics = extract_image_urls(&req.content);
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO notes (content, files, pics, videos, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING id",
        )
        .bind(&req.content)
        .bind(serde_json::to_value(&req.files)?)
        .bind(serde_json::to_value(&pics)?)
        .bind(serde_json::to_value(&req.videos)?)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    async fn fetch(&self, id: i64) -> Result<Note> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|r| note_from_row(&r))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn list(&self, req: ListNotesRequest) -> Result<ListNotesResponse> {
        let page = req.page.max(1);
        let offset = (page - 1) * NOTES_PER_PAGE;

        let (join, clauses, param_idx) = build_note_filters(&req, 1);
        let sql = format!(
            "SELECT n.* FROM notes n {} WHERE {}
             ORDER BY n.is_pinned DESC, n.updated_at DESC
             LIMIT ${} OFFSET ${}",
            join,
            clauses.join(" AND "),
            param_idx,
            param_idx + 1
        );

        let query = bind_note_filters!(sqlx::query(&sql), req)
            .bind(NOTES_PER_PAGE + 1)
            .bind(offset);
        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let has_more = rows.len() as i64 > NOTES_PER_PAGE;
        let notes = rows
            .into_iter()
            .take(NOTES_PER_PAGE as usize)
            .map(|r| note_from_row(&r))
            .collect();

        Ok(ListNotesResponse { notes, has_more })
    }

    async fn update_content(
        &self,
        id: i64,
        content: &str,
        files: &[FileMeta],
        touch: bool,
    ) -> Result<()> {
        let pics = extract_image_urls(content);
        let result = sqlx::query(
            "UPDATE notes
             SET content = $1, files = $2, pics = $3,
                 updated_at = CASE WHEN $4 THEN $5 ELSE updated_at END
             WHERE id = $6",
        )
        .bind(content)
        .bind(serde_json::to_value(files)?)
        .bind(serde_json::to_value(&pics)?)
        .bind(touch)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn update_files(&self, id: i64, files: &[FileMeta]) -> Result<()> {
        let result = sqlx::query("UPDATE notes SET files = $1 WHERE id = $2")
            .bind(serde_json::to_value(files)?)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn set_videos(&self, id: i64, videos: &[String]) -> Result<()> {
        let result = sqlx::query("UPDATE notes SET videos = $1 WHERE id = $2")
            .bind(serde_json::to_value(videos)?)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn set_flag(&self, id: i64, flag: NoteFlag, value: bool) -> Result<()> {
        let sql = match flag {
            NoteFlag::Pinned => "UPDATE notes SET is_pinned = $1 WHERE id = $2",
            NoteFlag::Favorited => "UPDATE notes SET is_favorited = $1 WHERE id = $2",
            NoteFlag::Archived => "UPDATE notes SET is_archived = $1 WHERE id = $2",
        };
        let result = sqlx::query(sql)
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn merge(
        &self,
        source_id: i64,
        target_id: i64,
        add_separator: bool,
    ) -> Result<(Note, Vec<FileMeta>)> {
        if source_id == target_id {
            return Err(Error::InvalidInput(
                "cannot merge a note into itself".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let source = Self::fetch_in_tx(&mut tx, source_id).await?;
        let target = Self::fetch_in_tx(&mut tx, target_id).await?;

        // Target content first, source appended. The target keeps its
        // timestamp so merging does not reorder the stream.
        let separator = if add_separator { "\n\n---\n\n" } else { "\n\n" };
        let merged_content = format!("{}{}{}", target.content, separator, source.content);
        let merged_files: Vec<FileMeta> = target
            .files
            .iter()
            .chain(source.files.iter())
            .cloned()
            .collect();
        let pics = extract_image_urls(&merged_content);

        sqlx::query("UPDATE notes SET content = $1, files = $2, pics = $3 WHERE id = $4")
            .bind(&merged_content)
            .bind(serde_json::to_value(&merged_files)?)
            .bind(serde_json::to_value(&pics)?)
            .bind(target_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let merged = Self::fetch_in_tx(&mut tx, target_id).await?;
        tx.commit().await.map_err(Error::Database)?;

        Ok((merged, source.files))
    }

    async fn stats(&self) -> Result<NoteStats> {
        let (memos_row, tags_row, oldest_row) = tokio::try_join!(
            sqlx::query("SELECT COUNT(*) AS total FROM notes").fetch_one(&self.pool),
            sqlx::query("SELECT COUNT(DISTINCT tag_id) AS total FROM note_tags")
                .fetch_one(&self.pool),
            sqlx::query("SELECT MIN(updated_at) AS oldest FROM notes").fetch_one(&self.pool),
        )
        .map_err(Error::Database)?;

        Ok(NoteStats {
            memos: memos_row.get("total"),
            tags: tags_row.get("total"),
            oldest_note_timestamp: oldest_row.get("oldest"),
        })
    }

    async fn update_timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        let rows = sqlx::query("SELECT updated_at FROM notes ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.into_iter().map(|r| r.get("updated_at")).collect())
    }

    async fn list_attachments(
        &self,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<AttachmentEntry>, bool)> {
        let offset = (page.max(1) - 1) * per_page;

        // One pass over all three media columns, newest note first.
        let rows = sqlx::query(
            r#"
            WITH combined_attachments AS (
                SELECT n.id AS note_id, n.updated_at AS ts, 'image' AS kind,
                       p.value #>> '{}' AS url,
                       NULL AS name, NULL::bigint AS size, NULL::uuid AS file_id
                FROM notes n, jsonb_array_elements(n.pics) AS p(value)

                UNION ALL

                SELECT n.id AS note_id, n.updated_at AS ts, 'video' AS kind,
                       v.value #>> '{}' AS url,
                       NULL AS name, NULL::bigint AS size, NULL::uuid AS file_id
                FROM notes n, jsonb_array_elements(n.videos) AS v(value)

                UNION ALL

                SELECT n.id AS note_id, n.updated_at AS ts, 'file' AS kind,
                       NULL AS url,
                       f.value ->> 'name' AS name,
                       (f.value ->> 'size')::bigint AS size,
                       (f.value ->> 'id')::uuid AS file_id
                FROM notes n, jsonb_array_elements(n.files) AS f(value)
            )
            SELECT * FROM combined_attachments
            ORDER BY ts DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page + 1)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let has_more = rows.len() as i64 > per_page;
        let entries = rows
            .into_iter()
            .take(per_page as usize)
            .map(|row| {
                let kind = match row.get::<&str, _>("kind") {
                    "image" => AttachmentKind::Image,
                    "video" => AttachmentKind::Video,
                    _ => AttachmentKind::File,
                };
                AttachmentEntry {
                    note_id: row.get("note_id"),
                    timestamp: row.get("ts"),
                    kind,
                    url: row.get("url"),
                    name: row.get("name"),
                    size: row.get("size"),
                    id: row.get("file_id"),
                }
            })
            .collect();

        Ok((entries, has_more))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_request() -> ListNotesRequest {
        ListNotesRequest {
            page: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_filters_exclude_archived() {
        let (join, clauses, next_idx) = build_note_filters(&list_request(), 1);
        assert_eq!(join, "");
        assert_eq!(clauses, vec!["n.is_archived = FALSE"]);
        assert_eq!(next_idx, 1);
    }

    #[test]
    fn test_archived_filter_inverts() {
        let req = ListNotesRequest {
            archived: true,
            ..list_request()
        };
        let (_, clauses, _) = build_note_filters(&req, 1);
        assert_eq!(clauses[0], "n.is_archived = TRUE");
    }

    #[test]
    fn test_tag_filter_adds_join_and_param() {
        let req = ListNotesRequest {
            tag: Some("rust".to_string()),
            ..list_request()
        };
        let (join, clauses, next_idx) = build_note_filters(&req, 1);
        assert!(join.contains("JOIN note_tags"));
        assert!(clauses.contains(&"t.name = $1".to_string()));
        assert_eq!(next_idx, 2);
    }

    #[test]
    fn test_date_range_consumes_two_params() {
        let now = Utc::now();
        let req = ListNotesRequest {
            updated_after: Some(now),
            updated_before: Some(now),
            tag: Some("x".to_string()),
            favorites: true,
            ..list_request()
        };
        let (_, clauses, next_idx) = build_note_filters(&req, 1);
        assert!(clauses.contains(&"n.updated_at >= $1 AND n.updated_at < $2".to_string()));
        assert!(clauses.contains(&"t.name = $3".to_string()));
        assert!(clauses.contains(&"n.is_favorited = TRUE".to_string()));
        assert_eq!(next_idx, 4);
    }

    #[test]
    fn test_half_open_date_range_is_ignored() {
        let req = ListNotesRequest {
            updated_after: Some(Utc::now()),
            ..list_request()
        };
        let (_, clauses, next_idx) = build_note_filters(&req, 1);
        assert_eq!(clauses.len(), 1);
        assert_eq!(next_idx, 1);
    }

    #[test]
    fn test_json_vec_tolerates_malformed_data() {
        let files: Vec<FileMeta> = json_vec(serde_json::json!("not an array"));
        assert!(files.is_empty());

        let urls: Vec<String> = json_vec(serde_json::json!(["/a", "/b"]));
        assert_eq!(urls, vec!["/a", "/b"]);
    }
}
