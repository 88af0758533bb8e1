//! Full-text search over notes.
//!
//! Uses the generated tsvector column on `notes` with
//! `websearch_to_tsquery`, ranked by `ts_rank`. The same stacked filters
//! and limit+1 pagination as the plain listing apply on top.

use sqlx::{Pool, Postgres};

use notedrop_core::{Error, ListNotesRequest, ListNotesResponse, Result};

use crate::notes::{bind_note_filters, build_note_filters, note_from_row, NOTES_PER_PAGE};

/// Queries shorter than this return no results instead of scanning.
pub const MIN_QUERY_LEN: usize = 2;

/// Full-text search provider using PostgreSQL tsvector.
pub struct PgNoteSearch {
    pool: Pool<Postgres>,
}

impl PgNoteSearch {
    /// Create a new PgNoteSearch with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search note content, applying the request's filters on top.
    ///
    /// The caller is expected to fall back to plain listing for empty
    /// queries; queries shorter than [`MIN_QUERY_LEN`] return empty.
    pub async fn search(&self, query: &str, req: &ListNotesRequest) -> Result<ListNotesResponse> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(ListNotesResponse {
                notes: Vec::new(),
                has_more: false,
            });
        }

        let page = req.page.max(1);
        let offset = (page - 1) * NOTES_PER_PAGE;

        // $1 is the query text; filters start at $2.
        let (join, clauses, param_idx) = build_note_filters(req, 2);
        let sql = format!(
            "SELECT n.* FROM notes n {}
             WHERE n.tsv @@ websearch_to_tsquery('simple', $1) AND {}
             ORDER BY ts_rank(n.tsv, websearch_to_tsquery('simple', $1)) DESC
             LIMIT ${} OFFSET ${}",
            join,
            clauses.join(" AND "),
            param_idx,
            param_idx + 1
        );

        let q = bind_note_filters!(sqlx::query(&sql).bind(query), req)
            .bind(NOTES_PER_PAGE + 1)
            .bind(offset);
        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let has_more = rows.len() as i64 > NOTES_PER_PAGE;
        let notes = rows
            .into_iter()
            .take(NOTES_PER_PAGE as usize)
            .map(|r| note_from_row(&r))
            .collect();

        Ok(ListNotesResponse { notes, has_more })
    }
}
