//! Tag repository implementation.
//!
//! Tags are not edited directly: every note create/update re-derives the
//! note's tag links from the hashtags found in its content.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use notedrop_core::{Error, Result, TagCount, TagRepository};

use crate::content::extract_hashtags;

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn sync_note_tags(&self, note_id: i64, content: &str) -> Result<()> {
        let tags = extract_hashtags(content);

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for tag in &tags {
            sqlx::query("INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(tag)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;

            sqlx::query(
                "INSERT INTO note_tags (note_id, tag_id)
                 SELECT $1, id FROM tags WHERE name = $2
                 ON CONFLICT (note_id, tag_id) DO NOTHING",
            )
            .bind(note_id)
            .bind(tag)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn list_with_counts(&self) -> Result<Vec<TagCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.name, COUNT(nt.note_id) AS count
            FROM tags t
            LEFT JOIN note_tags nt ON t.id = nt.tag_id
            GROUP BY t.id, t.name
            HAVING COUNT(nt.note_id) > 0
            ORDER BY count DESC, t.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| TagCount {
                name: row.get("name"),
                count: row.get("count"),
            })
            .collect();

        Ok(tags)
    }
}
