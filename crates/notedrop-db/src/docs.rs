//! Hierarchical doc node repository.
//!
//! Nodes form a parent-pointer tree. Children of a deleted node are removed
//! by the `ON DELETE CASCADE` constraint, so deletion is a single statement.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use notedrop_core::{
    CreateDocNodeRequest, DocNode, DocNodeKind, DocRepository, DocTreeNode, Error, Result,
};

/// PostgreSQL implementation of DocRepository.
pub struct PgDocRepository {
    pool: Pool<Postgres>,
}

impl PgDocRepository {
    /// Create a new PgDocRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn kind_from_str(kind: &str) -> DocNodeKind {
    match kind {
        "folder" => DocNodeKind::Folder,
        _ => DocNodeKind::File,
    }
}

fn kind_to_str(kind: DocNodeKind) -> &'static str {
    match kind {
        DocNodeKind::File => "file",
        DocNodeKind::Folder => "folder",
    }
}

fn node_from_row(row: &PgRow) -> DocNode {
    DocNode {
        id: row.get("id"),
        kind: kind_from_str(row.get("kind")),
        title: row.get("title"),
        content: row.get("content"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Fold a flat node list into a tree rooted at `parent_id`.
///
/// Sibling order follows the input order (title-sorted by the query).
pub fn build_tree(nodes: &[DocNode], parent_id: Option<Uuid>) -> Vec<DocTreeNode> {
    nodes
        .iter()
        .filter(|node| node.parent_id == parent_id)
        .map(|node| DocTreeNode {
            id: node.id,
            kind: node.kind,
            title: node.title.clone(),
            parent_id: node.parent_id,
            children: build_tree(nodes, Some(node.id)),
        })
        .collect()
}

#[async_trait]
impl DocRepository for PgDocRepository {
    async fn tree(&self) -> Result<Vec<DocTreeNode>> {
        let rows = sqlx::query(
            "SELECT id, kind, title, NULL AS content, parent_id, created_at, updated_at
             FROM nodes ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let nodes: Vec<DocNode> = rows.iter().map(node_from_row).collect();
        Ok(build_tree(&nodes, None))
    }

    async fn create(&self, req: CreateDocNodeRequest) -> Result<DocNode> {
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput("title is required".to_string()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        // New files open with a heading so the editor never shows a void.
        let content = match req.kind {
            DocNodeKind::File => Some(format!("# {}", req.title)),
            DocNodeKind::Folder => None,
        };

        sqlx::query(
            "INSERT INTO nodes (id, kind, title, content, parent_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(kind_to_str(req.kind))
        .bind(&req.title)
        .bind(&content)
        .bind(req.parent_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(DocNode {
            id,
            kind: req.kind,
            title: req.title,
            content,
            parent_id: req.parent_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: Uuid) -> Result<DocNode> {
        let row = sqlx::query(
            "SELECT id, kind, title, content, parent_id, created_at, updated_at
             FROM nodes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| node_from_row(&r))
            .ok_or(Error::DocNodeNotFound(id))
    }

    async fn update_content(&self, id: Uuid, content: &str) -> Result<()> {
        let result = sqlx::query("UPDATE nodes SET content = $1, updated_at = $2 WHERE id = $3")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::DocNodeNotFound(id));
        }
        Ok(())
    }

    async fn rename(&self, id: Uuid, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("a valid new title is required".to_string()));
        }

        let result = sqlx::query("UPDATE nodes SET title = $1, updated_at = $2 WHERE id = $3")
            .bind(title)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::DocNodeNotFound(id));
        }
        Ok(())
    }

    async fn move_node(&self, id: Uuid, new_parent_id: Option<Uuid>) -> Result<()> {
        let node = self.get(id).await?;

        if Some(id) == new_parent_id {
            return Err(Error::InvalidInput(
                "cannot move a node into itself".to_string(),
            ));
        }
        if node.parent_id == new_parent_id {
            // Already there.
            return Ok(());
        }

        if let Some(parent_id) = new_parent_id {
            let parent = self
                .get(parent_id)
                .await
                .map_err(|_| Error::NotFound("target destination does not exist".to_string()))?;
            if parent.kind != DocNodeKind::Folder {
                return Err(Error::InvalidInput(
                    "target destination must be a folder".to_string(),
                ));
            }

            // Walk up from the target; hitting the moved node means the
            // target sits inside its own subtree.
            let mut current = Some(parent_id);
            while let Some(current_id) = current {
                if current_id == id {
                    return Err(Error::InvalidInput(
                        "cannot move a folder into one of its own descendants".to_string(),
                    ));
                }
                let row = sqlx::query("SELECT parent_id FROM nodes WHERE id = $1")
                    .bind(current_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(Error::Database)?;
                current = match row {
                    Some(r) => r.get("parent_id"),
                    // Broken chain; stop walking rather than erroring.
                    None => None,
                };
            }
        }

        sqlx::query("UPDATE nodes SET parent_id = $1, updated_at = $2 WHERE id = $3")
            .bind(new_parent_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::DocNodeNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u128, parent: Option<u128>, title: &str) -> DocNode {
        let now = Utc::now();
        DocNode {
            id: Uuid::from_u128(id),
            kind: DocNodeKind::File,
            title: title.to_string(),
            content: None,
            parent_id: parent.map(Uuid::from_u128),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_tree_nests_children() {
        let nodes = vec![
            node(1, None, "root"),
            node(2, Some(1), "child"),
            node(3, Some(2), "grandchild"),
        ];
        let tree = build_tree(&nodes, None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].title, "root");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].title, "grandchild");
    }

    #[test]
    fn test_build_tree_multiple_roots_keep_input_order() {
        let nodes = vec![node(1, None, "alpha"), node(2, None, "beta")];
        let tree = build_tree(&nodes, None);
        let titles: Vec<&str> = tree.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_build_tree_orphaned_node_is_dropped() {
        // Parent 99 is not in the list, so the node is unreachable.
        let nodes = vec![node(1, None, "root"), node(2, Some(99), "orphan")];
        let tree = build_tree(&nodes, None);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_build_tree_leaf_children_empty() {
        let nodes = vec![node(1, None, "only")];
        let tree = build_tree(&nodes, None);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(kind_from_str(kind_to_str(DocNodeKind::Folder)), DocNodeKind::Folder);
        assert_eq!(kind_from_str(kind_to_str(DocNodeKind::File)), DocNodeKind::File);
        // Unknown kinds degrade to file.
        assert_eq!(kind_from_str("mystery"), DocNodeKind::File);
    }
}
