//! # notedrop-db
//!
//! PostgreSQL and blob storage layer for notedrop.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for notes, tags, and doc nodes
//! - Full-text search with PostgreSQL tsvector
//! - Content scanning (inline hashtags, embedded image URLs)
//! - A pluggable blob storage backend with a filesystem implementation
//!
//! ## Example
//!
//! ```rust,ignore
//! use notedrop_db::Database;
//! use notedrop_core::{CreateNoteRequest, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/notedrop").await?;
//!
//!     let note_id = db.notes.insert(CreateNoteRequest {
//!         content: "Hello #world".to_string(),
//!         ..Default::default()
//!     }).await?;
//!
//!     println!("Created note: {}", note_id);
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod docs;
pub mod file_storage;
pub mod notes;
pub mod pool;
pub mod search;
pub mod tags;

// Re-export core types
pub use notedrop_core::*;

// Re-export repository implementations and helpers
pub use content::{extract_hashtags, extract_image_urls};
pub use docs::{build_tree, PgDocRepository};
pub use file_storage::{note_file_key, upload_key, FilesystemBackend, StorageBackend};
pub use notes::{PgNoteRepository, NOTES_PER_PAGE};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use search::{PgNoteSearch, MIN_QUERY_LEN};
pub use tags::PgTagRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository for CRUD operations.
    pub notes: PgNoteRepository,
    /// Tag repository for hashtag-derived tagging.
    pub tags: PgTagRepository,
    /// Doc node repository for the hierarchical docs tree.
    pub docs: PgDocRepository,
    /// Full-text search provider.
    pub search: PgNoteSearch,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            docs: PgDocRepository::new(pool.clone()),
            search: PgNoteSearch::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
