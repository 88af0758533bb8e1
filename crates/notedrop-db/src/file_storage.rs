//! Blob storage for note attachments and uploaded images.
//!
//! Blobs are addressed by string keys. Note attachments live under
//! `notes/{note_id}/{file_id}`, standalone uploads under
//! `uploads/{image_id}`; metadata stays on the note row.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use notedrop_core::Result;

/// Storage key for a note attachment blob.
pub fn note_file_key(note_id: i64, file_id: Uuid) -> String {
    format!("notes/{}/{}", note_id, file_id)
}

/// Storage key for a standalone uploaded image.
pub fn upload_key(image_id: Uuid) -> String {
    format!("uploads/{}", image_id)
}

/// Storage backend trait for different storage implementations.
///
/// Allows abstracting over filesystem, S3, or other storage providers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified key.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified key.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete data at the specified key. Deleting a missing key is not an
    /// error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if data exists at the specified key.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete several keys, continuing past missing ones.
    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}

/// Filesystem storage backend.
///
/// Stores blobs under a base directory, one file per key.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing mounts) before the first upload does.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key);
        debug!(storage_key = %key, size = data.len(), "blob write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "blob create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename.
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "blob rename failed");
            e
        })?;

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full_path = self.full_path(key);
        match fs::read(&full_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_file_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            note_file_key(42, id),
            "notes/42/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_upload_key_layout() {
        let id = Uuid::nil();
        assert_eq!(upload_key(id), "uploads/00000000-0000-0000-0000-000000000000");
    }

    #[tokio::test]
    async fn test_filesystem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        let key = note_file_key(1, Uuid::new_v4());
        backend.write(&key, b"payload").await.unwrap();
        assert!(backend.exists(&key).await.unwrap());
        assert_eq!(backend.read(&key).await.unwrap().unwrap(), b"payload");

        backend.delete(&key).await.unwrap();
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        assert!(backend.read("notes/9/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.delete("uploads/nothing").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_many_continues_past_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        let key = upload_key(Uuid::new_v4());
        backend.write(&key, b"x").await.unwrap();

        backend
            .delete_many(&["uploads/absent".to_string(), key.clone()])
            .await
            .unwrap();
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.validate().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        let key = upload_key(Uuid::new_v4());
        backend.write(&key, b"one").await.unwrap();
        backend.write(&key, b"two").await.unwrap();
        assert_eq!(backend.read(&key).await.unwrap().unwrap(), b"two");
    }
}
