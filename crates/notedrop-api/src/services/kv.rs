//! Redis-backed key-value store for sessions, settings, and share links.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use notedrop_core::{Error, Result};

/// Key-value store backed by Redis.
///
/// Values are stored as JSON strings; an optional TTL (seconds) makes the
/// key expire.
#[derive(Clone)]
pub struct KvStore {
    connection: Arc<RwLock<ConnectionManager>>,
}

impl KvStore {
    /// Connect using `REDIS_URL` from the environment.
    pub async fn from_env() -> Result<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::connect(&redis_url).await
    }

    /// Connect to the given Redis URL.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client =
            redis::Client::open(redis_url).map_err(|e| Error::Kv(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Kv(e.to_string()))?;
        info!("kv store connected");
        Ok(Self {
            connection: Arc::new(RwLock::new(connection)),
        })
    }

    /// Fetch and deserialize a value. Missing keys return `None`;
    /// undeserializable values are treated as missing.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.write().await;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| Error::Kv(e.to_string()))?;
        Ok(raw.and_then(|data| serde_json::from_str(&data).ok()))
    }

    /// Serialize and store a value, optionally with a TTL in seconds.
    pub async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        let mut conn = self.connection.write().await;
        match ttl_seconds {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, serialized, ttl)
                .await
                .map_err(|e| Error::Kv(e.to_string()))?,
            None => conn
                .set::<_, _, ()>(key, serialized)
                .await
                .map_err(|e| Error::Kv(e.to_string()))?,
        }
        Ok(())
    }

    /// Delete a key. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.write().await;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::Kv(e.to_string()))?;
        Ok(())
    }
}
