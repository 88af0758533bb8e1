//! User settings persistence in the KV store.

use notedrop_core::{Result, Settings};

use crate::services::kv::KvStore;

/// KV key the settings object lives under.
const SETTINGS_KEY: &str = "user_settings";

/// Load settings, falling back to defaults when none are stored.
///
/// Fields missing from an older stored object pick up their defaults
/// through serde.
pub async fn load(kv: &KvStore) -> Result<Settings> {
    Ok(kv.get_json(SETTINGS_KEY).await?.unwrap_or_default())
}

/// Persist the full settings object.
pub async fn store(kv: &KvStore, settings: &Settings) -> Result<()> {
    kv.put_json(SETTINGS_KEY, settings, None).await
}
