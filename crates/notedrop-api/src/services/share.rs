//! Public share links for notes and files.
//!
//! Share state lives entirely in the KV store:
//! - `note_share:{note_id}` → the note's public ID (for idempotent sharing)
//! - `public_memo:{public_id}` → [`NoteShare`] payload
//! - `public_file:{public_id}` → [`FileShare`] payload
//!
//! Shared note content must not leak authenticated URLs, so private
//! `/api/files/...` and `/api/images/...` references are rewritten to
//! freshly minted public file links before serving.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use notedrop_core::{Error, FileShare, NoteShare, Result};

use crate::services::kv::KvStore;

/// Default share lifetime when the caller does not pick one: 1 hour.
pub const DEFAULT_SHARE_TTL_SECONDS: i64 = 3600;

/// Any private media URL appearing in note content.
static PRIVATE_MEDIA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/api/(?:files|images)/[a-zA-Z0-9/-]+").unwrap());

/// A note attachment URL: `/api/files/{note_id}/{file_id}`.
static PRIVATE_FILE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/files/(\d+)/([a-zA-Z0-9-]+)$").unwrap());

/// A standalone image URL: `/api/images/{image_id}`.
static PRIVATE_IMAGE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/images/([a-zA-Z0-9-]+)$").unwrap());

pub fn note_share_key(note_id: i64) -> String {
    format!("note_share:{}", note_id)
}

pub fn public_memo_key(public_id: &str) -> String {
    format!("public_memo:{}", public_id)
}

pub fn public_file_key(public_id: &str) -> String {
    format!("public_file:{}", public_id)
}

fn ttl_option(ttl_seconds: i64) -> Option<u64> {
    // Zero or negative means "never expires".
    (ttl_seconds > 0).then_some(ttl_seconds as u64)
}

/// Create a share link for a note, or return the existing one.
pub async fn share_note(kv: &KvStore, note_id: i64, ttl_seconds: Option<i64>) -> Result<String> {
    if let Some(existing) = kv.get_json::<String>(&note_share_key(note_id)).await? {
        return Ok(existing);
    }

    let public_id = Uuid::new_v4().to_string();
    let ttl = ttl_option(ttl_seconds.unwrap_or(DEFAULT_SHARE_TTL_SECONDS));

    kv.put_json(&public_memo_key(&public_id), &NoteShare { note_id }, ttl)
        .await?;
    kv.put_json(&note_share_key(note_id), &public_id, ttl)
        .await?;

    Ok(public_id)
}

/// Update the TTL of an existing note share link.
pub async fn update_note_share_ttl(
    kv: &KvStore,
    note_id: i64,
    public_id: &str,
    ttl_seconds: i64,
) -> Result<()> {
    // The public ID must actually belong to this note.
    let stored: Option<String> = kv.get_json(&note_share_key(note_id)).await?;
    if stored.as_deref() != Some(public_id) {
        return Err(Error::InvalidInput(
            "invalid public ID for this note".to_string(),
        ));
    }

    let memo: Option<NoteShare> = kv.get_json(&public_memo_key(public_id)).await?;
    let Some(memo) = memo else {
        return Err(Error::NotFound(
            "share link not found or already expired".to_string(),
        ));
    };

    let ttl = ttl_option(ttl_seconds);
    kv.put_json(&public_memo_key(public_id), &memo, ttl).await?;
    kv.put_json(&note_share_key(note_id), &public_id.to_string(), ttl)
        .await?;
    Ok(())
}

/// Revoke a note's share link, if it has one.
pub async fn unshare_note(kv: &KvStore, note_id: i64) -> Result<()> {
    if let Some(public_id) = kv.get_json::<String>(&note_share_key(note_id)).await? {
        kv.delete(&public_memo_key(&public_id)).await?;
        kv.delete(&note_share_key(note_id)).await?;
    }
    Ok(())
}

/// Resolve a public note ID to its share payload.
pub async fn resolve_note_share(kv: &KvStore, public_id: &str) -> Result<Option<NoteShare>> {
    kv.get_json(&public_memo_key(public_id)).await
}

/// Mint a public file link for the given payload. Returns the public ID.
pub async fn create_file_share(kv: &KvStore, payload: &FileShare) -> Result<Uuid> {
    let public_id = Uuid::new_v4();
    kv.put_json(&public_file_key(&public_id.to_string()), payload, None)
        .await?;
    Ok(public_id)
}

/// Resolve a public file ID to its share payload.
pub async fn resolve_file_share(kv: &KvStore, public_id: &str) -> Result<Option<FileShare>> {
    kv.get_json(&public_file_key(public_id)).await
}

/// Map a private media URL to its blob storage key.
pub fn storage_key_for_url(url: &str) -> Option<String> {
    if let Some(caps) = PRIVATE_FILE_URL.captures(url) {
        return Some(format!("notes/{}/{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = PRIVATE_IMAGE_URL.captures(url) {
        return Some(format!("uploads/{}", &caps[1]));
    }
    None
}

/// Build the file-share payload for a private media URL.
fn share_payload_for_url(url: &str) -> Option<FileShare> {
    if let Some(caps) = PRIVATE_FILE_URL.captures(url) {
        return Some(FileShare {
            note_id: caps[1].parse().ok(),
            file_id: caps[2].parse().ok(),
            file_name: Some("media".to_string()),
            ..Default::default()
        });
    }
    if let Some(caps) = PRIVATE_IMAGE_URL.captures(url) {
        return Some(FileShare {
            standalone_image_id: caps[1].parse().ok(),
            file_name: Some("image.png".to_string()),
            ..Default::default()
        });
    }
    None
}

/// Replace every private media URL in shared content with a public link.
pub async fn rewrite_private_urls(kv: &KvStore, content: &str) -> Result<String> {
    let urls: Vec<String> = PRIVATE_MEDIA_URL
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect();

    let mut rewritten = content.to_string();
    for url in urls {
        let Some(payload) = share_payload_for_url(&url) else {
            continue;
        };
        let public_id = create_file_share(kv, &payload).await?;
        rewritten = rewritten.replace(&url, &format!("/api/public/file/{}", public_id));
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_for_note_file_url() {
        assert_eq!(
            storage_key_for_url("/api/files/12/abc-def").as_deref(),
            Some("notes/12/abc-def")
        );
    }

    #[test]
    fn test_storage_key_for_image_url() {
        assert_eq!(
            storage_key_for_url("/api/images/abc-def").as_deref(),
            Some("uploads/abc-def")
        );
    }

    #[test]
    fn test_storage_key_for_external_url() {
        assert!(storage_key_for_url("https://example.com/x.png").is_none());
        assert!(storage_key_for_url("/api/notes/3").is_none());
    }

    #[test]
    fn test_share_payload_kinds() {
        let id = Uuid::new_v4();
        let file = share_payload_for_url(&format!("/api/files/3/{}", id)).unwrap();
        assert_eq!(file.note_id, Some(3));
        assert_eq!(file.file_id, Some(id));
        assert!(file.standalone_image_id.is_none());

        let image = share_payload_for_url(&format!("/api/images/{}", id)).unwrap();
        assert_eq!(image.standalone_image_id, Some(id));
        assert!(image.note_id.is_none());
    }

    #[test]
    fn test_ttl_option_zero_means_forever() {
        assert_eq!(ttl_option(0), None);
        assert_eq!(ttl_option(-5), None);
        assert_eq!(ttl_option(60), Some(60));
    }

    #[test]
    fn test_private_media_url_regex_finds_both_kinds() {
        let content = "![a](/api/images/one-1) and ![b](/api/files/2/two-2) done";
        let found: Vec<&str> = PRIVATE_MEDIA_URL
            .find_iter(content)
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["/api/images/one-1", "/api/files/2/two-2"]);
    }
}
