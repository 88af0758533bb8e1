//! Error types for notedrop.

use thiserror::Error;

/// Result type alias using notedrop's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notedrop operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// Doc node not found
    #[error("Doc node not found: {0}")]
    DocNodeNotFound(uuid::Uuid),

    /// Blob storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Key-value store operation failed
    #[error("KV error: {0}")]
    Kv(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("share link".to_string());
        assert_eq!(err.to_string(), "Not found: share link");
    }

    #[test]
    fn test_error_display_note_not_found() {
        let err = Error::NoteNotFound(42);
        assert_eq!(err.to_string(), "Note not found: 42");
    }

    #[test]
    fn test_error_display_doc_node_not_found() {
        let id = uuid::Uuid::nil();
        let err = Error::DocNodeNotFound(id);
        assert_eq!(err.to_string(), format!("Doc node not found: {}", id));
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("blob missing".to_string());
        assert_eq!(err.to_string(), "Storage error: blob missing");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty title".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty title");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
