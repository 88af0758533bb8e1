//! Structured logging field name constants for notedrop.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

/// Correlation ID propagated across a request's sub-calls.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "storage", "kv", "ingest"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "list_notes", "sync_note_tags", "webhook"
pub const OPERATION: &str = "op";

/// Note ID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Doc node UUID being operated on.
pub const NODE_ID: &str = "node_id";

/// Blob storage key being read or written.
pub const STORAGE_KEY: &str = "storage_key";

/// Telegram chat the inbound message came from.
pub const CHAT_ID: &str = "chat_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
