//! # notedrop-ingest
//!
//! Inbound message ingestion for notedrop.
//!
//! Converts Telegram Bot API updates into Markdown note content: styling
//! entities are rendered through the span-to-Markdown engine, forwarded and
//! replied-to context is rendered as attribution and blockquotes, and media
//! is embedded by reference.

pub mod annotations;
pub mod client;
pub mod compose;
pub mod markdown;
pub mod telegram;

pub use annotations::{MarkerPair, Span, SpanKind};
pub use client::BotClient;
pub use compose::{
    assemble_note, forward_header, image_embed, message_markdown, reply_quote, video_embed,
};
pub use markdown::{spans_to_markdown, RenderError};
pub use telegram::{entities_to_spans, Document, Message, MessageEntity, PhotoSize, Update, User};
