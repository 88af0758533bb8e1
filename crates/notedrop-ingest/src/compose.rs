//! Note content assembly for ingested messages.
//!
//! An inbound message becomes a single Markdown note body made of up to
//! four parts, in order: forward origin, media embeds, quoted reply, and
//! the converted message text. The assembled body is prefixed with the
//! `#TG` tag so ingested notes are filterable.

use crate::markdown::spans_to_markdown;
use crate::telegram::{entities_to_spans, Message};

/// Tag prefixed to every ingested note.
const INGEST_TAG: &str = "#TG";

/// Render the message's text (or caption) with its styling entities.
///
/// Entities the renderer rejects (out-of-range after offset conversion)
/// degrade to the plain text rather than dropping the message.
pub fn message_markdown(message: &Message) -> String {
    let text = message.text_or_caption();
    let spans = entities_to_spans(text, message.active_entities());
    spans_to_markdown(text, &spans).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "rejected styling entities, keeping plain text");
        text.to_string()
    })
}

/// Attribution line for a forwarded message, if it was forwarded.
pub fn forward_header(message: &Message) -> Option<String> {
    if let Some(chat) = &message.forward_from_chat {
        let title = chat.title.as_deref().unwrap_or("a channel");
        return Some(match &chat.username {
            Some(username) => {
                format!("*Forwarded from [{}](https://t.me/{})*", title, username)
            }
            None => format!("*Forwarded from {}*", title),
        });
    }
    if let Some(user) = &message.forward_from {
        return Some(format!("*Forwarded from {}*", user.display_name()));
    }
    None
}

/// Blockquote rendering of the message this one replies to, if any.
pub fn reply_quote(message: &Message) -> Option<String> {
    let original = message.reply_to_message.as_deref()?;
    let rendered = message_markdown(original);
    let trimmed = rendered.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .lines()
            .map(|line| format!("> {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Markdown image embed for an ingested photo.
pub fn image_embed(file_name: &str, url: &str) -> String {
    format!("![{}]({})", file_name, url)
}

/// HTML video embed; Markdown has no native video syntax.
pub fn video_embed(url: &str) -> String {
    format!(r#"<video src="{}" width="100%" controls muted></video>"#, url)
}

/// Assemble the final note body from its parts.
///
/// Empty parts are skipped; the rest are joined with blank lines behind
/// the ingest tag.
pub fn assemble_note(
    forward: Option<String>,
    media_embeds: &[String],
    reply: Option<String>,
    body: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(header) = forward {
        parts.push(header);
    }
    if !media_embeds.is_empty() {
        parts.push(media_embeds.join("\n"));
    }
    if let Some(quote) = reply {
        parts.push(quote);
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    format!("{} {}", INGEST_TAG, parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_message(json: &str) -> Message {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_message_markdown_applies_entities() {
        let message = parse_message(
            r#"{
                "message_id": 1,
                "chat": {"id": 5},
                "text": "bold words here",
                "entities": [{"type": "bold", "offset": 0, "length": 4}]
            }"#,
        );
        assert_eq!(message_markdown(&message), "**bold** words here");
    }

    #[test]
    fn test_forward_header_channel_with_username() {
        let message = parse_message(
            r#"{
                "message_id": 1,
                "chat": {"id": 5},
                "forward_from_chat": {"id": 7, "title": "Rust News", "username": "rustnews"}
            }"#,
        );
        assert_eq!(
            forward_header(&message).unwrap(),
            "*Forwarded from [Rust News](https://t.me/rustnews)*"
        );
    }

    #[test]
    fn test_forward_header_private_channel() {
        let message = parse_message(
            r#"{
                "message_id": 1,
                "chat": {"id": 5},
                "forward_from_chat": {"id": 7, "title": "Private"}
            }"#,
        );
        assert_eq!(forward_header(&message).unwrap(), "*Forwarded from Private*");
    }

    #[test]
    fn test_forward_header_user() {
        let message = parse_message(
            r#"{
                "message_id": 1,
                "chat": {"id": 5},
                "forward_from": {"id": 3, "first_name": "Ada", "last_name": "Lovelace"}
            }"#,
        );
        assert_eq!(
            forward_header(&message).unwrap(),
            "*Forwarded from Ada Lovelace*"
        );
    }

    #[test]
    fn test_reply_quote_prefixes_every_line() {
        let message = parse_message(
            r#"{
                "message_id": 2,
                "chat": {"id": 5},
                "text": "reply",
                "reply_to_message": {
                    "message_id": 1,
                    "chat": {"id": 5},
                    "text": "first line\nsecond line"
                }
            }"#,
        );
        assert_eq!(reply_quote(&message).unwrap(), "> first line\n> second line");
    }

    #[test]
    fn test_reply_quote_empty_original_is_none() {
        let message = parse_message(
            r#"{
                "message_id": 2,
                "chat": {"id": 5},
                "text": "reply",
                "reply_to_message": {"message_id": 1, "chat": {"id": 5}, "text": "   "}
            }"#,
        );
        assert!(reply_quote(&message).is_none());
    }

    #[test]
    fn test_assemble_note_full() {
        let note = assemble_note(
            Some("*Forwarded from X*".to_string()),
            &["![photo.jpg](/api/files/1/abc)".to_string()],
            Some("> quoted".to_string()),
            "body text",
        );
        assert_eq!(
            note,
            "#TG *Forwarded from X*\n\n![photo.jpg](/api/files/1/abc)\n\n> quoted\n\nbody text"
        );
    }

    #[test]
    fn test_assemble_note_body_only() {
        assert_eq!(assemble_note(None, &[], None, "just text"), "#TG just text");
    }

    #[test]
    fn test_video_embed_is_html() {
        let embed = video_embed("/api/tg-media-proxy/abc");
        assert!(embed.starts_with("<video src=\"/api/tg-media-proxy/abc\""));
        assert!(embed.ends_with("</video>"));
    }
}
