//! Telegram Bot API wire types and entity mapping.
//!
//! Only the fields the ingestion path reads are modeled; everything else in
//! an update is ignored during deserialization.

use serde::Deserialize;

use crate::annotations::{Span, SpanKind};

/// An incoming update delivered to the webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub channel_post: Option<Message>,
}

impl Update {
    /// The payload message, whether direct or a channel post.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref().or(self.channel_post.as_ref())
    }
}

/// A chat message or channel post.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub caption_entities: Vec<MessageEntity>,
    pub photo: Option<Vec<PhotoSize>>,
    pub document: Option<Document>,
    pub video: Option<Video>,
    pub forward_from: Option<User>,
    pub forward_from_chat: Option<Chat>,
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    /// Message text, falling back to the media caption.
    pub fn text_or_caption(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or("")
    }

    /// Styling entities for whichever of text/caption is populated.
    pub fn active_entities(&self) -> &[MessageEntity] {
        if self.text.is_some() {
            &self.entities
        } else {
            &self.caption_entities
        }
    }

    /// The largest photo size, when the message carries a photo.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.as_ref().and_then(|sizes| sizes.last())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// Display name assembled from first/last name.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
}

/// A styling entity over a message's text.
///
/// Offsets and lengths are UTF-16 code units, per the Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    pub url: Option<String>,
    pub language: Option<String>,
}

/// Convert Bot API entities into renderer spans.
///
/// Entity offsets are UTF-16 code units while the renderer indexes code
/// points, so positions are re-based here. Entities that fall outside the
/// text after conversion are left as-is and rejected downstream by the
/// renderer's range check.
pub fn entities_to_spans(text: &str, entities: &[MessageEntity]) -> Vec<Span> {
    let remap = utf16_to_char_index(text);
    entities
        .iter()
        .map(|entity| {
            let kind = match entity.kind.as_str() {
                "text_link" => SpanKind::Link,
                "bold" => SpanKind::Bold,
                "italic" => SpanKind::Italic,
                "underline" => SpanKind::Underline,
                "strikethrough" => SpanKind::Strikethrough,
                "spoiler" => SpanKind::Spoiler,
                "code" => SpanKind::Code,
                "pre" => SpanKind::CodeBlock,
                _ => SpanKind::Other,
            };
            let offset = remap(entity.offset);
            let end = remap(entity.offset + entity.length);
            Span {
                kind,
                offset,
                length: end.saturating_sub(offset),
                url: entity.url.clone(),
                language: entity.language.clone(),
            }
        })
        .collect()
}

/// Build a mapping from UTF-16 code-unit positions to code-point positions.
///
/// Positions beyond the end of the text map past the last code point so the
/// renderer's range check can flag them.
fn utf16_to_char_index(text: &str) -> impl Fn(usize) -> usize {
    let mut table = Vec::new();
    let mut utf16_pos = 0;
    for (char_pos, c) in text.chars().enumerate() {
        table.push((utf16_pos, char_pos));
        utf16_pos += c.len_utf16();
    }
    let end = (utf16_pos, text.chars().count());
    table.push(end);

    move |pos: usize| {
        match table.binary_search_by_key(&pos, |&(u16_pos, _)| u16_pos) {
            Ok(idx) => table[idx].1,
            // Position inside a surrogate pair or past the end; snap forward.
            Err(idx) => table.get(idx).map(|&(_, c)| c).unwrap_or(end.1 + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_mapping() {
        let entity = MessageEntity {
            kind: "bold".to_string(),
            offset: 0,
            length: 4,
            url: None,
            language: None,
        };
        let spans = entities_to_spans("text", &[entity]);
        assert_eq!(spans[0].kind, SpanKind::Bold);
        assert_eq!(spans[0].offset, 0);
        assert_eq!(spans[0].length, 4);
    }

    #[test]
    fn test_unknown_entity_kind_maps_to_other() {
        let entity = MessageEntity {
            kind: "custom_emoji".to_string(),
            offset: 0,
            length: 1,
            url: None,
            language: None,
        };
        let spans = entities_to_spans("x", &[entity]);
        assert_eq!(spans[0].kind, SpanKind::Other);
    }

    #[test]
    fn test_utf16_offsets_rebased_after_astral_char() {
        // "🎉 hi" — the emoji is two UTF-16 units but one code point, so a
        // bold entity over "hi" arrives at offset 3 and must land at 2.
        let entity = MessageEntity {
            kind: "bold".to_string(),
            offset: 3,
            length: 2,
            url: None,
            language: None,
        };
        let spans = entities_to_spans("🎉 hi", &[entity]);
        assert_eq!(spans[0].offset, 2);
        assert_eq!(spans[0].length, 2);
    }

    #[test]
    fn test_out_of_range_entity_stays_out_of_range() {
        let entity = MessageEntity {
            kind: "bold".to_string(),
            offset: 0,
            length: 99,
            url: None,
            language: None,
        };
        let spans = entities_to_spans("ab", &[entity]);
        assert!(spans[0].offset + spans[0].length > 2);
    }

    #[test]
    fn test_message_text_or_caption_fallback() {
        let json = r#"{
            "message_id": 1,
            "chat": {"id": 5},
            "caption": "photo caption",
            "caption_entities": [{"type": "bold", "offset": 0, "length": 5}]
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.text_or_caption(), "photo caption");
        assert_eq!(message.active_entities().len(), 1);
    }

    #[test]
    fn test_update_prefers_message_over_channel_post() {
        let json = r#"{
            "update_id": 9,
            "message": {"message_id": 1, "chat": {"id": 5}, "text": "direct"}
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.message().unwrap().text_or_caption(), "direct");
    }

    #[test]
    fn test_largest_photo_is_last_size() {
        let json = r#"{
            "message_id": 1,
            "chat": {"id": 5},
            "photo": [
                {"file_id": "small", "width": 90, "height": 90},
                {"file_id": "big", "width": 1280, "height": 1280}
            ]
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.largest_photo().unwrap().file_id, "big");
    }
}
