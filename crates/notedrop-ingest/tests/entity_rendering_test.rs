//! End-to-end rendering tests: Bot API update JSON in, Markdown out.
//!
//! These go through deserialization, entity offset conversion, and the
//! span renderer together, the way the webhook handler drives them.

use notedrop_ingest::{assemble_note, forward_header, message_markdown, reply_quote, Message};

fn message(json: &str) -> Message {
    serde_json::from_str(json).expect("valid message JSON")
}

#[test]
fn plain_message_passes_through() {
    let msg = message(r#"{"message_id": 1, "chat": {"id": 1}, "text": "no styling at all"}"#);
    assert_eq!(message_markdown(&msg), "no styling at all");
}

#[test]
fn bold_and_italic_nest_by_priority() {
    // Both entities cover the whole word; bold must wrap italic no matter
    // the order Telegram sent them in.
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "hello",
            "entities": [
                {"type": "italic", "offset": 0, "length": 5},
                {"type": "bold", "offset": 0, "length": 5}
            ]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "**_hello_**");
}

#[test]
fn adjacent_bold_runs_stay_separate() {
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "abcdef",
            "entities": [
                {"type": "bold", "offset": 0, "length": 3},
                {"type": "bold", "offset": 3, "length": 3}
            ]
        }"#,
    );
    let rendered = message_markdown(&msg);
    assert_eq!(rendered, "**abc**\u{200B}**def**");
    assert!(!rendered.contains("******"));
}

#[test]
fn link_with_parens_is_percent_encoded() {
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "wiki",
            "entities": [
                {"type": "text_link", "offset": 0, "length": 4,
                 "url": "http://example.com/a(b)c"}
            ]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "[wiki](http://example.com/a%28b%29c)");
}

#[test]
fn pre_entity_renders_fenced_block_with_language() {
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "print(1)",
            "entities": [
                {"type": "pre", "offset": 0, "length": 8, "language": "python"}
            ]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "```python\nprint(1)\n```");
}

#[test]
fn emoji_only_bold_is_stripped() {
    // Telegram counts the emoji as two UTF-16 units.
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "🎉",
            "entities": [{"type": "bold", "offset": 0, "length": 2}]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "🎉");
}

#[test]
fn entities_after_emoji_land_on_the_right_characters() {
    // "🎉 bold" — entity offsets are UTF-16, so "bold" starts at 3 there
    // but at code point 2.
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "🎉 bold",
            "entities": [{"type": "bold", "offset": 3, "length": 4}]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "🎉 **bold**");
}

#[test]
fn out_of_range_entities_degrade_to_plain_text() {
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "short",
            "entities": [{"type": "bold", "offset": 2, "length": 99}]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "short");
}

#[test]
fn unknown_entity_kinds_render_unformatted() {
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "text": "mention @someone",
            "entities": [{"type": "mention", "offset": 8, "length": 8}]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "mention @someone");
}

#[test]
fn forwarded_reply_message_assembles_full_note() {
    let msg = message(
        r#"{
            "message_id": 2,
            "chat": {"id": 1},
            "text": "my take",
            "forward_from_chat": {"id": 9, "title": "News", "username": "news"},
            "reply_to_message": {
                "message_id": 1,
                "chat": {"id": 1},
                "text": "original point",
                "entities": [{"type": "bold", "offset": 0, "length": 8}]
            }
        }"#,
    );

    let note = assemble_note(
        forward_header(&msg),
        &[],
        reply_quote(&msg),
        &message_markdown(&msg),
    );
    assert_eq!(
        note,
        "#TG *Forwarded from [News](https://t.me/news)*\n\n> **original** point\n\nmy take"
    );
}

#[test]
fn caption_entities_apply_to_caption() {
    let msg = message(
        r#"{
            "message_id": 1,
            "chat": {"id": 1},
            "caption": "a photo caption",
            "caption_entities": [{"type": "italic", "offset": 2, "length": 5}],
            "photo": [{"file_id": "f1", "width": 100, "height": 100}]
        }"#,
    );
    assert_eq!(message_markdown(&msg), "a _photo_ caption");
}
