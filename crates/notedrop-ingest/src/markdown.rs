//! Rich-text span rendering to Markdown.
//!
//! Converts a plain string plus a set of possibly-overlapping styling spans
//! into a single Markdown string. The work happens in two passes over the
//! text:
//!
//! 1. A mapper turns each span into an open event at `offset` and a close
//!    event at `offset + length`, collected per code-point position.
//! 2. A linearizer walks the text once, flushing literal runs and emitting
//!    the markers recorded at each boundary. Closes are emitted innermost
//!    first (priority descending), opens outermost first (priority
//!    ascending), so spans sharing a boundary nest consistently.
//!
//! Two coincident identical markers would merge into a single syntactic
//! unit (`**foo****bar**` parses as one span with stray asterisks), so a
//! zero-width space is inserted between them. Three cleanup passes then
//! repair bold-marker edge cases that common renderers mishandle; their
//! order matters and is covered by tests.
//!
//! No well-nestedness validation is performed. Overlapping, non-nested
//! spans produce markers at exactly the computed boundaries even when the
//! result is not sensible Markdown. Output is deterministic for any input.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::annotations::{MarkerPair, Span};

/// Zero-width space used to keep coincident identical markers apart.
const ZWSP: char = '\u{200B}';

/// Marker strings that merge when emitted back-to-back.
const ADJACENCY_SENSITIVE: [&str; 6] = ["**", "_", "__", "~~", "||", "`"];

/// Bold wrapping nothing but emoji; bold has no visual effect there and
/// some renderers mis-parse it.
static EMOJI_ONLY_BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*((?:\p{Emoji}|\p{Emoji_Component})+)\*\*").unwrap());

/// Bold wrapping only whitespace.
static WHITESPACE_ONLY_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(\s+)\*\*").unwrap());

/// Bold whose content starts with whitespace; emphasis markers must hug
/// non-whitespace or renderers refuse to parse them.
static LEADING_WHITESPACE_BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(\s+)(.*?)\*\*").unwrap());

/// Rendering failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// A span extends past the end of the text.
    #[error("span out of range: offset {offset} + length {length} > text length {text_len}")]
    OutOfRange {
        offset: usize,
        length: usize,
        text_len: usize,
    },
}

/// One marker scheduled at a boundary position.
#[derive(Debug, Clone)]
struct Marker {
    token: String,
    priority: u8,
}

/// Open/close events anchored at a single code-point position.
#[derive(Debug, Clone, Default)]
struct Boundary {
    opens: Vec<Marker>,
    closes: Vec<Marker>,
}

/// Render `text` with `spans` applied as Markdown markers.
///
/// Offsets and lengths are code-point based. Spans whose kind resolves to
/// no markers render as plain text. Zero-length spans are dropped. A span
/// reaching past the end of the text is rejected with
/// [`RenderError::OutOfRange`] rather than silently mis-indexing.
pub fn spans_to_markdown(text: &str, spans: &[Span]) -> Result<String, RenderError> {
    if spans.is_empty() {
        return Ok(text.to_string());
    }

    let chars: Vec<char> = text.chars().collect();
    let boundaries = map_spans(&chars, spans)?;
    let rendered = linearize(&chars, &boundaries);
    Ok(cleanup(&rendered))
}

/// Pass 1: collect each span's open/close markers into per-position lists.
fn map_spans(chars: &[char], spans: &[Span]) -> Result<Vec<Boundary>, RenderError> {
    let mut boundaries = vec![Boundary::default(); chars.len() + 1];

    for span in spans {
        let end = span.offset + span.length;
        if end > chars.len() {
            return Err(RenderError::OutOfRange {
                offset: span.offset,
                length: span.length,
                text_len: chars.len(),
            });
        }
        if span.length == 0 {
            continue;
        }
        let Some(MarkerPair {
            start,
            end: end_token,
            priority,
        }) = span.markers()
        else {
            continue;
        };
        boundaries[span.offset].opens.push(Marker {
            token: start,
            priority,
        });
        boundaries[end].closes.push(Marker {
            token: end_token,
            priority,
        });
    }

    Ok(boundaries)
}

/// Pass 2: walk the text once, interleaving literal runs with the markers
/// recorded at each boundary.
fn linearize(chars: &[char], boundaries: &[Boundary]) -> String {
    let mut out = String::with_capacity(chars.len() * 2);
    let mut last_copied = 0;

    for (i, boundary) in boundaries.iter().enumerate() {
        if boundary.opens.is_empty() && boundary.closes.is_empty() {
            continue;
        }
        out.extend(&chars[last_copied..i]);

        // Inner spans close before outer ones; outer spans open first.
        let mut closes = boundary.closes.clone();
        closes.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut opens = boundary.opens.clone();
        opens.sort_by(|a, b| a.priority.cmp(&b.priority));

        for marker in closes.iter().chain(opens.iter()) {
            emit(&mut out, &marker.token);
        }

        last_copied = i;
    }

    out.extend(&chars[last_copied..]);
    out
}

/// Append a marker token, separating it from an identical preceding token.
fn emit(out: &mut String, token: &str) {
    if ADJACENCY_SENSITIVE.contains(&token) && out.ends_with(token) {
        out.push(ZWSP);
    }
    out.push_str(token);
}

/// Pass 3: ordered bold-marker cleanup.
///
/// Emoji-only spans are stripped before the whitespace fixups so that a
/// span left bare by the strip cannot be re-matched as a whitespace case.
fn cleanup(rendered: &str) -> String {
    let stripped = EMOJI_ONLY_BOLD.replace_all(rendered, "$1");
    let stripped = WHITESPACE_ONLY_BOLD.replace_all(&stripped, "$1");
    LEADING_WHITESPACE_BOLD
        .replace_all(&stripped, "$1**$2**")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::SpanKind;

    fn bold(offset: usize, length: usize) -> Span {
        Span::new(SpanKind::Bold, offset, length)
    }

    #[test]
    fn test_identity_with_no_spans() {
        let text = "plain text, no styling — даже unicode";
        assert_eq!(spans_to_markdown(text, &[]).unwrap(), text);
    }

    #[test]
    fn test_full_bold_wrap() {
        let out = spans_to_markdown("hello world", &[bold(0, 11)]).unwrap();
        assert_eq!(out, "**hello world**");
    }

    #[test]
    fn test_partial_spans() {
        let out = spans_to_markdown(
            "make it bold and italic",
            &[bold(8, 4), Span::new(SpanKind::Italic, 17, 6)],
        )
        .unwrap();
        assert_eq!(out, "make it **bold** and _italic_");
    }

    #[test]
    fn test_adjacent_bold_spans_get_zero_width_space() {
        let out = spans_to_markdown("abcdef", &[bold(0, 3), bold(3, 3)]).unwrap();
        assert_eq!(out, "**abc**\u{200B}**def**");
        assert!(!out.contains("******"));
    }

    #[test]
    fn test_adjacent_inline_code_spans() {
        let out = spans_to_markdown(
            "xy",
            &[Span::new(SpanKind::Code, 0, 1), Span::new(SpanKind::Code, 1, 1)],
        )
        .unwrap();
        assert_eq!(out, "`x`\u{200B}`y`");
    }

    #[test]
    fn test_link_end_token_is_not_adjacency_sensitive() {
        // Two touching links share no identical marker token, so no
        // separator is inserted.
        let out = spans_to_markdown(
            "ab",
            &[Span::link(0, 1, "http://a"), Span::link(1, 1, "http://b")],
        )
        .unwrap();
        assert_eq!(out, "[a](http://a)[b](http://b)");
    }

    #[test]
    fn test_nesting_follows_priority_not_input_order() {
        // Italic listed first must still nest inside bold.
        let spans = [Span::new(SpanKind::Italic, 0, 5), bold(0, 5)];
        let out = spans_to_markdown("hello", &spans).unwrap();
        assert_eq!(out, "**_hello_**");
    }

    #[test]
    fn test_link_outermost_code_block_innermost() {
        let spans = [
            Span::code_block(0, 4, None),
            Span::link(0, 4, "http://example.com"),
        ];
        let out = spans_to_markdown("code", &spans).unwrap();
        assert_eq!(out, "[```\ncode\n```](http://example.com)");
    }

    #[test]
    fn test_link_url_parens_percent_encoded() {
        let out =
            spans_to_markdown("wiki", &[Span::link(0, 4, "http://example.com/a(b)c")]).unwrap();
        assert_eq!(out, "[wiki](http://example.com/a%28b%29c)");
    }

    #[test]
    fn test_code_block_with_language_tag() {
        let out = spans_to_markdown(
            "print(1)",
            &[Span::code_block(0, 8, Some("python".to_string()))],
        )
        .unwrap();
        assert_eq!(out, "```python\nprint(1)\n```");
    }

    #[test]
    fn test_unrecognized_kind_renders_plain() {
        let out = spans_to_markdown("plain", &[Span::new(SpanKind::Other, 0, 5)]).unwrap();
        assert_eq!(out, "plain");
    }

    #[test]
    fn test_out_of_range_span_rejected() {
        let err = spans_to_markdown("short", &[bold(3, 10)]).unwrap_err();
        assert_eq!(
            err,
            RenderError::OutOfRange {
                offset: 3,
                length: 10,
                text_len: 5
            }
        );
    }

    #[test]
    fn test_offsets_count_code_points_not_bytes() {
        // "héllo" is 6 bytes but 5 code points.
        let out = spans_to_markdown("héllo", &[bold(0, 5)]).unwrap();
        assert_eq!(out, "**héllo**");
    }

    #[test]
    fn test_zero_length_span_dropped() {
        let out = spans_to_markdown("abc", &[bold(1, 0)]).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_emoji_only_bold_stripped() {
        let out = spans_to_markdown("🎉", &[bold(0, 1)]).unwrap();
        assert_eq!(out, "🎉");
    }

    #[test]
    fn test_emoji_sequence_bold_stripped() {
        let out = spans_to_markdown("🎉🚀", &[bold(0, 2)]).unwrap();
        assert_eq!(out, "🎉🚀");
    }

    #[test]
    fn test_bold_with_text_and_emoji_kept() {
        let out = spans_to_markdown("go 🚀", &[bold(0, 4)]).unwrap();
        assert_eq!(out, "**go 🚀**");
    }

    #[test]
    fn test_whitespace_only_bold_stripped() {
        let out = spans_to_markdown("a   b", &[bold(1, 3)]).unwrap();
        assert_eq!(out, "a   b");
    }

    #[test]
    fn test_leading_whitespace_moved_out_of_bold() {
        let out = spans_to_markdown("x  hi", &[bold(1, 4)]).unwrap();
        assert_eq!(out, "x  **hi**");
    }

    #[test]
    fn test_cleanup_pass_order_emoji_before_whitespace() {
        // The emoji strip runs first; what remains must not be re-wrapped
        // or half-fixed by the whitespace passes.
        let out = spans_to_markdown("🎉 done", &[bold(0, 1), bold(2, 4)]).unwrap();
        assert_eq!(out, "🎉 **done**");
    }

    #[test]
    fn test_overlapping_non_nested_spans_are_deterministic() {
        // No well-nestedness validation: markers land at the computed
        // boundaries even when the result is not sensible Markdown.
        let spans = [bold(0, 3), Span::new(SpanKind::Italic, 2, 2)];
        let out = spans_to_markdown("abcd", &spans).unwrap();
        assert_eq!(out, "**ab_c**d_");
    }

    #[test]
    fn test_same_input_same_output() {
        let spans = [
            bold(0, 5),
            Span::new(SpanKind::Italic, 0, 5),
            Span::new(SpanKind::Strikethrough, 2, 3),
        ];
        let a = spans_to_markdown("hello", &spans).unwrap();
        let b = spans_to_markdown("hello", &spans).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_plain_character_survives() {
        let text = "a b\ncd — ef";
        let spans = [bold(0, 1), Span::new(SpanKind::Code, 4, 2)];
        let out = spans_to_markdown(text, &spans).unwrap();
        let stripped: String = out
            .chars()
            .filter(|c| !"*`_~|[]()".contains(*c) && *c != ZWSP)
            .collect();
        assert_eq!(stripped, text);
    }
}
