//! Styling annotations over a plain-text message.
//!
//! A [`Span`] marks a sub-range of text with a style kind. Offsets and
//! lengths are measured in Unicode code points, matching the indexing the
//! renderer walks with. Each kind resolves to a fixed marker pair and a
//! nesting priority through [`Span::markers`].

/// Style kind of a [`Span`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    /// Hyperlink; carries the target URL.
    Link,
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    /// Inline code.
    Code,
    /// Fenced code block; optionally carries a language tag.
    CodeBlock,
    /// Anything the renderer does not understand. Renders as plain text.
    Other,
}

/// A styled sub-range of text.
#[derive(Debug, Clone)]
pub struct Span {
    pub kind: SpanKind,
    /// Start position in code points.
    pub offset: usize,
    /// Extent in code points.
    pub length: usize,
    /// Target URL for [`SpanKind::Link`].
    pub url: Option<String>,
    /// Language tag for [`SpanKind::CodeBlock`].
    pub language: Option<String>,
}

impl Span {
    /// Construct a span with no auxiliary data.
    pub fn new(kind: SpanKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            url: None,
            language: None,
        }
    }

    /// A link span.
    pub fn link(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::new(SpanKind::Link, offset, length)
        }
    }

    /// A fenced code block span.
    pub fn code_block(offset: usize, length: usize, language: Option<String>) -> Self {
        Self {
            language,
            ..Self::new(SpanKind::CodeBlock, offset, length)
        }
    }
}

/// Start/end marker tokens plus the nesting priority of a span kind.
///
/// Lower priority values sit further out: they open earlier and close later
/// at a shared boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub start: String,
    pub end: String,
    pub priority: u8,
}

impl Span {
    /// Resolve the marker pair for this span from the fixed kind table.
    ///
    /// Returns `None` for kinds that emit no markers: `Other`, and `Link`
    /// spans that arrived without a URL.
    pub fn markers(&self) -> Option<MarkerPair> {
        let (start, end, priority) = match &self.kind {
            SpanKind::Link => {
                let url = self.url.as_deref()?;
                // Literal parens would close the Markdown link early.
                let encoded = url.replace('(', "%28").replace(')', "%29");
                ("[".to_string(), format!("]({})", encoded), 10)
            }
            SpanKind::Bold => ("**".to_string(), "**".to_string(), 20),
            // `_` for italic so it cannot collide with bold's asterisks.
            SpanKind::Italic => ("_".to_string(), "_".to_string(), 30),
            SpanKind::Underline => ("__".to_string(), "__".to_string(), 40),
            SpanKind::Strikethrough => ("~~".to_string(), "~~".to_string(), 50),
            SpanKind::Spoiler => ("||".to_string(), "||".to_string(), 60),
            SpanKind::Code => ("`".to_string(), "`".to_string(), 70),
            SpanKind::CodeBlock => (
                format!("```{}\n", self.language.as_deref().unwrap_or("")),
                "\n```".to_string(),
                80,
            ),
            SpanKind::Other => return None,
        };
        Some(MarkerPair {
            start,
            end,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_table_priorities_are_ordered() {
        let kinds = [
            Span::link(0, 1, "http://x"),
            Span::new(SpanKind::Bold, 0, 1),
            Span::new(SpanKind::Italic, 0, 1),
            Span::new(SpanKind::Underline, 0, 1),
            Span::new(SpanKind::Strikethrough, 0, 1),
            Span::new(SpanKind::Spoiler, 0, 1),
            Span::new(SpanKind::Code, 0, 1),
            Span::code_block(0, 1, None),
        ];
        let priorities: Vec<u8> = kinds.iter().map(|s| s.markers().unwrap().priority).collect();
        assert_eq!(priorities, vec![10, 20, 30, 40, 50, 60, 70, 80]);
    }

    #[test]
    fn test_link_url_paren_encoding() {
        let span = Span::link(0, 1, "http://example.com/a(b)c");
        let pair = span.markers().unwrap();
        assert_eq!(pair.start, "[");
        assert_eq!(pair.end, "](http://example.com/a%28b%29c)");
    }

    #[test]
    fn test_link_without_url_emits_nothing() {
        let span = Span::new(SpanKind::Link, 0, 1);
        assert!(span.markers().is_none());
    }

    #[test]
    fn test_code_block_language_tag() {
        let span = Span::code_block(0, 1, Some("python".to_string()));
        let pair = span.markers().unwrap();
        assert_eq!(pair.start, "```python\n");
        assert_eq!(pair.end, "\n```");

        let untagged = Span::code_block(0, 1, None);
        assert_eq!(untagged.markers().unwrap().start, "```\n");
    }

    #[test]
    fn test_other_kind_emits_nothing() {
        assert!(Span::new(SpanKind::Other, 0, 3).markers().is_none());
    }
}
