//! Note content scanning: inline hashtags and embedded image URLs.
//!
//! Hashtag extraction feeds the tag sync on every create/update; image URL
//! extraction keeps the denormalized `pics` column in step with the
//! content's Markdown image embeds.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// HTML tags are stripped before scanning so `<a href="...#frag">` cannot
/// contribute a tag.
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// A hashtag: `#` followed by unicode letters/digits/underscore/hyphen.
static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([\p{L}\p{N}_-]+)").unwrap());

/// Bare URLs; the `#fragment` inside one must not become a tag.
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"']*[^\s"'.?,!]"#).unwrap());

/// Markdown image syntax `![alt](url)`; captures the URL.
static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\((.*?)\)").unwrap());

/// Extract hashtags from note content.
///
/// Tags are lowercased and deduplicated, preserving first-seen order.
/// Tags inside bare URLs (fragments) and HTML markup are ignored.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let plain = HTML_TAG.replace_all(content, "");

    let mut tags = Vec::new();
    let mut seen = HashSet::new();
    let mut last = 0;

    // Scan only the stretches between URLs.
    for url in URL.find_iter(&plain) {
        collect_tags(&plain[last..url.start()], &mut tags, &mut seen);
        last = url.end();
    }
    collect_tags(&plain[last..], &mut tags, &mut seen);

    tags
}

fn collect_tags(segment: &str, tags: &mut Vec<String>, seen: &mut HashSet<String>) {
    for cap in HASHTAG.captures_iter(segment) {
        let tag = cap[1].to_lowercase();
        if seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }
}

/// Extract every Markdown-embedded image URL from note content, in order.
pub fn extract_image_urls(content: &str) -> Vec<String> {
    MARKDOWN_IMAGE
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic_hashtags() {
        let tags = extract_hashtags("a #note about #rust-lang");
        assert_eq!(tags, vec!["note", "rust-lang"]);
    }

    #[test]
    fn test_hashtags_lowercased_and_deduplicated() {
        let tags = extract_hashtags("#Rust and #rust and #RUST");
        assert_eq!(tags, vec!["rust"]);
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let tags = extract_hashtags("#zebra then #apple then #zebra");
        assert_eq!(tags, vec!["zebra", "apple"]);
    }

    #[test]
    fn test_url_fragment_is_not_a_tag() {
        let tags = extract_hashtags("see https://example.com/page#section and #real");
        assert_eq!(tags, vec!["real"]);
    }

    #[test]
    fn test_html_markup_stripped_before_scan() {
        let tags = extract_hashtags(r##"<a href="/x#frag">link</a> #keep"##);
        assert_eq!(tags, vec!["keep"]);
    }

    #[test]
    fn test_unicode_hashtags() {
        let tags = extract_hashtags("#заметка and #メモ");
        assert_eq!(tags, vec!["заметка", "メモ"]);
    }

    #[test]
    fn test_extract_image_urls() {
        let content = "![a](/api/images/one) text ![b with spaces](/api/files/2/two)";
        assert_eq!(
            extract_image_urls(content),
            vec!["/api/images/one", "/api/files/2/two"]
        );
    }

    #[test]
    fn test_extract_image_urls_ignores_plain_links() {
        let content = "[not an image](/somewhere)";
        assert!(extract_image_urls(content).is_empty());
    }
}
