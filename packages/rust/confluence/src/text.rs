//! Plain-text extraction from Confluence storage-format HTML.
//!
//! Page bodies arrive as `body.storage.value` XHTML. Hashing and ingestion
//! both operate on plain text, so extraction must be deterministic for a
//! fixed input.

use scraper::Html;

/// Reduce a storage-format HTML fragment to plain text.
///
/// Text nodes are trimmed and joined with newlines; empty fragments are
/// dropped. Markup order is preserved, so the same HTML always produces the
/// same text (and therefore the same content hash).
pub fn storage_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let parts: Vec<&str> = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    parts.join("\n")
}
