//! Raw document rendering for ingested feed items.

use chrono::SecondsFormat;

use feedmill_markdown::{Document, FrontMatter};

use crate::parser::FeedItem;

/// Build the raw document for `item` with the converted Markdown `body`.
///
/// The document's path is its bare file name, `<YYYY-MM-DD>_<title>.md`;
/// the caller places it under the feed directory.
pub fn render_item(item: &FeedItem, body: &str) -> Document {
    let mut fm = FrontMatter::default();
    fm.set("title", &item.title);
    fm.set(
        "date",
        &item.published.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    fm.set("link", item.link.as_deref().unwrap_or(""));

    let file_name = format!(
        "{}_{}.md",
        item.published.format("%Y-%m-%d"),
        sanitize_filename(&item.title)
    );

    Document::new(file_name, fm, format!("{}\n", body.trim_end()))
}

/// Keep alphanumerics, spaces, `.` and `_`; trim trailing whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect();
    let trimmed = kept.trim_end().trim_start_matches(['.', ' ']);
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
