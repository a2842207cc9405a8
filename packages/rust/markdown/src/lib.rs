//! Markdown documents, article conversion, and body chunking.
//!
//! - [`Document`] / [`FrontMatter`]: formatting-preserving front-matter model
//! - [`html_to_markdown`]: article HTML → clean Markdown body via `htmd`
//! - [`split_markdown`]: heading-aware chunking for long bodies

mod chunk;
mod cleanup;
mod frontmatter;

use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use feedmill_shared::{FeedmillError, Result};

pub use chunk::split_markdown;
pub use frontmatter::{Document, FrontMatter, escape_yaml_string};

/// Tags dropped entirely during conversion (content included).
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "iframe",
    "noscript", "svg", "img",
];

/// Content containers tried in priority order before falling back to `<body>`.
const CONTENT_SELECTORS: &[&str] = &[
    "article .entry-content",
    "article",
    "main",
    "[role=\"main\"]",
    ".post-content",
    ".content",
];

/// Convert an article page (or an HTML fragment from a feed item) to a
/// Markdown body with no front-matter.
///
/// 1. Extracts the main content container (`article`, `main`, …, `body`)
/// 2. Converts HTML → Markdown via `htmd`, dropping chrome and images
/// 3. Cleans up leftover wrappers, empty links, relative links, blank lines
///
/// Returns an empty string when the page has no text content.
#[instrument(skip(html), fields(base = base_url.map(Url::as_str).unwrap_or("-")))]
pub fn html_to_markdown(html: &str, base_url: Option<&Url>) -> Result<String> {
    let content_html = extract_content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| FeedmillError::parse(format!("htmd conversion failed: {e}")))?;

    let cleaned = cleanup::run_pipeline(&raw_markdown, base_url);

    debug!(
        raw_len = raw_markdown.len(),
        final_len = cleaned.len(),
        "article conversion complete"
    );

    Ok(cleaned)
}

/// Extract the main content HTML, stripping page chrome.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel_str in CONTENT_SELECTORS {
        if let Ok(selector) = scraper::Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    if let Ok(body_sel) = scraper::Selector::parse("body") {
        if let Some(body) = doc.select(&body_sel).next() {
            return body.inner_html();
        }
    }

    html.to_string()
}
