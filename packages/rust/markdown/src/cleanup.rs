//! Post-conversion cleanup for article Markdown.
//!
//! Each pass is a `&str -> String` function applied in sequence. Feed articles
//! arrive with share widgets, stray wrappers, and relative links; the passes
//! below leave a plain body suitable for translation.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on raw article Markdown.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = strip_wrapper_tags(md);
    result = drop_empty_links(&result);
    result = absolutize_links(&result, base_url);
    result = trim_line_ends(&result);
    result = collapse_blank_lines(&result);
    result.trim().to_string()
}

/// Remove layout-only HTML tags that survived conversion, keeping their text.
/// Fenced code is left alone.
fn strip_wrapper_tags(md: &str) -> String {
    static WRAPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|picture|source)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                WRAPPER_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop links with no visible text (`[](...)`), typically icon-only share buttons.
fn drop_empty_links(md: &str) -> String {
    static EMPTY_LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(^|[^!])\[\s*\]\([^)]*\)").expect("valid regex"));

    EMPTY_LINK_RE.replace_all(md, "$1").into_owned()
}

/// Resolve relative link targets against the article URL.
fn absolutize_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let href = &caps[1];
            if Url::parse(href).is_ok() || href.starts_with('#') {
                return caps[0].to_string();
            }
            match base.join(href) {
                Ok(resolved) => format!("]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Collapse runs of blank lines into a single blank line.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_wrapper_tags_keeps_text() {
        let input = "<div class=\"lead\">Important</div>\n\nMore";
        assert_eq!(strip_wrapper_tags(input), "Important\n\nMore");
    }

    #[test]
    fn strip_wrapper_tags_skips_fenced_code() {
        let input = "```html\n<div>kept</div>\n```";
        assert_eq!(strip_wrapper_tags(input), input);
    }

    #[test]
    fn drop_empty_links_removes_icon_links() {
        let input = "Share: [](https://x.com/share) [Read more](https://a.com)";
        let result = drop_empty_links(input);
        assert!(!result.contains("[](https://x.com/share)"));
        assert!(result.contains("[Read more](https://a.com)"));
    }

    #[test]
    fn absolutize_links_resolves_relative() {
        let base = Url::parse("https://techcrunch.com/2025/06/11/story/").unwrap();
        let result = absolutize_links("[Next](/tag/ai/)", Some(&base));
        assert_eq!(result, "[Next](https://techcrunch.com/tag/ai/)");
    }

    #[test]
    fn absolutize_links_keeps_absolute_and_anchors() {
        let base = Url::parse("https://example.com/a").unwrap();
        let input = "[A](https://other.org/x) [B](#top) [C](mailto:me@example.com)";
        assert_eq!(absolutize_links(input, Some(&base)), input);
    }

    #[test]
    fn collapse_blank_lines_keeps_single_gap() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn pipeline_trims_result() {
        let result = run_pipeline("\n\n<div>Body   </div>\n\n\n\n", None);
        assert_eq!(result, "Body");
    }
}
