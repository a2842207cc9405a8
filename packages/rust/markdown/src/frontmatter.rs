//! Documents with a `---`-delimited front-matter block.
//!
//! The front-matter is kept as an ordered list of raw entries (a top-level
//! `key:` line plus its continuation lines) and is never re-serialized.
//! Entries the pipeline does not touch render back byte-for-byte.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use feedmill_shared::{FeedmillError, Result};

const DELIMITER: &str = "---";

// ---------------------------------------------------------------------------
// FrontMatter
// ---------------------------------------------------------------------------

/// One top-level front-matter entry, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// `None` for leading comments/blank lines before the first key.
    key: Option<String>,
    /// All lines of the entry joined with `\n`, without a trailing newline.
    raw: String,
}

/// Ordered, formatting-preserving front-matter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    entries: Vec<Entry>,
}

impl FrontMatter {
    /// Parse the text between the delimiters.
    pub fn parse(block: &str) -> Self {
        static KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)[ \t]*:").expect("valid regex")
        });

        let mut entries: Vec<Entry> = Vec::new();
        if block.is_empty() {
            return Self { entries };
        }

        for line in block.split('\n') {
            if let Some(caps) = KEY_RE.captures(line) {
                entries.push(Entry {
                    key: Some(caps[1].to_string()),
                    raw: line.to_string(),
                });
                continue;
            }
            match entries.last_mut() {
                Some(entry) => {
                    entry.raw.push('\n');
                    entry.raw.push_str(line);
                }
                None => entries.push(Entry {
                    key: None,
                    raw: line.to_string(),
                }),
            }
        }

        Self { entries }
    }

    /// `true` if there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| e.key.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// The verbatim text of an entry, including its key line.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].raw.as_str())
    }

    /// The scalar value of an entry, unquoted.
    ///
    /// Returns `None` for missing keys, YAML nulls (`null`, `~`, empty), and
    /// block values (lists/maps on continuation lines).
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = self.raw(key)?;
        let first_line = raw.split('\n').next().unwrap_or_default();
        let (_, value) = first_line.split_once(':')?;
        let value = value.trim();
        match value {
            "" | "~" | "null" | "Null" | "NULL" => None,
            _ => Some(unquote(value)),
        }
    }

    /// Set `key` to a double-quoted scalar, replacing the entry in place or
    /// appending it at the end.
    pub fn set(&mut self, key: &str, value: &str) {
        let raw = format!("{key}: \"{}\"", escape_yaml_string(value));
        match self.position(key) {
            Some(i) => self.entries[i].raw = raw,
            None => self.entries.push(Entry {
                key: Some(key.to_string()),
                raw,
            }),
        }
    }

    /// Remove an entry, returning its scalar value (if any).
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let value = self.get(key);
        let i = self.position(key)?;
        self.entries.remove(i);
        value
    }

    /// Rename an entry in place, writing `value` as its new scalar.
    /// Does nothing if `from` is absent.
    pub fn rename(&mut self, from: &str, to: &str, value: &str) {
        if let Some(i) = self.position(from) {
            self.entries[i] = Entry {
                key: Some(to.to_string()),
                raw: format!("{to}: \"{}\"", escape_yaml_string(value)),
            };
        }
    }

    /// Render the block contents (without delimiters).
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.key.as_deref() == Some(key))
    }
}

/// Escape a value for a double-quoted YAML scalar.
pub fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "")
        .replace('\n', "\\n")
}

/// Strip YAML quoting from a single-line scalar.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        return out;
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].replace("''", "'");
    }
    value.to_string()
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A Markdown document: front-matter plus free-form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Where the document was read from (or will be written to).
    pub path: PathBuf,
    pub front_matter: FrontMatter,
    pub body: String,
}

impl Document {
    /// Build a document from parts.
    pub fn new(path: impl Into<PathBuf>, front_matter: FrontMatter, body: String) -> Self {
        Self {
            path: path.into(),
            front_matter,
            body,
        }
    }

    /// Split `text` into front-matter and body.
    ///
    /// Text that does not open with a `---` line, or whose block is never
    /// closed, is all body with an empty front-matter. Blank lines between the
    /// closing delimiter and the body are dropped.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        let path = path.into();
        let Some((block, rest)) = split_front_matter(text) else {
            return Self::new(path, FrontMatter::default(), text.to_string());
        };
        let body = rest.trim_start_matches(['\n', '\r']).to_string();
        Self::new(path, FrontMatter::parse(block), body)
    }

    /// Read and parse a document from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FeedmillError::io(path, e))?;
        Ok(Self::parse(path, &text))
    }

    /// Render back to file contents.
    pub fn render(&self) -> String {
        if self.front_matter.is_empty() {
            return self.body.clone();
        }
        format!(
            "{DELIMITER}\n{}\n{DELIMITER}\n\n{}",
            self.front_matter.render(),
            self.body
        )
    }
}

/// Returns `(block, rest)` where `rest` starts right after the closing delimiter line.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let first_end = text.find('\n')?;
    if text[..first_end].trim_end_matches('\r') != DELIMITER {
        return None;
    }
    let block_start = first_end + 1;

    let mut line_start = block_start;
    loop {
        let line_end = text[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(text.len());
        if text[line_start..line_end].trim_end_matches('\r') == DELIMITER {
            let block_end = line_start.saturating_sub(1).max(block_start);
            let block = text[block_start..block_end].trim_end_matches('\r');
            let rest = text.get(line_end + 1..).unwrap_or("");
            return Some((block, rest));
        }
        if line_end >= text.len() {
            return None;
        }
        line_start = line_end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "---\ntitle: \"Hello \\\"World\\\"\"\npubDatetime: 2025-06-11T08:00:00Z\ntags:\n  - ai\n  - research\ndescription: null\n---\n\nBody text.\n";

    #[test]
    fn parse_splits_front_matter_and_body() {
        let doc = Document::parse("a.md", SAMPLE);
        assert_eq!(
            doc.front_matter.keys().collect::<Vec<_>>(),
            vec!["title", "pubDatetime", "tags", "description"]
        );
        assert_eq!(doc.body, "Body text.\n");
    }

    #[test]
    fn get_unquotes_scalars() {
        let doc = Document::parse("a.md", SAMPLE);
        assert_eq!(doc.front_matter.get("title").as_deref(), Some("Hello \"World\""));
        assert_eq!(
            doc.front_matter.get("pubDatetime").as_deref(),
            Some("2025-06-11T08:00:00Z")
        );
        assert_eq!(doc.front_matter.get("description"), None);
        assert_eq!(doc.front_matter.get("tags"), None);
    }

    #[test]
    fn single_quoted_scalar() {
        let fm = FrontMatter::parse("title: 'It''s here'");
        assert_eq!(fm.get("title").as_deref(), Some("It's here"));
    }

    #[test]
    fn list_entries_keep_continuation_lines() {
        let doc = Document::parse("a.md", SAMPLE);
        assert_eq!(doc.front_matter.raw("tags"), Some("tags:\n  - ai\n  - research"));
    }

    #[test]
    fn untouched_document_renders_identically() {
        let doc = Document::parse("a.md", SAMPLE);
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut doc = Document::parse("a.md", SAMPLE);
        doc.front_matter.set("description", "A short \"quoted\" line.");
        let rendered = doc.render();
        assert!(rendered.contains("description: \"A short \\\"quoted\\\" line.\"\n---"));
        assert_eq!(
            doc.front_matter.get("description").as_deref(),
            Some("A short \"quoted\" line.")
        );
        // Neighbouring entries are untouched.
        assert!(rendered.contains("tags:\n  - ai\n  - research\n"));
    }

    #[test]
    fn set_appends_missing_key() {
        let mut fm = FrontMatter::parse("title: x");
        fm.set("description", "d");
        assert_eq!(fm.render(), "title: x\ndescription: \"d\"");
    }

    #[test]
    fn set_escapes_newlines() {
        let mut fm = FrontMatter::default();
        fm.set("description", "line one\nline two");
        assert_eq!(fm.render(), "description: \"line one\\nline two\"");
        assert_eq!(fm.get("description").as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn remove_returns_value() {
        let mut fm = FrontMatter::parse("title: x\nlink: \"https://a.com/p\"");
        assert_eq!(fm.remove("link").as_deref(), Some("https://a.com/p"));
        assert!(!fm.contains_key("link"));
        assert_eq!(fm.remove("link"), None);
    }

    #[test]
    fn rename_keeps_position() {
        let mut fm = FrontMatter::parse("title: x\ndate: \"2025-01-01\"\nlink: y");
        fm.rename("date", "pubDatetime", "2025-01-01T00:00:00+00:00");
        assert_eq!(
            fm.keys().collect::<Vec<_>>(),
            vec!["title", "pubDatetime", "link"]
        );
    }

    #[test]
    fn leading_comments_are_preserved() {
        let text = "---\n# generated\ntitle: x\n---\nbody";
        let doc = Document::parse("a.md", text);
        assert_eq!(doc.front_matter.render(), "# generated\ntitle: x");
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn no_front_matter_is_all_body() {
        let doc = Document::parse("a.md", "# Just a heading\n\ntext\n");
        assert!(doc.front_matter.is_empty());
        assert_eq!(doc.body, "# Just a heading\n\ntext\n");
        assert_eq!(doc.render(), "# Just a heading\n\ntext\n");
    }

    #[test]
    fn unclosed_front_matter_is_all_body() {
        let text = "---\ntitle: x\nno closing delimiter\n";
        let doc = Document::parse("a.md", text);
        assert!(doc.front_matter.is_empty());
        assert_eq!(doc.body, text);
    }

    #[test]
    fn empty_front_matter_block() {
        let doc = Document::parse("a.md", "---\n---\nbody");
        assert!(doc.front_matter.is_empty());
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn crlf_delimiters_are_recognized() {
        let doc = Document::parse("a.md", "---\r\ntitle: x\r\n---\r\n\r\nbody\r\n");
        assert_eq!(doc.front_matter.get("title").as_deref(), Some("x"));
        assert_eq!(doc.body, "body\r\n");
    }
}
