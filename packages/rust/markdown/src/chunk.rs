//! Splitting long Markdown bodies into request-sized chunks.

use std::sync::LazyLock;

use regex::Regex;

/// Split `md` into chunks of at most `max_chars` characters.
///
/// A body that fits is returned whole. Otherwise sections start at heading
/// lines and consecutive sections are packed together up to the limit; a
/// section that is still too long is cut on line boundaries, and a single
/// over-long line at char boundaries. Concatenating the chunks yields the
/// input unchanged.
pub fn split_markdown(md: &str, max_chars: usize) -> Vec<String> {
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#{1,6}\s").expect("valid regex"));

    let max_chars = max_chars.max(1);
    if md.is_empty() {
        return Vec::new();
    }
    if md.chars().count() <= max_chars {
        return vec![md.to_string()];
    }

    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in md.split_inclusive('\n') {
        if HEADING_RE.is_match(line) && !current.is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        sections.push(current);
    }

    let mut chunks = Vec::new();
    let mut packed = String::new();
    let mut packed_chars = 0;
    for section in sections {
        let section_chars = section.chars().count();

        if packed_chars + section_chars > max_chars && !packed.is_empty() {
            chunks.push(std::mem::take(&mut packed));
            packed_chars = 0;
        }

        if section_chars > max_chars {
            split_section(&section, max_chars, &mut chunks);
            continue;
        }

        packed.push_str(&section);
        packed_chars += section_chars;
    }
    if !packed.is_empty() {
        chunks.push(packed);
    }
    chunks
}

fn split_section(section: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut buf = String::new();
    let mut buf_chars = 0;

    for line in section.split_inclusive('\n') {
        let line_chars = line.chars().count();

        if buf_chars + line_chars > max_chars && !buf.is_empty() {
            out.push(std::mem::take(&mut buf));
            buf_chars = 0;
        }

        if line_chars > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                out.push(piece.iter().collect());
            }
            continue;
        }

        buf.push_str(line);
        buf_chars += line_chars;
    }

    if !buf.is_empty() {
        out.push(buf);
    }
}
