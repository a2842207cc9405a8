//! Transformation engine: translate, summarize, describe, and merge the
//! results into a document.
//!
//! One request carries the whole body and asks for three delimited segments
//! (translation, summary, description). Bodies above `chunk_chars` are sent
//! chunk by chunk; the per-chunk summaries are then condensed with one more
//! request. Any failure fails the whole document.

use chrono::SecondsFormat;
use tracing::{debug, instrument};

use feedmill_markdown::{Document, split_markdown};
use feedmill_shared::{FeedmillError, GenerationConfig, Result, parse_timestamp};

use crate::generation::CompletionClient;

/// Heading of the summary block inserted before the translated body.
pub const SUMMARY_HEADING: &str = "## Summary";

/// Settings for one transformation.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub target_language: String,
    /// Advisory: passed into the request, never enforced.
    pub summary_max_chars: usize,
    pub chunk_chars: usize,
    /// Named in the attribution line.
    pub model: String,
}

impl From<&GenerationConfig> for TransformConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            target_language: config.target_language.clone(),
            summary_max_chars: config.summary_max_chars,
            chunk_chars: config.chunk_chars,
            model: config.model.clone(),
        }
    }
}

/// The three pieces produced for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub translation: String,
    pub summary: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Translation,
    Summary,
    Description,
}

impl Segment {
    const ALL: [Segment; 3] = [Self::Translation, Self::Summary, Self::Description];

    fn marker(self) -> &'static str {
        match self {
            Self::Translation => "=== TRANSLATION ===",
            Self::Summary => "=== SUMMARY ===",
            Self::Description => "=== DESCRIPTION ===",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Summary => "summary",
            Self::Description => "description",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        Self::ALL.into_iter().find(|s| s.marker() == line)
    }
}

/// Split a reply into the `wanted` segments, in `wanted` order.
///
/// Text before the first marker is ignored. A missing or blank segment is a
/// [`FeedmillError::GenerationParse`].
fn parse_segments(reply: &str, wanted: &[Segment]) -> Result<Vec<String>> {
    let mut found: Vec<(Segment, String)> = Vec::new();

    for line in reply.lines() {
        if let Some(segment) = Segment::from_line(line) {
            found.push((segment, String::new()));
            continue;
        }
        if let Some((_, text)) = found.last_mut() {
            text.push_str(line);
            text.push('\n');
        }
    }

    wanted
        .iter()
        .map(|want| {
            found
                .iter()
                .rev()
                .find(|(s, _)| s == want)
                .map(|(_, text)| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .ok_or_else(|| FeedmillError::missing_segment(want.name()))
        })
        .collect()
}

/// Parse a full three-segment reply.
pub fn parse_response(reply: &str) -> Result<Generated> {
    let mut segments = parse_segments(reply, &Segment::ALL)?.into_iter();
    let (Some(translation), Some(summary), Some(description)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return Err(FeedmillError::missing_segment("translation"));
    };
    Ok(Generated {
        translation,
        summary,
        description,
    })
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Request translation, summary and description of `text`.
pub fn build_prompt(text: &str, config: &TransformConfig) -> String {
    format!(
        "Translate the Markdown article below into {lang}. Keep the Markdown structure, \
links and code blocks intact. Then write a summary of the article in {lang} of at most \
{max} characters, and a one-sentence description of the article in {lang}.\n\n\
Answer with exactly these three sections and nothing else:\n\n\
{t}\n<translated article>\n{s}\n<summary>\n{d}\n<one-sentence description>\n\n\
Article:\n\n{text}",
        lang = config.target_language,
        max = config.summary_max_chars,
        t = Segment::Translation.marker(),
        s = Segment::Summary.marker(),
        d = Segment::Description.marker(),
    )
}

/// Condense per-chunk summaries into one summary and description.
fn build_condense_prompt(summaries: &[String], config: &TransformConfig) -> String {
    let numbered = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The following are summaries of consecutive parts of one article. Combine them \
into a single summary in {lang} of at most {max} characters, and a one-sentence \
description of the whole article in {lang}.\n\n\
Answer with exactly these two sections and nothing else:\n\n\
{s}\n<summary>\n{d}\n<one-sentence description>\n\n\
Part summaries:\n\n{numbered}",
        lang = config.target_language,
        max = config.summary_max_chars,
        s = Segment::Summary.marker(),
        d = Segment::Description.marker(),
    )
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Generate translation, summary and description for `body`.
pub async fn generate<C>(client: &C, body: &str, config: &TransformConfig) -> Result<Generated>
where
    C: CompletionClient + Sync,
{
    let chunks = split_markdown(body, config.chunk_chars);
    if chunks.len() <= 1 {
        let reply = client.complete(&build_prompt(body, config)).await?;
        return parse_response(&reply);
    }

    debug!(chunks = chunks.len(), "body split for translation");
    let mut translations = Vec::with_capacity(chunks.len());
    let mut summaries = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let reply = client.complete(&build_prompt(chunk, config)).await?;
        let part = parse_response(&reply)?;
        translations.push(part.translation);
        summaries.push(part.summary);
    }

    let reply = client
        .complete(&build_condense_prompt(&summaries, config))
        .await?;
    let mut condensed =
        parse_segments(&reply, &[Segment::Summary, Segment::Description])?.into_iter();
    let (Some(summary), Some(description)) = (condensed.next(), condensed.next()) else {
        return Err(FeedmillError::missing_segment("summary"));
    };

    Ok(Generated {
        translation: translations.join("\n\n"),
        summary,
        description,
    })
}

/// Transform one document. The input is left untouched; on success the
/// returned document carries the new front-matter and body.
#[instrument(skip_all, fields(path = %doc.path.display()))]
pub async fn transform<C>(client: &C, doc: &Document, config: &TransformConfig) -> Result<Document>
where
    C: CompletionClient + Sync,
{
    let generated = generate(client, &doc.body, config).await?;
    Ok(apply(doc, &generated, config))
}

/// Merge generated content into a copy of `doc`.
pub fn apply(doc: &Document, generated: &Generated, config: &TransformConfig) -> Document {
    let mut fm = doc.front_matter.clone();

    fm.set("description", &generated.description);

    if !fm.contains_key("pubDatetime") {
        if let Some(date) = fm.get("date") {
            let normalized = parse_timestamp(&date)
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or(date);
            fm.rename("date", "pubDatetime", &normalized);
        }
    }

    let link = fm.remove("link");
    let attribution = match link {
        Some(link) => format!(
            "*[Source]({}) translated and summarized by {}*",
            link_destination(&link),
            config.model
        ),
        None => format!("*Translated and summarized by {}*", config.model),
    };

    let body = format!(
        "{attribution}\n\n{SUMMARY_HEADING}\n\n{}\n\n---\n\n{}\n",
        generated.summary,
        generated.translation.trim_end()
    );

    Document::new(doc.path.clone(), fm, body)
}

/// Percent-encode the characters that end or break an inline link target.
fn link_destination(link: &str) -> String {
    let mut out = String::with_capacity(link.len());
    for c in link.trim().chars() {
        match c {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            c => out.push(c),
        }
    }
    out
}
