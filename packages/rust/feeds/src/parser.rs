//! RSS 2.0 / Atom parsing into [`FeedItem`]s.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use tracing::debug;

use feedmill_shared::{FeedmillError, Result, parse_timestamp};

/// One dated entry from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub published: DateTime<Utc>,
    pub title: String,
    pub link: Option<String>,
    /// Inline HTML from `content:encoded`/`content`, else `description`/`summary`.
    pub content_html: Option<String>,
}

/// A parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    /// Items in document order. Entries without a parseable date are dropped.
    pub items: Vec<FeedItem>,
}

// ---------------------------------------------------------------------------
// RSS 2.0
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    /// `dc:date`; the deserializer matches on local names.
    #[serde(rename = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    /// `content:encoded`.
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
}

// ---------------------------------------------------------------------------
// Atom
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<AtomText>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// The `alternate` link, or the first link with an href.
    fn link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse an RSS 2.0 or Atom document, detected from its root element.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let xml = scrub_html_entities(xml);

    match root_element(&xml)?.as_str() {
        "rss" => parse_rss(&xml),
        "feed" => parse_atom(&xml),
        other => Err(FeedmillError::parse(format!(
            "unsupported feed root element <{other}>"
        ))),
    }
}

fn parse_rss(xml: &str) -> Result<ParsedFeed> {
    let rss: Rss = quick_xml::de::from_str(xml)
        .map_err(|e| FeedmillError::parse(format!("invalid RSS: {e}")))?;

    let mut items = Vec::with_capacity(rss.channel.items.len());
    for item in rss.channel.items {
        let Some(published) = item
            .pub_date
            .as_deref()
            .or(item.dc_date.as_deref())
            .and_then(parse_timestamp)
        else {
            debug!(title = ?item.title, "skipping RSS item without a usable date");
            continue;
        };

        items.push(FeedItem {
            published,
            title: clean_title(item.title.as_deref()),
            link: non_empty(item.link),
            content_html: non_empty(item.content_encoded).or(non_empty(item.description)),
        });
    }

    Ok(ParsedFeed {
        title: non_empty(rss.channel.title),
        items,
    })
}

fn parse_atom(xml: &str) -> Result<ParsedFeed> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)
        .map_err(|e| FeedmillError::parse(format!("invalid Atom: {e}")))?;

    let mut items = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let Some(published) = entry
            .published
            .as_deref()
            .or(entry.updated.as_deref())
            .and_then(parse_timestamp)
        else {
            debug!("skipping Atom entry without a usable date");
            continue;
        };

        let link = entry.link();
        items.push(FeedItem {
            published,
            title: clean_title(entry.title.as_ref().map(|t| t.value.as_str())),
            link: non_empty(link),
            content_html: non_empty(entry.content.map(|t| t.value))
                .or(non_empty(entry.summary.map(|t| t.value))),
        });
    }

    Ok(ParsedFeed {
        title: non_empty(feed.title.map(|t| t.value)),
        items,
    })
}

/// Local name of the first element in the document.
fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(FeedmillError::parse("feed document is empty")),
            Ok(_) => continue,
            Err(e) => return Err(FeedmillError::parse(format!("invalid XML: {e}"))),
        }
    }
}

fn clean_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.split_whitespace().collect::<Vec<_>>().join(" "),
        _ => "no-title".to_string(),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Replace HTML-only named entities that are not valid in XML.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&hellip;", "&#8230;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>TechCrunch AI</title>
    <link>https://techcrunch.com</link>
    <item>
      <title>  New   model released </title>
      <link>https://techcrunch.com/2025/06/11/new-model/</link>
      <pubDate>Wed, 11 Jun 2025 08:00:00 +0000</pubDate>
      <description><![CDATA[<p>Short teaser&nbsp;text</p>]]></description>
      <content:encoded><![CDATA[<p>Full article body.</p>]]></content:encoded>
    </item>
    <item>
      <title>Undated item</title>
      <link>https://techcrunch.com/undated/</link>
    </item>
    <item>
      <title>Teaser only</title>
      <link>https://techcrunch.com/2025/06/10/teaser/</link>
      <pubDate>Tue, 10 Jun 2025 12:30:00 GMT</pubDate>
      <description>Plain &amp; simple&nbsp;teaser</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="text">arXiv cs.AI</title>
  <entry>
    <title>Agents that plan</title>
    <link rel="self" href="https://arxiv.org/api/1"/>
    <link rel="alternate" href="https://arxiv.org/abs/2506.00001"/>
    <published>2025-06-11T00:00:00Z</published>
    <summary type="html">&lt;p&gt;We study planning.&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Only updated</title>
    <link href="https://arxiv.org/abs/2506.00002"/>
    <updated>2025-06-12T09:15:00+02:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let feed = parse_feed(RSS).unwrap();
        assert_eq!(feed.title.as_deref(), Some("TechCrunch AI"));
        assert_eq!(feed.items.len(), 2, "undated item is dropped");

        let first = &feed.items[0];
        assert_eq!(first.title, "New model released");
        assert_eq!(
            first.link.as_deref(),
            Some("https://techcrunch.com/2025/06/11/new-model/")
        );
        assert_eq!(first.published, "2025-06-11T08:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(first.content_html.as_deref(), Some("<p>Full article body.</p>"));
    }

    #[test]
    fn rss_item_dated_by_dc_date_is_kept() {
        let xml = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Lab notes</title>
    <item>
      <title>Dublin Core only</title>
      <link>https://example.org/notes/1</link>
      <dc:date>2025-06-11T08:00:00Z</dc:date>
      <dc:creator>Someone</dc:creator>
    </item>
  </channel>
</rss>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(
            feed.items[0].published,
            "2025-06-11T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn pub_date_wins_over_dc_date() {
        let xml = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <item>
      <title>Both</title>
      <pubDate>Tue, 10 Jun 2025 12:30:00 GMT</pubDate>
      <dc:date>2025-06-11T08:00:00Z</dc:date>
    </item>
  </channel>
</rss>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(
            feed.items[0].published,
            "2025-06-10T12:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn rss_falls_back_to_description() {
        let feed = parse_feed(RSS).unwrap();
        let teaser = &feed.items[1];
        let html = teaser.content_html.as_deref().unwrap();
        assert!(html.starts_with("Plain & simple"));
    }

    #[test]
    fn parses_atom_entries() {
        let feed = parse_feed(ATOM).unwrap();
        assert_eq!(feed.title.as_deref(), Some("arXiv cs.AI"));
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.link.as_deref(), Some("https://arxiv.org/abs/2506.00001"));
        assert_eq!(first.content_html.as_deref(), Some("<p>We study planning.</p>"));

        let second = &feed.items[1];
        assert_eq!(
            second.published,
            "2025-06-12T07:15:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(second.content_html, None);
    }

    #[test]
    fn rejects_unknown_root() {
        let err = parse_feed("<html><body/></html>").unwrap_err();
        assert!(err.to_string().contains("<html>"));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(parse_feed("").is_err());
    }

    #[test]
    fn missing_title_gets_placeholder() {
        assert_eq!(clean_title(None), "no-title");
        assert_eq!(clean_title(Some("   ")), "no-title");
    }
}
