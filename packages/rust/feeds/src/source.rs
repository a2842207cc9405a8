//! HTTP feed source: fetch a feed, select new items, render raw documents.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use feedmill_markdown::{Document, html_to_markdown};
use feedmill_shared::{FeedmillError, FetchConfig, Result};

use crate::parser::{FeedItem, parse_feed};
use crate::render::render_item;

/// One rendered item, ready to be written under the feed directory.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub published: DateTime<Utc>,
    /// Path is the bare file name.
    pub document: Document,
}

/// Everything new from one feed since its cursor.
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub feed_title: Option<String>,
    /// Oldest first.
    pub documents: Vec<FeedDocument>,
    /// Newest timestamp among all new items, including ones skipped for an
    /// empty body. `None` when nothing was new.
    pub newest: Option<DateTime<Utc>>,
}

/// A source of feed items.
pub trait FeedSource {
    /// Fetch items of `feed_url` strictly newer than `since`.
    fn fetch_since(
        &self,
        feed_url: &str,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<FeedBatch>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFeedSource
// ---------------------------------------------------------------------------

/// [`FeedSource`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedmillError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    async fn get_text(&self, url: &str) -> std::result::Result<String, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        response.text().await.map_err(|e| e.to_string())
    }

    /// Markdown body for one item: the linked article page, else the
    /// item's inline HTML. Empty when neither yields text.
    async fn item_body(&self, item: &FeedItem) -> String {
        let base = item.link.as_deref().and_then(|l| Url::parse(l).ok());

        if let Some(link) = item.link.as_deref() {
            match self.get_text(link).await {
                Ok(html) => match html_to_markdown(&html, base.as_ref()) {
                    Ok(md) if !md.is_empty() => return md,
                    Ok(_) => debug!(link, "article page has no text content"),
                    Err(e) => warn!(link, error = %e, "article conversion failed"),
                },
                Err(e) => warn!(link, error = %e, "article fetch failed, using feed content"),
            }
        }

        item.content_html
            .as_deref()
            .and_then(|html| html_to_markdown(html, base.as_ref()).ok())
            .unwrap_or_default()
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(skip_all, fields(feed = %feed_url))]
    async fn fetch_since(
        &self,
        feed_url: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<FeedBatch> {
        let xml = self
            .get_text(feed_url)
            .await
            .map_err(|e| FeedmillError::fetch(feed_url, e))?;
        let parsed = parse_feed(&xml).map_err(|e| FeedmillError::fetch(feed_url, e.to_string()))?;

        let mut items: Vec<FeedItem> = parsed
            .items
            .into_iter()
            .filter(|item| since.is_none_or(|cursor| item.published > cursor))
            .collect();
        items.sort_by_key(|item| item.published);

        let newest = items.last().map(|item| item.published);
        info!(new_items = items.len(), ?since, "feed parsed");

        let mut documents = Vec::with_capacity(items.len());
        for item in &items {
            let body = self.item_body(item).await;
            if body.trim().is_empty() {
                warn!(title = %item.title, "empty article body, skipping item");
                continue;
            }
            documents.push(FeedDocument {
                published: item.published,
                document: render_item(item, &body),
            });
        }

        Ok(FeedBatch {
            feed_title: parsed.title,
            documents,
            newest,
        })
    }
}
