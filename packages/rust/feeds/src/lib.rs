//! Feed ingestion: RSS/Atom parsing, article extraction, fetch cursors.
//!
//! - [`parse_feed`]: RSS 2.0 / Atom → dated [`FeedItem`]s
//! - [`HttpFeedSource`]: the [`FeedSource`] used by `feedmill fetch`
//! - [`CursorStore`]: per-feed last-seen timestamps in `last_fetched.json`

mod cursor;
mod parser;
mod render;
mod source;

pub use cursor::CursorStore;
pub use parser::{FeedItem, ParsedFeed, parse_feed};
pub use render::{render_item, sanitize_filename};
pub use source::{FeedBatch, FeedDocument, FeedSource, HttpFeedSource};
