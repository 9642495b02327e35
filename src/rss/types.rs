//! Type definitions for the RSS module.

use chrono::{DateTime, Utc};
use tokio::time::Duration;

/// Raw response of a feed request, decoded to text.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
    pub browser_emulation_used: bool,
}

/// A parsed feed: its display title and entries in document order.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub entries: Vec<FeedEntry>,
    /// Set when the feed only parsed after XML cleanup.
    pub cleaned_up: bool,
}

/// A single entry extracted from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Summary, description or content body as provided by the feed (HTML).
    pub content: String,
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const UNTITLED_ENTRY: &str = "Untitled";
