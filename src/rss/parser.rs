//! Feed parsing logic for RSS, Atom, and JSON formats.

use anyhow::Result;
use feed_rs::{model, parser};
use std::io::Cursor;
use tracing::{debug, warn};

use super::types::{FeedEntry, ParsedFeed, UNTITLED_ENTRY};
use super::util::{cleanup_xml, looks_like_feed};
use crate::TARGET_WEB_REQUEST;

/// Parse a feed body, retrying once on a cleaned-up copy of malformed XML.
pub fn parse_feed(body: &str, source_url: &str) -> Result<ParsedFeed> {
    match parser::parse(Cursor::new(body.as_bytes())) {
        Ok(feed) => Ok(convert_feed(feed, source_url, false)),
        Err(first_err) => {
            if !looks_like_feed(body) {
                let preview = if body
                    .chars()
                    .all(|c| c.is_ascii_graphic() || c.is_whitespace())
                {
                    body.chars().take(100).collect::<String>()
                } else {
                    "[binary data]".to_string()
                };
                return Err(anyhow::anyhow!(
                    "Content from {} is not an RSS or Atom feed ({}). Content preview: {}",
                    source_url,
                    first_err,
                    preview
                ));
            }

            debug!(target: TARGET_WEB_REQUEST, "Initial parse of {} failed ({}), retrying after XML cleanup", source_url, first_err);
            let cleaned = cleanup_xml(body);
            match parser::parse(Cursor::new(cleaned.as_bytes())) {
                Ok(feed) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed {} parsed only after XML cleanup", source_url);
                    Ok(convert_feed(feed, source_url, true))
                }
                Err(second_err) => Err(anyhow::anyhow!(
                    "Failed to parse feed from {} even after cleanup. First error: {}. Second error: {}",
                    source_url,
                    first_err,
                    second_err
                )),
            }
        }
    }
}

fn convert_feed(feed: model::Feed, source_url: &str, cleaned_up: bool) -> ParsedFeed {
    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title(source_url));

    let entries = feed.entries.into_iter().filter_map(convert_entry).collect();

    ParsedFeed {
        title,
        entries,
        cleaned_up,
    }
}

/// Entries without an id and without a link cannot be tracked and are dropped.
fn convert_entry(entry: model::Entry) -> Option<FeedEntry> {
    let link = entry.links.first().map(|link| link.href.clone());

    let id = if entry.id.trim().is_empty() {
        link.clone()?
    } else {
        entry.id.clone()
    };

    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_ENTRY.to_string());

    let content = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default()
        .trim()
        .to_string();

    Some(FeedEntry {
        id,
        title,
        link,
        published: entry.published.or(entry.updated),
        content,
    })
}

fn fallback_title(source_url: &str) -> String {
    url::Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| source_url.to_string())
}
