//! Fetching a single feed and turning it into entries.

use anyhow::{Context, Result};
use reqwest::header;
use tracing::{debug, info};

use super::client::fetch_with_fallback;
use super::parser::parse_feed;
use super::types::{FetchedFeed, ParsedFeed};
use super::util::{decode_text, decompress_body};
use crate::TARGET_WEB_REQUEST;

/// Download a feed and decode its body to text.
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<FetchedFeed> {
    debug!(target: TARGET_WEB_REQUEST, "Loading RSS feed from {}", url);

    let (response, browser_emulation_used) = fetch_with_fallback(client, url).await?;
    if browser_emulation_used {
        info!(target: TARGET_WEB_REQUEST, "Browser emulation was required for {}", url);
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_lowercase());

    // Extract the content encoding before consuming the response
    let content_encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_lowercase());

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body from {}", url))?;

    let decompressed = decompress_body(&bytes, content_encoding.as_deref(), url);
    let body = decode_text(&decompressed, content_type.as_deref());

    debug!(target: TARGET_WEB_REQUEST, "First 200 characters of {}: {}", url, body.chars().take(200).collect::<String>());

    Ok(FetchedFeed {
        url: url.to_string(),
        content_type,
        body,
        browser_emulation_used,
    })
}

/// Fetch and parse a feed in one step.
pub async fn fetch_and_parse(client: &reqwest::Client, url: &str) -> Result<ParsedFeed> {
    let fetched = fetch_feed(client, url).await?;
    let feed = parse_feed(&fetched.body, url)?;
    debug!(target: TARGET_WEB_REQUEST, "Parsed feed {} ({}) with {} entries", feed.title, url, feed.entries.len());
    Ok(feed)
}
