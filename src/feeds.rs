//! Loading the list of feed URLs.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::rss::is_valid_url;

/// Reads one feed URL per line.
///
/// Blank lines and `#` comments are ignored; lines that are not http(s) URLs are
/// skipped with a warning. Repeated URLs are kept, each line is one fetch.
pub fn load_feed_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed list {}", path.display()))?;
    Ok(parse_feed_list(&content))
}

pub fn parse_feed_list(content: &str) -> Vec<String> {
    let mut feeds = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !is_valid_url(line) {
            warn!("Skipping invalid feed URL on line {}: {}", line_no + 1, line);
            continue;
        }
        feeds.push(line.to_string());
    }
    debug!("Loaded {} feed URLs", feeds.len());
    feeds
}
