//! Full-text article extraction.

use readability::extractor;
use reqwest::header;
use std::io::Cursor;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::rss::BROWSER_USER_AGENT;
use crate::TARGET_WEB_REQUEST;

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(15);

/// Extracted article bodies this short are usually cookie banners or teasers.
pub const MIN_ARTICLE_HTML_LEN: usize = 200;

/// Download an article page and extract its main content as HTML.
///
/// Any failure yields `None` so the caller can fall back to the feed content.
pub async fn fetch_article_html(client: &reqwest::Client, article_url: &str) -> Option<String> {
    debug!(target: TARGET_WEB_REQUEST, "Scraping full article from {}", article_url);

    let parsed_url = match url::Url::parse(article_url) {
        Ok(u) => u,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Cannot scrape invalid URL {}: {}", article_url, err);
            return None;
        }
    };

    let response = match client
        .get(article_url)
        .header(header::USER_AGENT, BROWSER_USER_AGENT)
        .timeout(SCRAPE_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(r) => r,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Failed to scrape {}: {}", article_url, err);
            return None;
        }
    };

    let page = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Failed to read article body from {}: {}", article_url, err);
            return None;
        }
    };

    extract_main_content(&page, &parsed_url)
}

/// Run readability over a page; returns `None` when nothing substantial is found.
pub fn extract_main_content(page: &str, page_url: &url::Url) -> Option<String> {
    let mut reader = Cursor::new(page.as_bytes());
    match extractor::extract(&mut reader, page_url) {
        Ok(product) => {
            let content = product.content.trim().to_string();
            if is_substantial(&content) {
                Some(content)
            } else {
                debug!(target: TARGET_WEB_REQUEST, "Extracted content from {} too short ({} chars)", page_url, content.chars().count());
                None
            }
        }
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Readability failed for {}: {:?}", page_url, err);
            None
        }
    }
}

/// Length is counted in characters so non-Latin pages are judged like any other.
fn is_substantial(content: &str) -> bool {
    content.chars().count() > MIN_ARTICLE_HTML_LEN
}
