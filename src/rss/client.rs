//! HTTP client creation and request handling for RSS feeds.

use anyhow::Result;
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tracing::{debug, info};

use super::types::REQUEST_TIMEOUT;
use crate::TARGET_WEB_REQUEST;

pub const FEED_USER_AGENT: &str = concat!("kindle-digest/", env!("CARGO_PKG_VERSION"));
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:138.0) Gecko/20100101 Firefox/138.0";

/// Create the client shared by every request of a run.
pub fn create_http_client() -> Result<reqwest::Client> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

/// Attempt to fetch a URL, retrying once with browser emulation headers if the
/// standard feed-reader request fails.
///
/// Returns the successful response and whether browser emulation was needed.
pub async fn fetch_with_fallback(
    client: &reqwest::Client,
    url: &str,
) -> Result<(reqwest::Response, bool)> {
    debug!(target: TARGET_WEB_REQUEST, "Attempting standard request to {}", url);

    let standard_result = client
        .get(url)
        .header(header::USER_AGENT, FEED_USER_AGENT)
        .header(header::ACCEPT, "application/rss+xml, application/atom+xml, application/feed+json, application/xml, text/xml, */*;q=0.9")
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .send()
        .await;

    let first_failure = match standard_result {
        Ok(resp) if resp.status().is_success() => {
            debug!(target: TARGET_WEB_REQUEST, "Standard request to {} succeeded", url);
            return Ok((resp, false));
        }
        Ok(resp) => format!("HTTP error: {}", resp.status()),
        Err(err) if err.is_timeout() => format!(
            "Request timed out after {} seconds",
            REQUEST_TIMEOUT.as_secs()
        ),
        Err(err) => format!("Request failed: {}", err),
    };

    debug!(target: TARGET_WEB_REQUEST, "Standard request to {} failed ({}), trying browser emulation", url, first_failure);

    let browser_result = client
        .get(url)
        .header(header::USER_AGENT, BROWSER_USER_AGENT)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .header("DNT", "1")
        .header("Upgrade-Insecure-Requests", "1")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header("Sec-Fetch-User", "?1")
        .send()
        .await;

    match browser_result {
        Ok(resp) if resp.status().is_success() => {
            info!(target: TARGET_WEB_REQUEST, "Browser emulation request to {} succeeded", url);
            Ok((resp, true))
        }
        Ok(resp) => Err(anyhow::anyhow!(
            "Both standard and browser emulation requests failed ({}; browser emulation HTTP error: {})",
            first_failure,
            resp.status()
        )),
        Err(err) => Err(anyhow::anyhow!(
            "Both standard and browser emulation requests failed ({}; browser emulation: {})",
            first_failure,
            err
        )),
    }
}
