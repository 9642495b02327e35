//! One scheduled run: feeds in, one digest out.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::digest::{Digest, DigestArticle, FeedSection};
use crate::feeds::load_feed_list;
use crate::llm::generate_llm_response;
use crate::mailer::Courier;
use crate::prompts::summary_prompt;
use crate::rss::{create_http_client, fetch_and_parse, FeedEntry};
use crate::scrape::fetch_article_html;
use crate::state::SentItems;
use crate::{LLMParams, TARGET_LLM_REQUEST, TARGET_WEB_REQUEST};

pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable";

/// What a run did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub feeds_listed: usize,
    pub feeds_failed: Vec<String>,
    pub articles: usize,
    pub delivered: bool,
}

/// Decides whether an entry belongs in this run's digest.
pub fn is_new_entry(
    entry: &FeedEntry,
    sent: &SentItems,
    seen_this_run: &HashSet<String>,
    cutoff: DateTime<Utc>,
) -> bool {
    if sent.contains(&entry.id) || seen_this_run.contains(&entry.id) {
        return false;
    }
    // Undated entries count as published now
    match entry.published {
        Some(published) => published >= cutoff,
        None => true,
    }
}

/// Execute the whole pipeline once.
///
/// Feed failures are logged and skipped; summarization (unless tolerated),
/// delivery and ledger errors abort the run. The ledger is only written after
/// the digest was delivered.
pub async fn run<C: Courier>(config: &Config, llm: &LLMParams, courier: &C) -> Result<RunReport> {
    let cutoff = config.cutoff(Utc::now())?;
    let retention = config.retention()?;

    let feeds = load_feed_list(&config.feeds_path)?;
    info!("Processing {} feeds...", feeds.len());

    let mut sent = match &config.state_path {
        Some(path) => SentItems::load(path)?,
        None => SentItems::default(),
    };

    let client = create_http_client()?;
    let mut report = RunReport {
        feeds_listed: feeds.len(),
        ..RunReport::default()
    };
    let mut digest = Digest::new(config.digest_title.clone(), Local::now());
    let mut seen_this_run = HashSet::new();

    for feed_url in &feeds {
        info!(target: TARGET_WEB_REQUEST, "Fetching: {}", feed_url);
        let feed = match fetch_and_parse(&client, feed_url).await {
            Ok(feed) => feed,
            Err(err) => {
                error!(target: TARGET_WEB_REQUEST, "Skipping feed {}: {:#}", feed_url, err);
                report.feeds_failed.push(feed_url.clone());
                continue;
            }
        };
        info!(target: TARGET_WEB_REQUEST, "  Found {} entries in {}", feed.entries.len(), feed.title);

        let mut section = FeedSection {
            feed_title: feed.title.clone(),
            feed_url: feed_url.clone(),
            articles: Vec::new(),
        };

        for entry in feed.entries {
            if !is_new_entry(&entry, &sent, &seen_this_run, cutoff) {
                debug!("Skipping {} (already sent or outside window)", entry.id);
                continue;
            }
            seen_this_run.insert(entry.id.clone());
            info!("  New article: {}", entry.title.chars().take(50).collect::<String>());

            let content = article_content(&client, config, &entry).await;
            let summary = summarize(config, llm, &entry.title, &content).await?;

            section.articles.push(DigestArticle {
                id: entry.id,
                title: entry.title,
                link: entry.link,
                summary,
                content,
            });
        }

        digest.push_section(section);
    }

    report.articles = digest.article_count();
    info!("Total new articles: {}", report.articles);

    if digest.is_empty() {
        info!("No new articles");
        return Ok(report);
    }

    courier.deliver(&digest).await?;
    report.delivered = true;

    if let Some(path) = &config.state_path {
        let delivered_at = Utc::now();
        for article in digest.articles() {
            sent.mark(article.id.clone(), delivered_at);
        }
        let pruned = sent.prune(delivered_at, retention);
        if pruned > 0 {
            debug!("Pruned {} ledger entries", pruned);
        }
        sent.save(path)?;
    }

    info!(
        "Sent {} articles from {} feeds",
        report.articles,
        digest.sections.len()
    );
    Ok(report)
}

async fn article_content(client: &reqwest::Client, config: &Config, entry: &FeedEntry) -> String {
    if config.scrape_full_text {
        if let Some(link) = &entry.link {
            if let Some(html) = fetch_article_html(client, link).await {
                return html;
            }
            debug!(target: TARGET_WEB_REQUEST, "Falling back to feed content for {}", link);
        }
    }
    entry.content.clone()
}

async fn summarize(config: &Config, llm: &LLMParams, title: &str, content: &str) -> Result<String> {
    let prompt = summary_prompt(title, content);
    match generate_llm_response(&prompt, llm).await {
        Ok(summary) => Ok(summary),
        Err(err) if config.tolerate_summary_errors => {
            warn!(target: TARGET_LLM_REQUEST, "Summary generation failed for {:?}: {:#}", title, err);
            Ok(SUMMARY_UNAVAILABLE.to_string())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to summarize {:?}", title)),
    }
}
