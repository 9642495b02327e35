use anyhow::Result;
use chrono::{Duration, Utc};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kindle_digest::config::{Config, SmtpSettings};
use kindle_digest::digest::Digest;
use kindle_digest::mailer::{Courier, SmtpCourier};
use kindle_digest::pipeline::{self, SUMMARY_UNAVAILABLE};
use kindle_digest::{GeminiClient, LLMClient, LLMParams};

/// Keeps every digest it is handed instead of sending it.
#[derive(Default)]
struct RecordingCourier {
    delivered: Mutex<Vec<String>>,
}

impl RecordingCourier {
    fn deliveries(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Courier for RecordingCourier {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        self.delivered.lock().unwrap().push(digest.render_html());
        Ok(())
    }
}

fn rss(title: &str, items: &[(&str, &str, Duration)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>{}</title>"#,
        title
    );
    for (guid, item_title, age) in items {
        body.push_str(&format!(
            "<item><title>{}</title><link>https://blog.example.com/{}</link><guid>{}</guid>\
             <pubDate>{}</pubDate><description>Body of {}</description></item>",
            item_title,
            guid,
            guid,
            (Utc::now() - *age).to_rfc2822(),
            item_title
        ));
    }
    body.push_str("</channel></rss>");
    body
}

async fn mount_feed(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_gemini(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/gemini-test:generateContent$"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "A short summary."}]}}]
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn llm(server: &MockServer) -> LLMParams {
    LLMParams {
        llm_client: LLMClient::Gemini(GeminiClient::new("test-key", Some(server.uri())).unwrap()),
        model: "gemini-test".to_string(),
        temperature: 0.2,
    }
}

fn config(dir: &Path, feeds: &[String]) -> Config {
    let feeds_path = dir.join("feeds.txt");
    fs::write(&feeds_path, feeds.join("\n")).unwrap();
    Config {
        feeds_path,
        state_path: Some(dir.join("sent_items.json")),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_one_digest_covers_every_feed() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/lab.xml",
        rss(
            "Lab Notes",
            &[
                ("lab-1", "Sparse attention", Duration::hours(1)),
                ("lab-2", "Better tokenizers", Duration::hours(3)),
            ],
        ),
    )
    .await;
    mount_feed(
        &server,
        "/blog.xml",
        rss("Model Blog", &[("blog-1", "Scaling laws", Duration::hours(2))]),
    )
    .await;
    mount_feed(&server, "/quiet.xml", rss("Quiet Feed", &[])).await;
    // Standard request plus the browser emulation retry
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_gemini(&server, 200, 3).await;

    let dir = tempfile::tempdir().unwrap();
    let feeds: Vec<String> = ["lab", "broken", "quiet", "blog"]
        .iter()
        .map(|name| format!("{}/{}.xml", server.uri(), name))
        .collect();
    let config = config(dir.path(), &feeds);
    let courier = RecordingCourier::default();

    let report = pipeline::run(&config, &llm(&server), &courier).await.unwrap();

    assert_eq!(report.feeds_listed, 4);
    assert_eq!(report.feeds_failed, vec![feeds[1].clone()]);
    assert_eq!(report.articles, 3);
    assert!(report.delivered);

    let deliveries = courier.deliveries();
    assert_eq!(deliveries.len(), 1);
    let html = &deliveries[0];
    assert!(html.contains("Sparse attention"));
    assert!(html.contains("Better tokenizers"));
    assert!(html.contains("Scaling laws"));
    assert!(html.contains("A short summary."));
    assert!(!html.contains("Quiet Feed"));
    assert!(html.find("Lab Notes").unwrap() < html.find("Model Blog").unwrap());

    let ledger = fs::read_to_string(dir.path().join("sent_items.json")).unwrap();
    for id in ["lab-1", "lab-2", "blog-1"] {
        assert!(ledger.contains(id));
    }
}

#[tokio::test]
async fn test_second_run_skips_delivered_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lab.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss("Lab Notes", &[("lab-1", "Sparse attention", Duration::hours(1))])),
        )
        .expect(2)
        .mount(&server)
        .await;
    mount_gemini(&server, 200, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[format!("{}/lab.xml", server.uri())]);
    let llm = llm(&server);

    let first = RecordingCourier::default();
    assert!(pipeline::run(&config, &llm, &first).await.unwrap().delivered);

    let second = RecordingCourier::default();
    let report = pipeline::run(&config, &llm, &second).await.unwrap();
    assert!(!report.delivered);
    assert_eq!(report.articles, 0);
    assert!(second.deliveries().is_empty());
}

#[tokio::test]
async fn test_entries_outside_lookback_are_ignored() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/lab.xml",
        rss(
            "Lab Notes",
            &[
                ("old-1", "Last week", Duration::hours(30)),
                ("old-2", "Last month", Duration::days(20)),
            ],
        ),
    )
    .await;
    mount_gemini(&server, 200, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[format!("{}/lab.xml", server.uri())]);
    let courier = RecordingCourier::default();

    let report = pipeline::run(&config, &llm(&server), &courier).await.unwrap();
    assert!(!report.delivered);
    assert!(courier.deliveries().is_empty());
    assert!(!dir.path().join("sent_items.json").exists());
}

#[tokio::test]
async fn test_smtp_failure_leaves_ledger_untouched() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/lab.xml",
        rss("Lab Notes", &[("lab-1", "Sparse attention", Duration::hours(1))]),
    )
    .await;
    mount_gemini(&server, 200, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[format!("{}/lab.xml", server.uri())]);
    let ledger_path = dir.path().join("sent_items.json");
    let earlier = r#"{"older-entry": "2026-10-17T06:00:00Z"}"#;
    fs::write(&ledger_path, earlier).unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let courier = SmtpCourier::new(SmtpSettings {
        host: "127.0.0.1".to_string(),
        port,
        username: "sender@example.com".to_string(),
        password: "secret".to_string(),
        from: "sender@example.com".to_string(),
        to: "reader@kindle.com".to_string(),
        starttls: false,
    });

    let result = pipeline::run(&config, &llm(&server), &courier).await;
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&ledger_path).unwrap(), earlier);
}

#[tokio::test]
async fn test_summary_failure_aborts_delivery() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/lab.xml",
        rss("Lab Notes", &[("lab-1", "Sparse attention", Duration::hours(1))]),
    )
    .await;
    mount_gemini(&server, 500, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[format!("{}/lab.xml", server.uri())]);
    let courier = RecordingCourier::default();

    assert!(pipeline::run(&config, &llm(&server), &courier).await.is_err());
    assert!(courier.deliveries().is_empty());
    assert!(!dir.path().join("sent_items.json").exists());
}

#[tokio::test]
async fn test_preview_tolerates_summary_failure() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/lab.xml",
        rss("Lab Notes", &[("lab-1", "Sparse attention", Duration::hours(1))]),
    )
    .await;
    mount_gemini(&server, 500, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        state_path: None,
        tolerate_summary_errors: true,
        ..config(dir.path(), &[format!("{}/lab.xml", server.uri())])
    };
    let courier = RecordingCourier::default();

    let report = pipeline::run(&config, &llm(&server), &courier).await.unwrap();
    assert!(report.delivered);
    assert!(courier.deliveries()[0].contains(SUMMARY_UNAVAILABLE));
    assert!(!dir.path().join("sent_items.json").exists());
}

fn article_page() -> String {
    let paragraph = "<p>The authors replace dense attention with a learned sparsity pattern, \
        cutting training compute while matching the baseline on long-context benchmarks, \
        and report where the approach still falls short on retrieval-heavy tasks.</p>";
    format!(
        "<html><head><title>Sparse attention</title></head><body><nav>menu</nav>\
         <article><h1>Sparse attention</h1>{}</article></body></html>",
        paragraph.repeat(4)
    )
}

fn feed_linking_to(server: &MockServer, article_path: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Lab Notes</title>
<item><title>Sparse attention</title><link>{}{}</link><guid>lab-1</guid>
<pubDate>{}</pubDate><description>Feed teaser only</description></item>
</channel></rss>"#,
        server.uri(),
        article_path,
        (Utc::now() - Duration::hours(1)).to_rfc2822()
    )
}

#[tokio::test]
async fn test_scraped_article_replaces_feed_content() {
    let server = MockServer::start().await;
    mount_feed(&server, "/lab.xml", feed_linking_to(&server, "/posts/sparse")).await;
    Mock::given(method("GET"))
        .and(path("/posts/sparse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(article_page()),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_gemini(&server, 200, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        scrape_full_text: true,
        ..config(dir.path(), &[format!("{}/lab.xml", server.uri())])
    };
    let courier = RecordingCourier::default();

    pipeline::run(&config, &llm(&server), &courier).await.unwrap();

    let html = &courier.deliveries()[0];
    assert!(html.contains("learned sparsity pattern"));
    assert!(!html.contains("Feed teaser only"));
}

#[tokio::test]
async fn test_failed_scrape_falls_back_to_feed_content() {
    let server = MockServer::start().await;
    mount_feed(&server, "/lab.xml", feed_linking_to(&server, "/posts/missing")).await;
    Mock::given(method("GET"))
        .and(path("/posts/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_gemini(&server, 200, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        scrape_full_text: true,
        ..config(dir.path(), &[format!("{}/lab.xml", server.uri())])
    };
    let courier = RecordingCourier::default();

    pipeline::run(&config, &llm(&server), &courier).await.unwrap();

    let html = &courier.deliveries()[0];
    assert!(html.contains("Feed teaser only"));
    assert!(!html.contains("learned sparsity pattern"));
}

#[tokio::test]
async fn test_out_of_range_retention_fails_before_delivery() {
    let server = MockServer::start().await;
    mount_gemini(&server, 200, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        state_retention_days: 1_000_000_000_000_000,
        ..config(dir.path(), &[format!("{}/lab.xml", server.uri())])
    };
    let courier = RecordingCourier::default();

    assert!(pipeline::run(&config, &llm(&server), &courier).await.is_err());
    assert!(courier.deliveries().is_empty());
    assert!(!dir.path().join("sent_items.json").exists());
}
