//! Digest content generator.
//!
//! Builds the Kindle-friendly HTML document from summarized feed entries.

use chrono::{DateTime, Local};
use sha2::{Digest as _, Sha256};
use std::fmt::Write;

/// One summarized entry ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestArticle {
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    pub summary: String,
    /// Article body as HTML, embedded verbatim.
    pub content: String,
}

/// All articles from one feed, keyed by the feed's title.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSection {
    pub feed_title: String,
    pub feed_url: String,
    pub articles: Vec<DigestArticle>,
}

#[derive(Debug, Clone)]
pub struct Digest {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub sections: Vec<FeedSection>,
}

impl Digest {
    pub fn new(title: impl Into<String>, generated_at: DateTime<Local>) -> Self {
        Self {
            title: title.into(),
            generated_at,
            sections: Vec::new(),
        }
    }

    /// Adds a section; feeds without articles are left out of the digest.
    pub fn push_section(&mut self, section: FeedSection) {
        if !section.articles.is_empty() {
            self.sections.push(section);
        }
    }

    pub fn article_count(&self) -> usize {
        self.sections.iter().map(|s| s.articles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.article_count() == 0
    }

    pub fn articles(&self) -> impl Iterator<Item = &DigestArticle> {
        self.sections.iter().flat_map(|s| s.articles.iter())
    }

    pub fn subject(&self) -> String {
        format!("{} - {}", self.title, self.generated_at.format("%Y-%m-%d"))
    }

    pub fn attachment_name(&self) -> String {
        format!("digest_{}.html", self.generated_at.format("%Y%m%d"))
    }

    /// Short plain-text body accompanying the attachment.
    pub fn render_text(&self) -> String {
        let mut text = format!(
            "{}\n\n{} new articles from {} feeds.\n\n",
            self.subject(),
            self.article_count(),
            self.sections.len()
        );
        for section in &self.sections {
            let _ = writeln!(text, "{}", section.feed_title);
            for article in &section.articles {
                let _ = writeln!(text, "  - {}", article.title);
            }
        }
        text
    }

    pub fn render_html(&self) -> String {
        let date_str = self.generated_at.format("%Y-%m-%d");
        let long_date = self.generated_at.format("%B %d, %Y");

        let mut toc = String::from("<h2>Table of Contents</h2>\n");
        for section in &self.sections {
            let _ = write!(
                toc,
                "<h3>{}</h3>\n<ol>\n",
                html_escape(&section.feed_title)
            );
            for article in &section.articles {
                let _ = writeln!(
                    toc,
                    r##"<li><a href="#{anchor}">{title}</a></li>"##,
                    anchor = anchor_id(&article.id),
                    title = html_escape(&article.title),
                );
            }
            toc.push_str("</ol>\n");
        }

        let mut body = String::new();
        for section in &self.sections {
            for article in &section.articles {
                let link_html = match &article.link {
                    Some(link) => format!(
                        r#"<p><a href="{}">View online</a></p>"#,
                        html_escape(link)
                    ),
                    None => String::new(),
                };
                let _ = write!(
                    body,
                    r#"
<mbp:pagebreak/>
<div id="{anchor}">
<h2>{title}</h2>
<p><strong>Source:</strong> {source}</p>
<div class="summary">
<p><strong>AI Summary:</strong> {summary}</p>
</div>
{link_html}
<div class="full-text">
<h3>Full Article</h3>
{content}
</div>
</div>
"#,
                    anchor = anchor_id(&article.id),
                    title = html_escape(&article.title),
                    source = html_escape(&section.feed_title),
                    summary = html_escape(&article.summary),
                    link_html = link_html,
                    content = article.content,
                );
            }
        }

        format!(
            r#"<html><head><meta charset="utf-8"><title>{title} - {date_str}</title>
<style>
body {{ font-family: serif; line-height: 1.6; margin: 20px; }}
.summary {{ background: #f5f5f5; padding: 10px; margin: 10px 0; border-left: 3px solid #333; }}
.full-text {{ margin-top: 15px; }}
a {{ color: #0066cc; }}
</style>
</head><body>
<h1>{title}</h1>
<p><em>{long_date}</em></p>
{toc}{body}</body></html>"#,
            title = html_escape(&self.title),
            date_str = date_str,
            long_date = long_date,
            toc = toc,
            body = body,
        )
    }
}

/// Stable HTML anchor for an entry id.
pub fn anchor_id(entry_id: &str) -> String {
    let hash = format!("{:x}", Sha256::digest(entry_id.as_bytes()));
    format!("article-{}", &hash[..12])
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
