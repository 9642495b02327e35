use crate::rss::truncate_chars;

/// How much of an article is sent to the model.
pub const MAX_PROMPT_CONTENT_CHARS: usize = 3000;

/// Prompt asking for a short reader-oriented summary of one article.
pub fn summary_prompt(title: &str, content: &str) -> String {
    format!(
        r#"Analyze this AI/ML research article and provide a concise summary that captures:
1. The core innovation or finding
2. Why it matters (practical implications or theoretical significance)
3. Any notable limitations or caveats

Title: {title}

Content: {content}

Provide a clear, engaging summary in 3-4 sentences that would help a technical reader decide if they should read the full article."#,
        title = title,
        content = truncate_chars(content, MAX_PROMPT_CONTENT_CHARS)
    )
}
