use colored::Colorize;
use std::env;
use std::process;

use kindle_digest::logging;
use kindle_digest::rss::{self, create_http_client};

const MAX_ENTRIES_SHOWN: usize = 5;

#[tokio::main]
async fn main() {
    logging::configure_logging();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("check_feed");
    match args.get(1).map(String::as_str) {
        Some("--help") | Some("-h") => {
            print_usage(program);
            return;
        }
        None => {
            print_usage(program);
            process::exit(1);
        }
        Some(_) => {}
    }
    let url = &args[1];

    if !rss::is_valid_url(url) {
        eprintln!("{}: {}", "Invalid URL".bright_red(), url);
        process::exit(1);
    }

    let client = match create_http_client() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to create HTTP client: {:#}", err);
            process::exit(1);
        }
    };

    println!("\n{}", "═".repeat(100).bright_blue());
    println!("{}  {}", "FEED DIAGNOSTICS".bright_blue(), url.bright_yellow());
    println!("{}", "═".repeat(100).bright_blue());

    let fetched = match rss::fetch_feed(&client, url).await {
        Ok(fetched) => fetched,
        Err(err) => {
            println!("{}: {}", "Status".bright_blue(), "RequestFailed".bright_red());
            eprintln!("{}", format!("{:#}", err).bright_red());
            process::exit(1);
        }
    };

    match &fetched.content_type {
        Some(content_type) => println!("{}: {}", "Content-Type".bright_blue(), content_type),
        None => println!("{}: {}", "Content-Type".bright_blue(), "None".dimmed()),
    }
    println!(
        "{}: {}",
        "Browser Emulation".bright_blue(),
        if fetched.browser_emulation_used { "required".bright_yellow() } else { "not needed".dimmed() }
    );

    let feed = match rss::parse_feed(&fetched.body, url) {
        Ok(feed) => feed,
        Err(err) => {
            println!("{}: {}", "Status".bright_blue(), "ParseFailed".bright_red());
            println!("\n{}", "Decoded Content Preview".bright_blue());
            println!("{}", "─".repeat(80).dimmed());
            println!("{}", rss::truncate_chars(&fetched.body, 500));
            eprintln!("\n{}", format!("{:#}", err).bright_red());
            process::exit(1);
        }
    };

    println!("{}: {}", "Status".bright_blue(), "Success".bright_green());
    println!("{}: {}", "Feed Title".bright_blue(), feed.title);
    if feed.cleaned_up {
        println!("{}: {}", "Warning".bright_yellow(), "feed needed XML cleanup before parsing");
    }
    println!("{}: {}", "Entries Found".bright_blue(), feed.entries.len());

    if !feed.entries.is_empty() {
        println!("\n{}", "Feed Entries".bright_green());
        println!("{}", "─".repeat(80).dimmed());
        for (i, entry) in feed.entries.iter().take(MAX_ENTRIES_SHOWN).enumerate() {
            let published = entry
                .published
                .map(|date| date.to_rfc3339())
                .unwrap_or_else(|| "[No Date]".to_string());
            println!(
                "{}. {} ({})\n   {}",
                i + 1,
                entry.title.bright_white(),
                published.dimmed(),
                entry.link.as_deref().unwrap_or("[No URL]").bright_cyan()
            );
        }
        if feed.entries.len() > MAX_ENTRIES_SHOWN {
            println!("... and {} more entries", feed.entries.len() - MAX_ENTRIES_SHOWN);
        }
    }

    println!("\n{}", "═".repeat(100).bright_blue());
    println!("Feed check completed with {} entries found", feed.entries.len());
}

fn print_usage(program_name: &str) {
    println!("Usage: {} <feed_url>", program_name);
    println!("\nFetches and parses one feed, exiting non-zero if it cannot be read.");
    println!("\nExamples:");
    println!("  {} https://www.example.com/feed", program_name);
}
