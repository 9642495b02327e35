use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

use kindle_digest::config::{Config, LlmSettings};
use kindle_digest::logging;
use kindle_digest::mailer::{FileCourier, SmtpCourier};
use kindle_digest::pipeline::{self, RunReport};
use kindle_digest::LLMParams;

#[derive(Parser, Debug)]
#[clap(
    name = "kindle-digest",
    about = "Summarize new feed entries and deliver them to a Kindle as one digest"
)]
struct Cli {
    /// File listing one feed URL per line
    #[clap(long)]
    feeds: Option<PathBuf>,

    /// Sent-items ledger location
    #[clap(long, conflicts_with = "no_state")]
    state: Option<PathBuf>,

    /// Ignore the ledger: neither read nor update it
    #[clap(long)]
    no_state: bool,

    /// Only include entries published within this many hours
    #[clap(long)]
    lookback_hours: Option<i64>,

    /// Fetch each article page and extract its full text
    #[clap(long)]
    scrape: bool,

    /// Write the digest HTML here instead of emailing it
    #[clap(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(feeds) = &self.feeds {
            config.feeds_path = feeds.clone();
        }
        if let Some(state) = &self.state {
            config.state_path = Some(state.clone());
        }
        if self.no_state {
            config.state_path = None;
        }
        if let Some(hours) = self.lookback_hours {
            config.lookback_hours = hours;
        }
        if self.scrape {
            config.scrape_full_text = true;
        }
        if self.output.is_some() {
            config.tolerate_summary_errors = true;
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;

    let llm = LLMParams::from_settings(&LlmSettings::from_env()?)?;
    info!(
        "Using model {} (feeds: {}, lookback: {}h)",
        llm.model,
        config.feeds_path.display(),
        config.lookback_hours
    );

    match &cli.output {
        Some(path) => pipeline::run(&config, &llm, &FileCourier::new(path)).await,
        None => pipeline::run(&config, &llm, &SmtpCourier::from_env()?).await,
    }
}

#[tokio::main]
async fn main() {
    logging::configure_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            if !report.feeds_failed.is_empty() {
                info!(
                    "{} of {} feeds could not be read",
                    report.feeds_failed.len(),
                    report.feeds_listed
                );
            }
            if report.delivered {
                println!("Sent {} articles", report.articles);
            } else {
                println!("No new articles");
            }
        }
        Err(err) => {
            error!("Run failed: {:#}", err);
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    }
}
