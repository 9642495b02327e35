//! Runtime configuration, assembled from environment variables and CLI overrides.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::path::PathBuf;
use std::str::FromStr;

use crate::environment::{get_env_flag, get_env_var, get_env_var_or, parse_env_var, require_env_var};

pub const DEFAULT_FEEDS_FILE: &str = "feeds.txt";
pub const DEFAULT_SENT_ITEMS_FILE: &str = "sent_items.json";
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;
pub const DEFAULT_STATE_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_DIGEST_TITLE: &str = "AI Research Digest";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Which hosted model API produces the summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAI,
    Ollama,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => DEFAULT_GEMINI_MODEL,
            LlmProvider::OpenAI => DEFAULT_OPENAI_MODEL,
            LlmProvider::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openai" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            other => bail!("Unknown LLM provider {:?} (expected gemini, openai or ollama)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub temperature: f32,
    /// API key for Gemini or OpenAI; unused by Ollama.
    pub api_key: Option<String>,
    /// Overrides the provider's endpoint (Gemini base URL, OpenAI API base, Ollama host).
    pub base_url: Option<String>,
    pub ollama_port: u16,
}

impl LlmSettings {
    pub fn from_env() -> Result<Self> {
        let provider: LlmProvider = get_env_var_or("LLM_PROVIDER", "gemini").parse()?;
        let model = get_env_var("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let temperature = parse_env_var("LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?;

        let (api_key, base_url) = match provider {
            LlmProvider::Gemini => (
                Some(require_env_var("GEMINI_API_KEY")?),
                get_env_var("GEMINI_BASE_URL"),
            ),
            LlmProvider::OpenAI => (
                Some(require_env_var("OPENAI_API_KEY")?),
                get_env_var("OPENAI_BASE_URL"),
            ),
            LlmProvider::Ollama => (None, get_env_var("OLLAMA_HOST")),
        };

        Ok(Self {
            provider,
            model,
            temperature,
            api_key,
            base_url,
            ollama_port: parse_env_var("OLLAMA_PORT", DEFAULT_OLLAMA_PORT)?,
        })
    }
}

/// SMTP relay and addressing for Kindle delivery.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    pub starttls: bool,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("starttls", &self.starttls)
            .finish()
    }
}

impl SmtpSettings {
    /// # Required Environment Variables
    /// - `SMTP_HOST`, `SMTP_USER`, `SMTP_PASSWORD`, `KINDLE_EMAIL`
    ///
    /// # Optional Environment Variables
    /// - `SMTP_PORT` (default: 587)
    /// - `SMTP_FROM` (default: `SMTP_USER`)
    /// - `SMTP_STARTTLS` (default: true)
    pub fn from_env() -> Result<Self> {
        let username = require_env_var("SMTP_USER")?;
        Ok(Self {
            host: require_env_var("SMTP_HOST")?,
            port: parse_env_var("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            password: require_env_var("SMTP_PASSWORD")?,
            from: get_env_var("SMTP_FROM").unwrap_or_else(|| username.clone()),
            username,
            to: require_env_var("KINDLE_EMAIL")?,
            starttls: get_env_flag("SMTP_STARTTLS", true)?,
        })
    }
}

/// Everything one run of the pipeline needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    pub feeds_path: PathBuf,
    /// `None` disables the sent-items ledger entirely.
    pub state_path: Option<PathBuf>,
    pub lookback_hours: i64,
    pub state_retention_days: i64,
    pub digest_title: String,
    pub scrape_full_text: bool,
    /// Replace failed summaries with a placeholder instead of failing the run.
    pub tolerate_summary_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds_path: PathBuf::from(DEFAULT_FEEDS_FILE),
            state_path: Some(PathBuf::from(DEFAULT_SENT_ITEMS_FILE)),
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            state_retention_days: DEFAULT_STATE_RETENTION_DAYS,
            digest_title: DEFAULT_DIGEST_TITLE.to_string(),
            scrape_full_text: false,
            tolerate_summary_errors: false,
        }
    }
}

impl Config {
    /// Reads the environment only; callers validate once CLI overrides are applied.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            feeds_path: PathBuf::from(get_env_var_or("FEEDS_FILE", DEFAULT_FEEDS_FILE)),
            state_path: Some(PathBuf::from(get_env_var_or(
                "SENT_ITEMS_FILE",
                DEFAULT_SENT_ITEMS_FILE,
            ))),
            lookback_hours: parse_env_var("LOOKBACK_HOURS", DEFAULT_LOOKBACK_HOURS)?,
            state_retention_days: parse_env_var(
                "STATE_RETENTION_DAYS",
                DEFAULT_STATE_RETENTION_DAYS,
            )?,
            digest_title: get_env_var_or("DIGEST_TITLE", DEFAULT_DIGEST_TITLE),
            scrape_full_text: get_env_flag("SCRAPE_FULL_TEXT", false)?,
            tolerate_summary_errors: false,
        })
    }

    /// The recency window as a duration.
    pub fn lookback(&self) -> Result<TimeDelta> {
        if self.lookback_hours <= 0 {
            bail!("lookback window must be positive, got {} hours", self.lookback_hours);
        }
        TimeDelta::try_hours(self.lookback_hours).with_context(|| {
            format!("lookback window of {} hours is out of range", self.lookback_hours)
        })
    }

    /// How long delivered ids stay in the ledger.
    pub fn retention(&self) -> Result<TimeDelta> {
        if self.state_retention_days <= 0 {
            bail!("state retention must be positive, got {} days", self.state_retention_days);
        }
        TimeDelta::try_days(self.state_retention_days).with_context(|| {
            format!("state retention of {} days is out of range", self.state_retention_days)
        })
    }

    /// Oldest publication time still inside the recency window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(self.lookback()?).with_context(|| {
            format!(
                "lookback window of {} hours reaches before the supported date range",
                self.lookback_hours
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        let lookback = self.lookback()?;
        let retention = self.retention()?;
        // A ledger that forgets entries still inside the window would resend them.
        if retention < lookback {
            bail!(
                "state retention ({} days) must cover the lookback window ({} hours)",
                self.state_retention_days,
                self.lookback_hours
            );
        }
        let now = Utc::now();
        self.cutoff(now)?;
        if now.checked_sub_signed(retention).is_none() {
            bail!(
                "state retention of {} days reaches before the supported date range",
                self.state_retention_days
            );
        }
        Ok(())
    }
}
