//! Delivering a finished digest, either by email to a Kindle address or to a local file.

use anyhow::{Context, Result};
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::config::SmtpSettings;
use crate::digest::Digest;
use crate::TARGET_MAIL;

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Somewhere a digest can be sent. Called at most once per run.
#[allow(async_fn_in_trait)]
pub trait Courier {
    async fn deliver(&self, digest: &Digest) -> Result<()>;
}

/// Sends the digest as an HTML attachment over SMTP.
pub struct SmtpCourier {
    settings: SmtpSettings,
}

impl SmtpCourier {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(SmtpSettings::from_env()?))
    }

    /// Build the message without sending it.
    pub fn build_message(&self, digest: &Digest) -> Result<Message> {
        let from: Mailbox = self
            .settings
            .from
            .parse()
            .context("Invalid sender email address")?;
        let to: Mailbox = self
            .settings
            .to
            .parse()
            .context("Invalid Kindle email address")?;

        let attachment = Attachment::new(digest.attachment_name())
            .body(digest.render_html(), ContentType::TEXT_HTML);

        Message::builder()
            .from(from)
            .to(to)
            .subject(digest.subject())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(digest.render_text()))
                    .singlepart(attachment),
            )
            .context("Failed to build email message")
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );

        let builder = if self.settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)
                .context("Failed to create SMTP transport")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.settings.host)
        };

        Ok(builder
            .port(self.settings.port)
            .credentials(creds)
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }
}

impl Courier for SmtpCourier {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        let email = self.build_message(digest)?;
        let mailer = self.transport()?;

        mailer
            .send(email)
            .await
            .context("Failed to send email via SMTP")?;

        info!(
            target: TARGET_MAIL,
            to = %self.settings.to,
            subject = %digest.subject(),
            articles = digest.article_count(),
            "Digest sent"
        );
        Ok(())
    }
}

/// Writes the rendered digest to disk, for previewing a run locally.
pub struct FileCourier {
    path: PathBuf,
}

impl FileCourier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Courier for FileCourier {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, digest.render_html())
            .with_context(|| format!("Failed to write digest to {}", self.path.display()))?;
        info!(target: TARGET_MAIL, "Digest saved to {}", self.path.display());
        Ok(())
    }
}
