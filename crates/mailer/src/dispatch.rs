//! Digest dispatch
//!
//! SMTP through lettre on the tokio executor, or stdout for dry runs.

use crate::render::Digest;
use arxiv_digest_common::config::SmtpConfig;
use arxiv_digest_common::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use validator::Validate;

/// Display name on outgoing digests
const SENDER_NAME: &str = "arXiv Digest";
const RECEIVER_NAME: &str = "You";

/// Delivers a rendered digest
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, digest: &Digest) -> Result<()>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

fn dispatch_error(message: impl ToString) -> AppError {
    AppError::Dispatch {
        message: message.to_string(),
    }
}

fn mailbox(name: &str, address: &str, field: &str) -> Result<Mailbox> {
    let address: Address = address.parse().map_err(|e| AppError::Validation {
        message: format!("{} is not a valid address: {}", field, e),
        field: Some(field.to_string()),
    })?;
    Ok(Mailbox::new(Some(name.to_string()), address))
}

/// SMTP dispatcher
///
/// Port 465 connects with implicit TLS, every other port upgrades with
/// STARTTLS. One attempt per digest.
pub struct SmtpDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    server: String,
}

impl SmtpDispatcher {
    /// Validate the settings and build the transport (no connection yet)
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        config.validate()?;

        let from = mailbox(SENDER_NAME, &config.sender, "sender")?;
        let to = mailbox(RECEIVER_NAME, &config.receiver, "receiver")?;

        let builder = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
        }
        .map_err(|e| AppError::Configuration {
            message: format!("Invalid SMTP server {}: {}", config.server, e),
        })?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.sender.clone(), config.password.clone()))
            .timeout(Some(config.timeout()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
            server: format!("{}:{}", config.server, config.port),
        })
    }

    fn message(&self, digest: &Digest) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(digest.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                digest.text.clone(),
                digest.html.clone(),
            ))
            .map_err(dispatch_error)
    }
}

#[async_trait]
impl Dispatcher for SmtpDispatcher {
    #[instrument(skip_all, fields(server = %self.server, entries = digest.entry_count))]
    async fn send(&self, digest: &Digest) -> Result<()> {
        let message = self.message(digest)?;

        let response = self.transport.send(message).await.map_err(dispatch_error)?;

        info!(
            code = %response.code(),
            to = %self.to.email,
            "Digest sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Writes the HTML digest to stdout instead of sending it
#[derive(Debug, Default)]
pub struct StdoutDispatcher;

#[async_trait]
impl Dispatcher for StdoutDispatcher {
    async fn send(&self, digest: &Digest) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(digest.html.as_bytes()).await?;
        stdout.flush().await?;
        info!(
            subject = %digest.subject,
            entries = digest.entry_count,
            "Dry run, digest written to stdout"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_digest;
    use chrono::NaiveDate;
    use tokio_test::assert_ok;

    fn config(port: u16) -> SmtpConfig {
        SmtpConfig {
            port,
            sender: "me@example.com".into(),
            receiver: "you@example.com".into(),
            password: "app-password".into(),
            ..Default::default()
        }
    }

    fn digest() -> Digest {
        render_digest(&[], NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(), 600)
    }

    #[test]
    fn test_invalid_config_is_rejected_before_connecting() {
        let mut smtp = config(587);
        smtp.password.clear();
        let err = SmtpDispatcher::new(&smtp).err().unwrap();
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_builds_for_both_tls_modes() {
        assert_ok!(SmtpDispatcher::new(&config(587)));
        assert_ok!(SmtpDispatcher::new(&config(465)));
    }

    #[tokio::test]
    async fn test_message_headers() {
        let dispatcher = SmtpDispatcher::new(&config(587)).unwrap();
        let message = dispatcher.message(&digest()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("arXiv Digest"));
        assert!(raw.contains("<me@example.com>"));
        assert!(raw.contains("<you@example.com>"));
        assert!(raw.contains("Subject: Daily arXiv 2025/03/14"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_stdout_dispatcher() {
        let dispatcher = StdoutDispatcher;
        assert_ok!(dispatcher.send(&digest()).await);
        assert_eq!(dispatcher.name(), "stdout");
    }
}
