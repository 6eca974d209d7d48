//! SMTP Delivery
//!
//! [`SmtpNotifier`] sends each notification as an HTML email to a single
//! recipient, copied on `Cc`, through a plain-SMTP relay.

use crate::error::DeliveryError;
use crate::Notifier;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Default SMTP relay port
const DEFAULT_SMTP_PORT: u16 = 25;

/// Default timeout for one SMTP exchange
const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// SMTP notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname
    pub host: String,
    pub port: u16,
    /// Sender address
    pub from: String,
    /// Recipient, also placed on `Cc`
    pub to: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Timeout for one delivery
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Relay on the default port with no credentials
    pub fn relay(host: &str, from: &str, to: &str) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_SMTP_PORT,
            from: from.to_string(),
            to: to.to_string(),
            username: None,
            password: None,
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }
}

/// Sends notifications as HTML emails
pub struct SmtpNotifier {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Build a notifier, validating both addresses up front
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let from: Mailbox = config.from.parse()?;
        let to: Mailbox = config.to.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(config.timeout));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        info!(host = %config.host, port = config.port, to = %config.to, "SMTP notifier ready");

        Ok(Self {
            from,
            to,
            transport: builder.build(),
        })
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .cc(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(subject, body)?;
        self.transport.send(message).await?;

        info!("mailed: '{}' to {}", subject, self.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_defaults() {
        let config = SmtpConfig::relay("mail.local", "faultmon@example.com", "ops@example.com");
        assert_eq!(config.port, 25);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.username.is_none());
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let config = SmtpConfig::relay("mail.local", "faultmon@example.com", "not-an-email");
        let err = SmtpNotifier::new(&config).err().unwrap();
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn test_message_is_html_with_cc() {
        let config = SmtpConfig::relay("mail.local", "faultmon@example.com", "ops@example.com");
        let notifier = SmtpNotifier::new(&config).unwrap();
        let message = notifier
            .build_message("UCS - threshold-crossed - Raised: 1 - sys", "<h3>hi</h3>")
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Cc: ops@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
        assert!(raw.contains("Subject: UCS - threshold-crossed - Raised: 1 - sys"));
    }
}
