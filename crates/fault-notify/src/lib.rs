//! Notification Delivery
//!
//! Formats fault transitions into messages and hands them to a
//! [`Notifier`]. Nothing here decides whether to notify; that is the
//! dedup engine's job.

mod dispatcher;
mod error;
mod smtp;

pub use dispatcher::{MessageFormat, NotificationDispatcher};
pub use error::DeliveryError;
pub use smtp::{SmtpConfig, SmtpNotifier};

use async_trait::async_trait;
use tracing::info;

/// Delivers a formatted notification somewhere
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Notifier that writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        info!(body_len = body.len(), "notification: '{}'", subject);
        Ok(())
    }
}
