//! Delivery Error Types

use thiserror::Error;

/// Errors raised while delivering a notification
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// SMTP transport-level failure (connection, authentication, timeout)
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// Sender or recipient address could not be parsed
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),

    /// Delivery refused by the notifier
    #[error("Notification rejected: {0}")]
    Rejected(String),
}
