//! Fault Source Error Types

use thiserror::Error;

/// Errors raised by a [`FaultSource`](crate::FaultSource) while
/// authenticating or querying
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Credentials or session rejected by the remote system
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure talking to the remote system
    #[error("Connection error: {0}")]
    Connection(String),

    /// The source is misconfigured and can never succeed
    #[error("Source misconfigured: {0}")]
    Configuration(String),
}

impl SourceError {
    /// Whether the poll loop may retry after this error.
    ///
    /// Auth and connection failures are retried on the next cycle with a
    /// fresh session. Configuration errors are fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SourceError::Configuration(_))
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Connection(err.to_string())
    }
}

/// Errors raised while decoding a single raw record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Required attribute absent from the raw record
    #[error("Missing required attribute: {0}")]
    MissingAttribute(&'static str),

    /// Attribute present but blank
    #[error("Attribute {0} is empty")]
    EmptyAttribute(&'static str),

    /// Severity value not known to this decoder
    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),
}
