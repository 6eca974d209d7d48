//! Fault Source Capability
//!
//! The remote wire protocol lives behind [`FaultSource`]; the poll loop only
//! sees sessions, filters, and raw records.

use crate::cause::THRESHOLD_CROSSED;
use crate::error::SourceError;
use crate::record::RawRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session with a fault source.
///
/// Opaque to callers. The token is whatever the source needs to recognise
/// the session again (cookie, ticket, handle number).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    token: String,
    established_at: DateTime<Utc>,
}

impl SessionHandle {
    /// Create a handle for a freshly established session
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            established_at: Utc::now(),
        }
    }

    /// Source-specific session token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// When the session was established
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

/// Constrains a query to faults with a given cause.
///
/// Severity is deliberately not filtered so that both active and cleared
/// records come back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Cause the fault must carry
    pub cause: String,
}

impl QueryFilter {
    /// Filter on an arbitrary cause
    pub fn cause(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    /// Filter expression in the management system's query syntax
    pub fn filter_string(&self) -> String {
        format!("(cause, '{}', type='eq')", self.cause)
    }

    /// Apply the filter to a record locally
    pub fn matches(&self, raw: &RawRecord) -> bool {
        raw.attr("cause") == Some(self.cause.as_str())
    }
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::cause(THRESHOLD_CROSSED)
    }
}

/// A remote system that reports fault instances
#[async_trait]
pub trait FaultSource: Send + Sync {
    /// Human-readable name of the endpoint, for logs
    fn name(&self) -> &str;

    /// Establish a new session
    async fn authenticate(&self) -> Result<SessionHandle, SourceError>;

    /// Return every fault instance matching `filter`
    async fn query(
        &self,
        session: &SessionHandle,
        filter: &QueryFilter,
    ) -> Result<Vec<RawRecord>, SourceError>;

    /// Release a session. Best-effort: failures are logged by the
    /// implementation and never surfaced.
    async fn close(&self, session: SessionHandle);
}
