//! File-Backed Fault Source
//!
//! Serves fault snapshots from a JSON file holding an array of raw records.
//! The file is re-read on every query, so editing it between cycles
//! simulates faults raising and clearing.

use crate::error::SourceError;
use crate::record::RawRecord;
use crate::source::{FaultSource, QueryFilter, SessionHandle};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Fault source reading snapshots from a JSON file
pub struct ReplayFaultSource {
    path: PathBuf,
    name: String,
    next_session: AtomicU64,
}

impl ReplayFaultSource {
    /// Create a source over `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Creating replay fault source for {}", path.display());
        Self {
            name: format!("replay:{}", path.display()),
            path,
            next_session: AtomicU64::new(1),
        }
    }

    /// File the snapshots are read from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FaultSource for ReplayFaultSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self) -> Result<SessionHandle, SourceError> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            SourceError::Connection(format!("{}: {}", self.path.display(), e))
        })?;

        if metadata.is_dir() {
            return Err(SourceError::Configuration(format!(
                "{} is a directory",
                self.path.display()
            )));
        }

        let n = self.next_session.fetch_add(1, Ordering::Relaxed);
        Ok(SessionHandle::new(format!("replay-{}", n)))
    }

    async fn query(
        &self,
        session: &SessionHandle,
        filter: &QueryFilter,
    ) -> Result<Vec<RawRecord>, SourceError> {
        debug!(session = session.token(), "Reading {}", self.path.display());

        let contents = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<RawRecord> = serde_json::from_str(&contents).map_err(|e| {
            SourceError::Connection(format!("{}: malformed snapshot: {}", self.path.display(), e))
        })?;

        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }

    async fn close(&self, session: SessionHandle) {
        debug!(session = session.token(), "Replay session closed");
    }
}
