//! Scripted Fault Source
//!
//! Replays a fixed script of query outcomes without any remote system.
//! Used by tests and dry runs.

use crate::error::SourceError;
use crate::record::RawRecord;
use crate::source::{FaultSource, QueryFilter, SessionHandle};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Fault source driven by a script of query outcomes
pub struct MockFaultSource {
    /// Remaining query outcomes, consumed front to back
    script: Mutex<VecDeque<Result<Vec<RawRecord>, SourceError>>>,
    /// Authentication attempts that should still fail
    auth_failures: AtomicUsize,
    authenticated: AtomicUsize,
    queried: AtomicUsize,
    closed: AtomicUsize,
}

impl MockFaultSource {
    /// Create a source with an empty script
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            auth_failures: AtomicUsize::new(0),
            authenticated: AtomicUsize::new(0),
            queried: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    /// Queue a successful snapshot
    pub fn push_snapshot(&self, snapshot: Vec<RawRecord>) -> &Self {
        self.script().push_back(Ok(snapshot));
        self
    }

    /// Queue a failing query
    pub fn push_error(&self, error: SourceError) -> &Self {
        self.script().push_back(Err(error));
        self
    }

    /// Make the next `count` authentication attempts fail
    pub fn fail_next_auth(&self, count: usize) {
        self.auth_failures.store(count, Ordering::SeqCst);
    }

    /// Successful authentications so far
    pub fn auth_count(&self) -> usize {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Queries served so far, failed ones included
    pub fn query_count(&self) -> usize {
        self.queried.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Outcomes not yet consumed
    pub fn remaining(&self) -> usize {
        self.script().len()
    }

    fn script(&self) -> MutexGuard<'_, VecDeque<Result<Vec<RawRecord>, SourceError>>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockFaultSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaultSource for MockFaultSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self) -> Result<SessionHandle, SourceError> {
        let pending = self.auth_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.auth_failures.store(pending - 1, Ordering::SeqCst);
            return Err(SourceError::Auth("mock credentials rejected".to_string()));
        }

        let n = self.authenticated.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Mock session {} established", n);
        Ok(SessionHandle::new(format!("mock-{}", n)))
    }

    async fn query(
        &self,
        session: &SessionHandle,
        filter: &QueryFilter,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.queried.fetch_add(1, Ordering::SeqCst);
        debug!(
            session = session.token(),
            filter = %filter.filter_string(),
            "Mock query"
        );

        let next = self.script().pop_front();
        // An exhausted script reports no faults
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn close(&self, session: SessionHandle) {
        debug!(session = session.token(), "Mock session closed");
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_is_consumed_in_order() {
        let source = MockFaultSource::new();
        source
            .push_snapshot(vec![RawRecord::new().with("id", "1")])
            .push_error(SourceError::Connection("reset".into()));

        let session = source.authenticate().await.unwrap();
        let filter = QueryFilter::default();

        assert_eq!(source.query(&session, &filter).await.unwrap().len(), 1);
        assert!(source.query(&session, &filter).await.is_err());
        assert!(source.query(&session, &filter).await.unwrap().is_empty());
        assert_eq!(source.query_count(), 3);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_auth_failures_are_injected() {
        let source = MockFaultSource::new();
        source.fail_next_auth(2);

        assert!(matches!(source.authenticate().await, Err(SourceError::Auth(_))));
        assert!(matches!(source.authenticate().await, Err(SourceError::Auth(_))));
        let session = source.authenticate().await.unwrap();
        assert_eq!(session.token(), "mock-1");
        assert_eq!(source.auth_count(), 1);
    }

    #[tokio::test]
    async fn test_close_is_counted() {
        let source = MockFaultSource::new();
        let session = source.authenticate().await.unwrap();
        source.close(session).await;
        assert_eq!(source.close_count(), 1);
    }
}
