//! Fault Source Session Management

use fault_source::{FaultSource, QueryFilter, RawRecord, SessionHandle, SourceError};
use tracing::{debug, info, warn};

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session established yet, or closed
    Absent,
    /// Session established and believed healthy
    Active,
    /// Session observed to fail; the next use re-authenticates
    Failed,
}

enum Session {
    Absent,
    Active(SessionHandle),
    Failed(SessionHandle),
}

/// Owns the single session with a fault source.
///
/// Sessions are established lazily and replaced after a failure is
/// reported through [`invalidate`](Self::invalidate).
pub struct SessionManager<S: FaultSource> {
    source: S,
    session: Session,
}

impl<S: FaultSource> SessionManager<S> {
    /// Create a manager with no session
    pub fn new(source: S) -> Self {
        Self {
            source,
            session: Session::Absent,
        }
    }

    /// Return the live session, authenticating first if there is none.
    ///
    /// A failed session is closed (best-effort) before a new one is
    /// established. On authentication failure the manager stays without a
    /// live session, so the next call tries again.
    pub async fn ensure_session(&mut self) -> Result<&SessionHandle, SourceError> {
        match std::mem::replace(&mut self.session, Session::Absent) {
            Session::Active(handle) => self.session = Session::Active(handle),
            Session::Failed(stale) => {
                debug!(session = stale.token(), "Discarding failed session");
                self.source.close(stale).await;
                self.authenticate().await?;
            }
            Session::Absent => self.authenticate().await?,
        }

        match &self.session {
            Session::Active(handle) => Ok(handle),
            // authenticate() only returns Ok after storing an active session
            _ => Err(SourceError::Auth("session not established".to_string())),
        }
    }

    async fn authenticate(&mut self) -> Result<(), SourceError> {
        let handle = self.source.authenticate().await?;
        info!("new session for {}", self.source.name());
        self.session = Session::Active(handle);
        Ok(())
    }

    /// Query the source through the live session
    pub async fn query(&mut self, filter: &QueryFilter) -> Result<Vec<RawRecord>, SourceError> {
        self.ensure_session().await?;
        match &self.session {
            Session::Active(handle) => self.source.query(handle, filter).await,
            _ => Err(SourceError::Auth("session not established".to_string())),
        }
    }

    /// Mark the current session as failed so the next use re-authenticates
    pub fn invalidate(&mut self) {
        self.session = match std::mem::replace(&mut self.session, Session::Absent) {
            Session::Active(handle) | Session::Failed(handle) => {
                warn!(
                    session = handle.token(),
                    established_at = %handle.established_at(),
                    "Session invalidated"
                );
                Session::Failed(handle)
            }
            Session::Absent => Session::Absent,
        };
    }

    /// Release the session, if any. A no-op when there is none.
    pub async fn close(&mut self) {
        match std::mem::replace(&mut self.session, Session::Absent) {
            Session::Active(handle) | Session::Failed(handle) => {
                info!(
                    established_at = %handle.established_at(),
                    "Closing session with {}",
                    self.source.name()
                );
                self.source.close(handle).await;
            }
            Session::Absent => debug!("No session to close"),
        }
    }

    /// Current session state
    pub fn status(&self) -> SessionStatus {
        match self.session {
            Session::Absent => SessionStatus::Absent,
            Session::Active(_) => SessionStatus::Active,
            Session::Failed(_) => SessionStatus::Failed,
        }
    }

    /// The managed source
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fault_source::MockFaultSource;

    #[tokio::test]
    async fn test_lazy_and_idempotent() {
        let mut manager = SessionManager::new(MockFaultSource::new());
        assert_eq!(manager.status(), SessionStatus::Absent);
        assert_eq!(manager.source().auth_count(), 0);

        manager.ensure_session().await.unwrap();
        manager.ensure_session().await.unwrap();
        assert_eq!(manager.status(), SessionStatus::Active);
        assert_eq!(manager.source().auth_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reauth() {
        let mut manager = SessionManager::new(MockFaultSource::new());
        let first = manager.ensure_session().await.unwrap().token().to_string();

        manager.invalidate();
        assert_eq!(manager.status(), SessionStatus::Failed);

        let second = manager.ensure_session().await.unwrap().token().to_string();
        assert_ne!(first, second);
        assert_eq!(manager.source().auth_count(), 2);
        // The stale session was released
        assert_eq!(manager.source().close_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_is_retryable() {
        let source = MockFaultSource::new();
        source.fail_next_auth(1);
        let mut manager = SessionManager::new(source);

        assert!(matches!(
            manager.ensure_session().await,
            Err(SourceError::Auth(_))
        ));
        assert_eq!(manager.status(), SessionStatus::Absent);

        manager.ensure_session().await.unwrap();
        assert_eq!(manager.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_close_without_session_is_noop() {
        let mut manager = SessionManager::new(MockFaultSource::new());
        manager.close().await;
        assert_eq!(manager.source().close_count(), 0);
        assert_eq!(manager.status(), SessionStatus::Absent);
    }

    #[tokio::test]
    async fn test_close_releases_failed_session() {
        let mut manager = SessionManager::new(MockFaultSource::new());
        manager.ensure_session().await.unwrap();
        manager.invalidate();
        manager.close().await;
        assert_eq!(manager.source().close_count(), 1);
        assert_eq!(manager.status(), SessionStatus::Absent);
    }

    #[tokio::test]
    async fn test_query_establishes_session() {
        let source = MockFaultSource::new();
        source.push_snapshot(vec![fault_source::RawRecord::new().with("id", "1")]);
        let mut manager = SessionManager::new(source);

        let records = manager.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(manager.status(), SessionStatus::Active);
    }
}
