//! Fault Poll Loop

use crate::session::SessionManager;
use alerting::{DedupEngine, Transition};
use fault_notify::NotificationDispatcher;
use fault_source::{decode, FaultRecord, FaultSource, QueryFilter, RawRecord, SourceError};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default time between poll cycles
const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Configuration for the poll loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep between cycles, however long the cycle took
    pub interval: Duration,
    /// Query constraint sent to the source
    pub filter: QueryFilter,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            filter: QueryFilter::default(),
        }
    }
}

/// Errors that end the poll loop
#[derive(Debug, Error)]
pub enum PollError {
    /// The source can never succeed; retrying is pointless
    #[error("Fatal fault source error: {0}")]
    Fatal(SourceError),
}

/// What one poll cycle saw and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Raw records returned by the source
    pub records: usize,
    /// Records dropped because they failed to decode
    pub decode_failures: usize,
    /// Raised notifications emitted
    pub raised: usize,
    /// Cleared notifications emitted
    pub cleared: usize,
    /// Notifications that could not be delivered
    pub delivery_failures: usize,
    /// The source reported nothing and dedup state was reset
    pub reset: bool,
    /// Every record failed to decode and the snapshot was not processed
    pub skipped: bool,
}

/// Decode every raw record, dropping the ones that fail.
///
/// Returns the decoded records in arrival order and the number dropped.
fn decode_snapshot(raw: &[RawRecord]) -> (Vec<FaultRecord>, usize) {
    let mut records = Vec::with_capacity(raw.len());
    let mut failures = 0;

    for item in raw {
        match decode(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                failures += 1;
                warn!(
                    id = item.attr("id").unwrap_or("?"),
                    error = %e,
                    "Skipping malformed fault record"
                );
            }
        }
    }

    (records, failures)
}

/// Fixed-interval fault poller
pub struct Poller<S: FaultSource> {
    session: SessionManager<S>,
    engine: DedupEngine,
    dispatcher: NotificationDispatcher,
    config: PollerConfig,
}

impl<S: FaultSource> Poller<S> {
    /// Create a poller over `source`
    pub fn new(source: S, dispatcher: NotificationDispatcher, config: PollerConfig) -> Self {
        info!(
            "Fault poller created for {} every {}s",
            source.name(),
            config.interval.as_secs()
        );
        Self {
            session: SessionManager::new(source),
            engine: DedupEngine::new(),
            dispatcher,
            config,
        }
    }

    /// Run one cycle: query, decode, deduplicate, notify.
    ///
    /// Source errors are returned for the caller to classify. Decode and
    /// delivery failures are absorbed and counted in the report.
    pub async fn poll_once(&mut self) -> Result<CycleReport, SourceError> {
        debug!("check faults");
        metrics::counter!("faultmon_poll_cycles_total").increment(1);

        let raw = self.session.query(&self.config.filter).await?;
        let (snapshot, decode_failures) = decode_snapshot(&raw);

        let mut report = CycleReport {
            records: raw.len(),
            decode_failures,
            ..Default::default()
        };
        metrics::counter!("faultmon_decode_failures_total").increment(decode_failures as u64);

        if snapshot.is_empty() && !raw.is_empty() {
            // Only an empty source response resets dedup state
            warn!(
                records = raw.len(),
                "No fault record could be decoded, leaving dedup state untouched"
            );
            report.skipped = true;
            return Ok(report);
        }

        report.reset = snapshot.is_empty();
        if report.reset {
            metrics::counter!("faultmon_dedup_resets_total").increment(1);
        }

        let events = self.engine.process(snapshot);
        report.raised = events
            .iter()
            .filter(|e| e.transition == Transition::Raised)
            .count();
        report.cleared = events.len() - report.raised;

        metrics::counter!("faultmon_notifications_total", "transition" => "raised")
            .increment(report.raised as u64);
        metrics::counter!("faultmon_notifications_total", "transition" => "cleared")
            .increment(report.cleared as u64);
        metrics::gauge!("faultmon_tracked_faults").set(self.engine.state().tracked() as f64);

        // Dedup state is already updated: a failed delivery is not retried
        report.delivery_failures = self.dispatcher.dispatch_all(&events).await;
        metrics::counter!("faultmon_delivery_failures_total")
            .increment(report.delivery_failures as u64);

        Ok(report)
    }

    /// Poll until `shutdown` is cancelled or the source fails fatally.
    ///
    /// The sleep between cycles is interrupted by shutdown; a cycle already
    /// in progress is allowed to finish. The session is closed on every
    /// exit path.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), PollError> {
        info!(
            filter = %self.config.filter.filter_string(),
            "Starting fault poller"
        );

        let outcome = loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested before poll cycle");
                break Ok(());
            }

            match self.poll_once().await {
                Ok(report) => debug!(?report, "Poll cycle complete"),
                Err(e) if e.is_recoverable() => {
                    metrics::counter!("faultmon_poll_failures_total").increment(1);
                    self.session.invalidate();
                    warn!(
                        error = %e,
                        "Poll cycle failed, retrying in {}s",
                        self.config.interval.as_secs()
                    );
                }
                Err(e) => {
                    error!(error = %e, "Fault source failed fatally");
                    break Err(PollError::Fatal(e));
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping fault poller");
                    break Ok(());
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        };

        self.session.close().await;
        match &outcome {
            Ok(()) => info!("Fault poller stopped"),
            Err(e) => error!("Fault poller stopped: {}", e),
        }
        outcome
    }

    /// Session with the source
    pub fn session(&self) -> &SessionManager<S> {
        &self.session
    }

    /// Dedup engine state
    pub fn engine(&self) -> &DedupEngine {
        &self.engine
    }
}
