//! Notification Deduplication Engine
//!
//! Two id sets record which faults have already been notified as raised and
//! which as cleared. A record is emitted only when its id is not yet in the
//! set matching its current state; emitting moves the id out of the other
//! set, so a fault that re-raises after clearing is notified again.
//!
//! An empty snapshot resets both sets. The remote system's fault retention
//! policy is what eventually stops returning stale cleared records; if it
//! never does, the sets are never reset and grow with every new fault id.

use crate::event::{Fault, FaultEvent, Transition};
use fault_source::{FaultId, FaultRecord};
use std::collections::HashSet;
use tracing::{debug, info};

/// Ids already notified, per lifecycle state.
///
/// The two sets are always disjoint.
#[derive(Debug, Clone, Default)]
pub struct DedupState {
    raised_notified: HashSet<FaultId>,
    cleared_notified: HashSet<FaultId>,
}

impl DedupState {
    /// Whether `id` has been notified as raised in the current generation
    pub fn is_raised_notified(&self, id: &FaultId) -> bool {
        self.raised_notified.contains(id)
    }

    /// Whether `id` has been notified as cleared in the current generation
    pub fn is_cleared_notified(&self, id: &FaultId) -> bool {
        self.cleared_notified.contains(id)
    }

    /// Number of ids tracked in either set
    pub fn tracked(&self) -> usize {
        self.raised_notified.len() + self.cleared_notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked() == 0
    }

    /// Whether no id is present in both sets
    pub fn is_disjoint(&self) -> bool {
        self.raised_notified.is_disjoint(&self.cleared_notified)
    }

    /// Record `id` as notified-raised. Returns false if it already was.
    fn mark_raised(&mut self, id: &FaultId) -> bool {
        if !self.raised_notified.insert(id.clone()) {
            return false;
        }
        self.cleared_notified.remove(id);
        true
    }

    /// Record `id` as notified-cleared. Returns false if it already was.
    fn mark_cleared(&mut self, id: &FaultId) -> bool {
        if !self.cleared_notified.insert(id.clone()) {
            return false;
        }
        self.raised_notified.remove(id);
        true
    }

    fn clear(&mut self) {
        self.raised_notified.clear();
        self.cleared_notified.clear();
    }
}

/// Decides which snapshot records deserve a notification
#[derive(Debug, Default)]
pub struct DedupEngine {
    state: DedupState,
}

impl DedupEngine {
    /// Create an engine with nothing tracked
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one poll snapshot and return the transitions to notify,
    /// in snapshot order.
    ///
    /// An empty snapshot resets all tracked state and emits nothing.
    pub fn process(&mut self, snapshot: Vec<FaultRecord>) -> Vec<FaultEvent> {
        if snapshot.is_empty() {
            if !self.state.is_empty() {
                info!(
                    tracked = self.state.tracked(),
                    "No matching faults reported, resetting dedup state"
                );
            }
            self.state.clear();
            return Vec::new();
        }

        let mut events = Vec::new();

        for record in snapshot {
            let transition = if record.is_raised() {
                if !self.state.mark_raised(&record.id) {
                    debug!(id = %record.id, "Already notified as raised");
                    continue;
                }
                Transition::Raised
            } else {
                if !self.state.mark_cleared(&record.id) {
                    debug!(id = %record.id, "Already notified as cleared");
                    continue;
                }
                Transition::Cleared
            };

            info!(id = %record.id, severity = %record.severity, "{}: {}", transition, record.id);
            events.push(FaultEvent {
                fault: Fault::new(record),
                transition,
            });
        }

        events
    }

    /// Current tracking sets
    pub fn state(&self) -> &DedupState {
        &self.state
    }
}
