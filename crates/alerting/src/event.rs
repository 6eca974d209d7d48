//! Fault Lifecycle Events

use fault_source::{FaultId, FaultRecord, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle transition worth a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// Fault became active
    Raised,
    /// Fault resolved
    Cleared,
}

impl Transition {
    /// Word used in notification subjects
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Raised => "Raised",
            Transition::Cleared => "Recovered",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fault as observed by the engine.
///
/// Owned and immutable, so it can be handed to a delivery task without
/// touching the dedup sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    record: FaultRecord,
}

impl Fault {
    /// Wrap a decoded record
    pub fn new(record: FaultRecord) -> Self {
        Self { record }
    }

    pub fn id(&self) -> &FaultId {
        &self.record.id
    }

    pub fn severity(&self) -> Severity {
        self.record.severity
    }

    pub fn distinguished_name(&self) -> &str {
        &self.record.distinguished_name
    }

    pub fn description(&self) -> &str {
        &self.record.description
    }
}

/// One emitted decision: notify `transition` for `fault`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultEvent {
    pub fault: Fault,
    pub transition: Transition,
}
