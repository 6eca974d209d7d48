//! Alerting
//!
//! Tracks the raised/cleared lifecycle of each fault across poll cycles and
//! decides which snapshot records deserve a notification.

mod dedup;
mod event;

pub use dedup::{DedupEngine, DedupState};
pub use event::{Fault, FaultEvent, Transition};
