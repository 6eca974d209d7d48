//! Fault Poller
//!
//! Owns the session with the fault source and drives the fixed-interval
//! poll loop: query, decode, deduplicate, notify, sleep.

mod poller;
mod session;

pub use poller::{CycleReport, PollError, Poller, PollerConfig};
pub use session::{SessionManager, SessionStatus};
