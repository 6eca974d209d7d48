//! Fault Source
//!
//! Normalized fault records, the decoder that produces them from raw
//! management-system records, and the [`FaultSource`] capability used to
//! authenticate against and query a remote fault endpoint.

mod error;
mod mock;
mod record;
mod replay;
mod source;

pub use error::{DecodeError, SourceError};
pub use mock::MockFaultSource;
pub use record::{decode, FaultId, FaultRecord, RawRecord, Severity};
pub use replay::ReplayFaultSource;
pub use source::{FaultSource, QueryFilter, SessionHandle};

/// Well-known fault causes
pub mod cause {
    /// A monitored metric crossed a configured threshold
    pub const THRESHOLD_CROSSED: &str = "threshold-crossed";
}

/// Class id of fault instances on the management system
pub const FAULT_CLASS_ID: &str = "faultInst";
