//! The event log (C1) and breadcrumb minting (C2): the two leaf components
//! every other subsystem in this workspace is ultimately built on.

pub mod error;
pub mod eventlog;
pub mod mint;
pub mod query;

pub use error::{Error, Result};
pub use eventlog::{EventLog, ReconstructedState, Tallies, SNAPSHOT_SCAN_BOUND};
pub use mint::{mint, BreadcrumbCache};
pub use query::{BreadcrumbFilter, QueryFilters, SetOp};
