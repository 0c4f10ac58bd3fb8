//! Schema types shared across the macf workspace.
//!
//! This crate owns the wire and on-disk shapes everything else builds on:
//! breadcrumbs, the event taxonomy, task files, the policy manifest, hook
//! I/O, and state snapshots. It has no I/O of its own.

pub mod breadcrumb;
pub mod error;
pub mod event;
pub mod hook;
pub mod manifest;
pub mod snapshot;
pub mod task;

pub use breadcrumb::Breadcrumb;
pub use error::{Error, Result};
pub use event::{EventKind, EventRecord};
pub use hook::{HookInput, HookOutput};
pub use manifest::{Manifest, PolicyEntry};
pub use snapshot::StateSnapshot;
pub use task::{Task, TaskMetadata, TaskStatus, TaskType};
