//! State projections (C3): snapshot-aware reverse-scan queries over the
//! event log, plus the session-identity and task-directory complements
//! that back recovery when the event log alone isn't enough.

pub mod error;
pub mod session;
pub mod snapshot_scan;
pub mod state;
pub mod tasks;

pub use error::{Error, Result};
pub use session::{current_session_id, last_user_prompt_uuid};
pub use snapshot_scan::{scan_since_snapshot, SnapshotBaseline};
pub use state::{
    auto_mode, compaction_count, cycle_number, delegations_this_drive, deleg_drv_stats, dev_drv_stats,
    last_session_end_time, last_session_id_from_events, pending_delegation_started_at, AutoMode, AutoModeSource,
    DelegDrvStats, Delegation, DevDrvStats,
};
pub use tasks::{active_tasks_from_events, active_tasks_from_filesystem, expected_policies_for_active_tasks};
