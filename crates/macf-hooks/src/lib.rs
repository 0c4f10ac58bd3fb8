//! The ten hook runners (C5) and the recovery message builder (C6).

pub mod bookkeeping;
pub mod context;
pub mod dispatch;
pub mod post_tool_use;
pub mod pre_tool_use;
pub mod recovery;
pub mod sanitize;
pub mod session_start;
pub mod stop;
pub mod subagent_stop;
pub mod user_prompt_submit;

pub use context::HookContext;
pub use dispatch::{dispatch, DispatchEnv, RUNNER_NAMES};
pub use recovery::{build as build_recovery_message, gather_consciousness_artifacts, RecoveryInputs};
