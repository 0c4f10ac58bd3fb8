//! Shared state every runner needs: the event log, the task store rooted at
//! the current session, the project root, and whether we're in a test run
//! (spec §4.6: "pure function `(stdin_json, testing) -> output_json`").

use std::path::PathBuf;

use macf_eventlog::EventLog;
use macf_tasks::TaskStore;

pub struct HookContext {
    pub project_root: PathBuf,
    pub log: EventLog,
    pub testing: bool,
}

impl HookContext {
    pub fn new(project_root: impl Into<PathBuf>, events_log_path: impl Into<PathBuf>, testing: bool) -> Self {
        let project_root = project_root.into();
        Self {
            log: EventLog::new(events_log_path.into()),
            project_root,
            testing,
        }
    }

    /// Resolve for the project root under the current environment, honoring
    /// the same override chain the rest of the workspace uses.
    pub fn from_env(testing: bool) -> macf_core::Result<Self> {
        let project_root = macf_core::path::resolve_project_root(None)?;
        let events_log_path = macf_core::path::resolve_events_log_path(&project_root, None);
        Ok(Self::new(project_root, events_log_path, testing))
    }

    pub fn tasks_root(&self) -> PathBuf {
        macf_core::path::resolve_tasks_root(&self.project_root)
    }

    pub fn session_tasks_dir(&self, session_id: &str) -> PathBuf {
        self.tasks_root().join(session_id)
    }

    pub fn task_store(&self, session_id: &str) -> TaskStore {
        TaskStore::new(self.session_tasks_dir(session_id))
    }

    pub fn host_transcript_dir(&self) -> Option<PathBuf> {
        macf_core::path::host_transcript_dir(&self.project_root).ok()
    }

    /// Only append when not running a pure test invocation — production
    /// side effects per spec §4.6's runner table.
    pub fn emit(&self, breadcrumb: &macf_types::Breadcrumb, kind: macf_types::EventKind) {
        if self.testing {
            return;
        }
        self.log.append(breadcrumb, kind, None);
    }
}
