//! Event record and taxonomy (spec §3.2/§3.3).
//!
//! `EventKind` is a sum type, one variant per known `event` string, with a
//! trailing `Unknown` variant carrying the raw name and payload so that logs
//! written by a newer version of this crate never break an older reader.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One JSON object as it appears on a line of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: f64,
    pub breadcrumb: String,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_input: Option<Value>,
}

impl EventRecord {
    pub fn new(timestamp: f64, breadcrumb: impl Into<String>, kind: EventKind) -> Self {
        Self {
            timestamp,
            breadcrumb: breadcrumb.into(),
            kind,
            hook_input: None,
        }
    }

    pub fn with_hook_input(mut self, hook_input: Value) -> Self {
        self.hook_input = Some(hook_input);
        self
    }

    /// The `event` tag string, e.g. `"dev_drv_started"`.
    pub fn event_name(&self) -> &str {
        self.kind.name()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStartedData {
    pub session_id: String,
    pub cycle: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionEndedData {
    pub session_id: String,
    pub timestamp: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationDetectedData {
    pub session_id: String,
    pub previous_session: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompactionDetectedData {
    pub session_id: String,
    pub cycle: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeDetectedData {
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoModeDetectedData {
    pub enabled: bool,
    pub source: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevDrvStartedData {
    pub prompt_uuid: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevDrvEndedData {
    pub prompt_uuid: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegDrvStartedData {
    pub subagent_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegDrvEndedData {
    pub subagent_type: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegationStartedData {
    pub subagent_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegationCompletedData {
    pub subagent_type: String,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallStartedData {
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallCompletedData {
    pub tool_name: String,
    pub tool_call_id: String,
    pub is_error: bool,
    /// Large stdout is replaced by a size placeholder before this is written (§4.6).
    pub output_summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskLifecycleData {
    pub task_id: String,
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantData {
    pub op: String,
    pub task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantClearedData {
    pub op: String,
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyInjectionData {
    pub policy_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    pub snapshot_type: String,
    pub event_tallies: Map<String, Value>,
    pub accumulated_durations: Map<String, Value>,
    pub metadata: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorData {
    pub source: String,
    pub error: String,
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliCommandData {
    pub command: String,
    pub args: Vec<String>,
}

/// Catch-all payload for event types with no fully-specified schema in the
/// data model (§3.3 TODO-list group: the shape of a todo item is owned by
/// the host agent, not this crate).
pub type GenericData = Value;

macro_rules! event_kind {
    ($($variant:ident($payload:ty) => $tag:literal),+ $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum EventKind {
            $($variant($payload),)+
            /// Forward-compatibility fallback: an event name this version of
            /// the crate does not recognize, with its raw payload preserved.
            Unknown(String, Value),
        }

        impl EventKind {
            pub fn name(&self) -> &str {
                match self {
                    $(EventKind::$variant(_) => $tag,)+
                    EventKind::Unknown(name, _) => name.as_str(),
                }
            }

            fn data_value(&self) -> std::result::Result<Value, serde_json::Error> {
                match self {
                    $(EventKind::$variant(p) => serde_json::to_value(p),)+
                    EventKind::Unknown(_, v) => Ok(v.clone()),
                }
            }

            fn from_parts(event: &str, data: Value) -> Result<EventKind> {
                Ok(match event {
                    $($tag => EventKind::$variant(serde_json::from_value(data).map_err(Error::Json)?),)+
                    other => EventKind::Unknown(other.to_string(), data),
                })
            }
        }
    };
}

event_kind! {
    SessionStarted(SessionStartedData) => "session_started",
    SessionEnded(SessionEndedData) => "session_ended",
    MigrationDetected(MigrationDetectedData) => "migration_detected",
    CompactionDetected(CompactionDetectedData) => "compaction_detected",
    ResumeDetected(ResumeDetectedData) => "resume_detected",
    AutoModeDetected(AutoModeDetectedData) => "auto_mode_detected",
    DevDrvStarted(DevDrvStartedData) => "dev_drv_started",
    DevDrvEnded(DevDrvEndedData) => "dev_drv_ended",
    DelegDrvStarted(DelegDrvStartedData) => "deleg_drv_started",
    DelegDrvEnded(DelegDrvEndedData) => "deleg_drv_ended",
    DelegationStarted(DelegationStartedData) => "delegation_started",
    DelegationCompleted(DelegationCompletedData) => "delegation_completed",
    ToolCallStarted(ToolCallStartedData) => "tool_call_started",
    ToolCallCompleted(ToolCallCompletedData) => "tool_call_completed",
    TaskStarted(TaskLifecycleData) => "task_started",
    TaskCompleted(TaskLifecycleData) => "task_completed",
    TaskPaused(TaskLifecycleData) => "task_paused",
    TaskGrantUpdate(GrantData) => "task_grant_update",
    TaskGrantDelete(GrantData) => "task_grant_delete",
    TaskGrantCreate(GrantData) => "task_grant_create",
    TaskGrantUpdateCleared(GrantClearedData) => "task_grant_update_cleared",
    TaskGrantDeleteCleared(GrantClearedData) => "task_grant_delete_cleared",
    TaskGrantCreateCleared(GrantClearedData) => "task_grant_create_cleared",
    PolicyInjectionActivated(PolicyInjectionData) => "policy_injection_activated",
    PolicyInjectionCleared(PolicyInjectionData) => "policy_injection_cleared",
    PolicyInjectionsClearedAll(GenericData) => "policy_injections_cleared_all",
    TodosUpdated(GenericData) => "todos_updated",
    TodosAuthCollapse(GenericData) => "todos_auth_collapse",
    TodosAuthRestore(GenericData) => "todos_auth_restore",
    TodosAuthItemEdit(GenericData) => "todos_auth_item_edit",
    StateSnapshot(SnapshotData) => "state_snapshot",
    Error(ErrorData) => "error",
    CliCommandInvoked(CliCommandData) => "cli_command_invoked",
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let data = self.data_value().map_err(serde::ser::Error::custom)?;
        Envelope {
            event: self.name().to_string(),
            data,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let envelope = Envelope::deserialize(deserializer)?;
        EventKind::from_parts(&envelope.event, envelope.data).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_event() {
        let record = EventRecord::new(
            1_700_000_000.0,
            "c_1/s_abcdefgh/p_none",
            EventKind::SessionStarted(SessionStartedData {
                session_id: "abcdefgh-1234".into(),
                cycle: 7,
                extra: Map::new(),
            }),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"event\":\"session_started\""));
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_name(), "session_started");
        match back.kind {
            EventKind::SessionStarted(d) => assert_eq!(d.cycle, 7),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_event_round_trips_losslessly() {
        let json = r#"{"timestamp":1.0,"breadcrumb":"x","event":"some_future_event","data":{"a":1}}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        match &record.kind {
            EventKind::Unknown(name, data) => {
                assert_eq!(name, "some_future_event");
                assert_eq!(data["a"], 1);
            }
            _ => panic!("expected Unknown"),
        }
        let back = serde_json::to_string(&record).unwrap();
        let reparsed: EventRecord = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed.event_name(), "some_future_event");
    }

    #[test]
    fn malformed_line_fails_to_deserialize_but_does_not_panic() {
        let result: std::result::Result<EventRecord, _> = serde_json::from_str("not json");
        assert!(result.is_err());
    }
}
