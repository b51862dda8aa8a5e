//! Session records and the action log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config_models::TestKind;

/// Lifecycle status of a session.
///
/// `Running` is set at creation. A session reaches exactly one terminal
/// status: `Completed` or `Failed` from the executor result, or `Cancelled`
/// by an operator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }

    /// The terminal status that agrees with an execution result.
    pub fn from_success(success: bool) -> Self {
        if success {
            SessionStatus::Completed
        } else {
            SessionStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// One end-to-end execution of a configuration against a URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct TestSession {
    /// Caller-generated unique id.
    pub id: String,
    pub url: String,
    pub test_kind: TestKind,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// The serialized `ExecutionResult`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

/// Partial update applied to a stored session. `None` fields are untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(default)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub end_time: Option<DateTime<Utc>>,
    pub result_payload: Option<serde_json::Value>,
    pub error_summary: Option<String>,
}

/// One attempted operation in a session. Never mutated once written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ActionLogEntry {
    pub session_id: String,
    /// `navigate`, `click`, `assertion`, `attempt`, `plan`, ...
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ActionLogEntry {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
