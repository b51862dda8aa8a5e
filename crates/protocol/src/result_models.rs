//! Execution results returned by both executors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::session_models::ActionLogEntry;

/// What an [`OperationResult`] describes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Step,
    Assertion,
    Attempt,
}

/// Outcome of one step, assertion or goal-directed attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct OperationResult {
    pub kind: OperationKind,
    /// Zero-based for steps and assertions, one-based for attempts.
    pub index: usize,
    /// Step action or assertion tag; `attempt` for attempts.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// A captured page image, base64-encoded for transport.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Screenshot {
    /// Path-like identifier, e.g. `screenshots/<session>/step-2.png`.
    pub id: String,
    pub data_base64: String,
    pub captured_at: DateTime<Utc>,
}

/// Result of one executor run, persisted into the session's `result_payload`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ExecutionResult {
    pub session_id: String,
    pub success: bool,
    pub results: Vec<OperationResult>,
    pub screenshots: Vec<Screenshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    pub execution_time_ms: u64,
    /// The session's full action log at the time the run ended.
    #[serde(default)]
    pub action_logs: Vec<ActionLogEntry>,
}

impl ExecutionResult {
    /// A failed result with no operations, for runs that could not start.
    pub fn failure(session_id: impl Into<String>, error_summary: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            success: false,
            results: Vec::new(),
            screenshots: Vec::new(),
            error_summary: Some(error_summary.into()),
            execution_time_ms: 0,
            action_logs: Vec::new(),
        }
    }

    pub fn results_of(&self, kind: OperationKind) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(move |r| r.kind == kind)
    }
}
