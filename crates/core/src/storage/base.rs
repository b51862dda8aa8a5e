//! Storage trait and error type.

use async_trait::async_trait;
use sc_protocol::{ActionLogEntry, ExecutionResult, SessionUpdate, TestConfiguration, TestSession};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// The id cannot be used as a storage key.
    #[error("Invalid id '{0}'")]
    InvalidId(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage used by the executors and the session manager.
///
/// `log_action` appends; `get_action_logs` returns a session's entries in
/// insertion order and never reorders or duplicates them across calls.
#[async_trait]
pub trait TestStore: Send + Sync {
    /// Store a new session. Fails if the id is taken.
    async fn create_test_session(&self, session: TestSession) -> StoreResult<TestSession>;

    /// Apply the `Some` fields of `update` and return the stored session.
    async fn update_test_session(&self, id: &str, update: SessionUpdate) -> StoreResult<TestSession>;

    async fn get_test_session(&self, id: &str) -> StoreResult<Option<TestSession>>;

    async fn log_action(&self, entry: ActionLogEntry) -> StoreResult<()>;

    async fn get_action_logs(&self, session_id: &str) -> StoreResult<Vec<ActionLogEntry>>;

    async fn save_test_result(&self, result: &ExecutionResult) -> StoreResult<()>;

    async fn get_test_result(&self, session_id: &str) -> StoreResult<Option<ExecutionResult>>;

    /// All configurations, in registration order.
    async fn list_configurations(&self) -> StoreResult<Vec<TestConfiguration>>;

    /// Insert a configuration, or replace the one with the same id in place.
    async fn save_configuration(&self, config: TestConfiguration) -> StoreResult<()>;
}

/// Patch `session` with the fields present in `update`.
pub fn apply_update(session: &mut TestSession, update: SessionUpdate) {
    if let Some(status) = update.status {
        session.status = status;
    }
    if let Some(end_time) = update.end_time {
        session.end_time = Some(end_time);
    }
    if let Some(payload) = update.result_payload {
        session.result_payload = Some(payload);
    }
    if let Some(summary) = update.error_summary {
        session.error_summary = Some(summary);
    }
}

/// Insert or replace by id, keeping the position of a replaced entry.
pub(crate) fn upsert_configuration(configs: &mut Vec<TestConfiguration>, config: TestConfiguration) {
    match configs.iter_mut().find(|c| c.id == config.id) {
        Some(existing) => *existing = config,
        None => configs.push(config),
    }
}
