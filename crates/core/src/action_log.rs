//! Timed action logging shared by both executors.
//!
//! Every attempted operation produces exactly one [`ActionLogEntry`], written
//! once the operation has finished, whatever its outcome. A failed write is
//! reported through `tracing` and never changes the outcome of the operation.

use crate::error::ExecResult;
use crate::storage::TestStore;
use chrono::Utc;
use sc_protocol::{ActionLogEntry, Event};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of an operation run through [`ActionLogger::timed`].
#[derive(Debug)]
pub struct TimedOutcome<T> {
    pub outcome: ExecResult<T>,
    pub execution_time_ms: u64,
}

/// Milliseconds elapsed since `start`, saturating.
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Writes the action log of one session.
#[derive(Clone)]
pub struct ActionLogger {
    session_id: String,
    store: Arc<dyn TestStore>,
    events_tx: Sender<Event>,
}

impl ActionLogger {
    pub fn new(session_id: impl Into<String>, store: Arc<dyn TestStore>, events_tx: Sender<Event>) -> Self {
        Self {
            session_id: session_id.into(),
            store,
            events_tx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run `operation`, then log its duration and outcome as one entry.
    pub async fn timed<T, F>(
        &self,
        action_type: &str,
        action_data: Option<Value>,
        operation: F,
    ) -> TimedOutcome<T>
    where
        T: Serialize,
        F: Future<Output = ExecResult<T>>,
    {
        self.timed_with(action_type, action_data, operation, |value| {
            serde_json::to_value(value).ok()
        })
        .await
    }

    /// Like [`timed`](Self::timed), logging `summarize(&value)` on success
    /// instead of the whole value.
    pub async fn timed_with<T, F, S>(
        &self,
        action_type: &str,
        action_data: Option<Value>,
        operation: F,
        summarize: S,
    ) -> TimedOutcome<T>
    where
        F: Future<Output = ExecResult<T>>,
        S: FnOnce(&T) -> Option<Value>,
    {
        let start = Instant::now();
        let outcome = operation.await;
        let execution_time_ms = elapsed_ms(start);

        let (result, error) = match &outcome {
            Ok(value) => (summarize(value).filter(|v| !v.is_null()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        self.record(action_type, action_data, result, error, execution_time_ms)
            .await;

        TimedOutcome {
            outcome,
            execution_time_ms,
        }
    }

    /// Append one entry. Used directly for operations that are not timed.
    pub async fn record(
        &self,
        action_type: &str,
        action_data: Option<Value>,
        result: Option<Value>,
        error: Option<String>,
        execution_time_ms: u64,
    ) {
        let success = error.is_none();
        let entry = ActionLogEntry {
            session_id: self.session_id.clone(),
            action_type: action_type.to_string(),
            action_data,
            result,
            error,
            execution_time_ms,
            timestamp: Utc::now(),
        };

        match self.store.log_action(entry).await {
            Ok(()) => debug!(session_id = %self.session_id, action_type, success, "Action logged"),
            Err(e) => warn!(
                session_id = %self.session_id,
                action_type,
                error = %e,
                "Failed to write action log entry"
            ),
        }

        let _ = self
            .events_tx
            .send(Event::ActionLogged {
                session_id: self.session_id.clone(),
                action_type: action_type.to_string(),
                success,
                execution_time_ms,
            })
            .await;
    }

    /// The session's log so far, in insertion order.
    pub async fn entries(&self) -> Vec<ActionLogEntry> {
        match self.store.get_action_logs(&self.session_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to read action log");
                Vec::new()
            }
        }
    }
}
