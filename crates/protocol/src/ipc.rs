//! Runtime events emitted while sessions execute.
//!
//! The core sends these through a `tokio::sync::mpsc` channel so that a
//! front end (or a test) can follow a run live. The durable record of a run
//! is the action log; events are best effort.
//!
//! Uses tagged enum serialization:
//! ```json
//! {
//!   "type": "sessionStatusUpdate",
//!   "payload": { "session_id": "s-1", "status": "completed" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config_models::TestKind;
use crate::session_models::SessionStatus;

/// Events sent from the core to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A session record was created and its executor is about to run.
    SessionStarted {
        session_id: String,
        url: String,
        test_kind: TestKind,
        config_id: Option<String>,
    },

    /// A session's status changed.
    SessionStatusUpdate {
        session_id: String,
        status: SessionStatus,
    },

    /// An action log entry was written.
    ActionLogged {
        session_id: String,
        action_type: String,
        success: bool,
        execution_time_ms: u64,
    },

    /// The executor returned and the result was persisted.
    SessionCompleted { session_id: String, success: bool },

    /// The run failed; carries the error summary.
    SessionError { session_id: String, error: String },

    /// An operator cancelled the session.
    SessionCancelled { session_id: String },
}
