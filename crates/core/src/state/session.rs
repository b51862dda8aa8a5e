//! Session lifecycle.
//!
//! A session is created `running` before its executor starts and reaches
//! exactly one terminal status. The status written at the end agrees with
//! the result's `success` flag, unless an operator cancelled the session
//! first: `cancelled` is kept and the result is still stored.

use crate::storage::{StoreError, TestStore};
use chrono::Utc;
use sc_protocol::{Event, ExecutionResult, SessionStatus, SessionUpdate, TestKind, TestSession};
use tokio::sync::mpsc::Sender;
use tracing::info;

/// Errors raised by session orchestration.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// Nothing matches the URL and the request carried no inline test.
    #[error("No active configuration matches {url}")]
    NoConfiguration { url: String },

    #[error("Invalid instructions in {source_name}: {reason}")]
    InvalidInstructions { source_name: String, reason: String },

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {id} is already {}", .status.as_str())]
    NotRunning { id: String, status: SessionStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A fresh `running` session record.
pub fn new_session(
    id: impl Into<String>,
    url: impl Into<String>,
    test_kind: TestKind,
    config_id: Option<String>,
) -> TestSession {
    TestSession {
        id: id.into(),
        url: url.into(),
        test_kind,
        status: SessionStatus::Running,
        config_id,
        start_time: Utc::now(),
        end_time: None,
        result_payload: None,
        error_summary: None,
    }
}

/// Persist a new session and announce it.
pub async fn open_session(
    store: &dyn TestStore,
    session: TestSession,
    events_tx: &Sender<Event>,
) -> Result<TestSession, SessionError> {
    let session = store.create_test_session(session).await?;
    info!(session_id = %session.id, url = %session.url, kind = %session.test_kind, "Session started");

    let _ = events_tx
        .send(Event::SessionStarted {
            session_id: session.id.clone(),
            url: session.url.clone(),
            test_kind: session.test_kind,
            config_id: session.config_id.clone(),
        })
        .await;
    let _ = events_tx
        .send(Event::SessionStatusUpdate {
            session_id: session.id.clone(),
            status: session.status,
        })
        .await;
    Ok(session)
}

/// Store the executor's result and move the session to its terminal status.
pub async fn finish_session(
    store: &dyn TestStore,
    result: &ExecutionResult,
    events_tx: &Sender<Event>,
) -> Result<TestSession, SessionError> {
    let session_id = result.session_id.as_str();
    let current = store
        .get_test_session(session_id)
        .await?
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

    store.save_test_result(result).await?;

    let status = if current.status == SessionStatus::Cancelled {
        SessionStatus::Cancelled
    } else {
        SessionStatus::from_success(result.success)
    };
    let payload = serde_json::to_value(result)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let session = store
        .update_test_session(
            session_id,
            SessionUpdate {
                status: Some(status),
                end_time: Some(current.end_time.unwrap_or_else(Utc::now)),
                result_payload: Some(payload),
                error_summary: result.error_summary.clone(),
            },
        )
        .await?;
    info!(session_id, status = status.as_str(), "Session finished");

    let _ = events_tx
        .send(Event::SessionStatusUpdate {
            session_id: session_id.to_string(),
            status,
        })
        .await;
    let event = match &result.error_summary {
        Some(error) if !result.success => Event::SessionError {
            session_id: session_id.to_string(),
            error: error.clone(),
        },
        _ => Event::SessionCompleted {
            session_id: session_id.to_string(),
            success: result.success,
        },
    };
    let _ = events_tx.send(event).await;
    Ok(session)
}

/// Operator cancellation. Only running sessions can be cancelled.
pub async fn cancel_session(
    store: &dyn TestStore,
    session_id: &str,
    events_tx: &Sender<Event>,
) -> Result<TestSession, SessionError> {
    let current = store
        .get_test_session(session_id)
        .await?
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
    if current.status != SessionStatus::Running {
        return Err(SessionError::NotRunning {
            id: session_id.to_string(),
            status: current.status,
        });
    }

    let session = store
        .update_test_session(
            session_id,
            SessionUpdate {
                status: Some(SessionStatus::Cancelled),
                end_time: Some(Utc::now()),
                ..SessionUpdate::default()
            },
        )
        .await?;
    info!(session_id, "Session cancelled");

    let _ = events_tx
        .send(Event::SessionStatusUpdate {
            session_id: session_id.to_string(),
            status: SessionStatus::Cancelled,
        })
        .await;
    let _ = events_tx
        .send(Event::SessionCancelled {
            session_id: session_id.to_string(),
        })
        .await;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_open_emits_started_and_running() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::channel(100);

        let session = new_session("s-1", "https://example.com", TestKind::Deterministic, None);
        open_session(&store, session, &tx).await.unwrap();

        assert!(matches!(rx.recv().await, Some(Event::SessionStarted { .. })));
        assert_eq!(
            rx.recv().await,
            Some(Event::SessionStatusUpdate {
                session_id: "s-1".to_string(),
                status: SessionStatus::Running,
            })
        );
    }

    #[tokio::test]
    async fn test_finish_status_agrees_with_result() {
        let store = MemoryStore::new();
        let (tx, _rx) = mpsc::channel(100);
        let session = new_session("s-1", "https://example.com", TestKind::Deterministic, None);
        open_session(&store, session, &tx).await.unwrap();

        let result = ExecutionResult::failure("s-1", "Step 1 (click) failed");
        let finished = finish_session(&store, &result, &tx).await.unwrap();

        assert_eq!(finished.status, SessionStatus::Failed);
        assert!(finished.end_time.is_some());
        assert_eq!(finished.error_summary.as_deref(), Some("Step 1 (click) failed"));
        assert_eq!(store.get_test_result("s-1").await.unwrap(), Some(result));
    }

    #[tokio::test]
    async fn test_cancelled_status_survives_finish() {
        let store = MemoryStore::new();
        let (tx, _rx) = mpsc::channel(100);
        let session = new_session("s-1", "https://example.com", TestKind::GoalDirected, None);
        open_session(&store, session, &tx).await.unwrap();

        let cancelled = cancel_session(&store, "s-1", &tx).await.unwrap();
        let mut result = ExecutionResult::failure("s-1", "cancelled");
        result.success = true;
        let finished = finish_session(&store, &result, &tx).await.unwrap();

        assert_eq!(finished.status, SessionStatus::Cancelled);
        assert_eq!(finished.end_time, cancelled.end_time);
        assert!(finished.result_payload.is_some());
    }

    #[tokio::test]
    async fn test_cancel_requires_running_session() {
        let store = MemoryStore::new();
        let (tx, _rx) = mpsc::channel(100);

        assert!(matches!(
            cancel_session(&store, "missing", &tx).await,
            Err(SessionError::NotFound(_))
        ));

        let session = new_session("s-1", "https://example.com", TestKind::Deterministic, None);
        open_session(&store, session, &tx).await.unwrap();
        cancel_session(&store, "s-1", &tx).await.unwrap();
        let err = cancel_session(&store, "s-1", &tx).await.unwrap_err();
        assert_eq!(err.to_string(), "Session s-1 is already cancelled");
    }
}
