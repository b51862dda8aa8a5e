//! In-memory store.

use crate::storage::base::{
    apply_update, upsert_configuration, StoreError, StoreResult, TestStore,
};
use async_trait::async_trait;
use sc_protocol::{ActionLogEntry, ExecutionResult, SessionUpdate, TestConfiguration, TestSession};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, TestSession>,
    logs: HashMap<String, Vec<ActionLogEntry>>,
    results: HashMap<String, ExecutionResult>,
    configurations: Vec<TestConfiguration>,
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configurations(configurations: Vec<TestConfiguration>) -> Self {
        let mut inner = Inner::default();
        for config in configurations {
            upsert_configuration(&mut inner.configurations, config);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }
}

#[async_trait]
impl TestStore for MemoryStore {
    async fn create_test_session(&self, session: TestSession) -> StoreResult<TestSession> {
        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(&session.id) {
            return Err(StoreError::AlreadyExists {
                kind: "Session",
                id: session.id,
            });
        }
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn update_test_session(&self, id: &str, update: SessionUpdate) -> StoreResult<TestSession> {
        let mut inner = self.inner.lock().await;
        let session = inner.sessions.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "Session",
            id: id.to_string(),
        })?;
        apply_update(session, update);
        Ok(session.clone())
    }

    async fn get_test_session(&self, id: &str) -> StoreResult<Option<TestSession>> {
        Ok(self.inner.lock().await.sessions.get(id).cloned())
    }

    async fn log_action(&self, entry: ActionLogEntry) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.logs.entry(entry.session_id.clone()).or_default().push(entry);
        Ok(())
    }

    async fn get_action_logs(&self, session_id: &str) -> StoreResult<Vec<ActionLogEntry>> {
        Ok(self
            .inner
            .lock()
            .await
            .logs
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_test_result(&self, result: &ExecutionResult) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.results.insert(result.session_id.clone(), result.clone());
        Ok(())
    }

    async fn get_test_result(&self, session_id: &str) -> StoreResult<Option<ExecutionResult>> {
        Ok(self.inner.lock().await.results.get(session_id).cloned())
    }

    async fn list_configurations(&self) -> StoreResult<Vec<TestConfiguration>> {
        Ok(self.inner.lock().await.configurations.clone())
    }

    async fn save_configuration(&self, config: TestConfiguration) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        upsert_configuration(&mut inner.configurations, config);
        Ok(())
    }
}
