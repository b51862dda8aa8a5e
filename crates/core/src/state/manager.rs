//! Session manager: the caller-side orchestration around the executors.
//!
//! The SessionManager resolves the configuration for a URL, creates the
//! session record, runs the matching executor and persists the outcome. It
//! keeps a cancellation token per running session so that an operator can
//! stop a run at its next step or attempt boundary.

use crate::automation::AutomationProvider;
use crate::executor::{AgenticExecutor, HandlerRegistry, TraditionalExecutor};
use crate::judge::PageJudge;
use crate::resolver::ConfigResolver;
use crate::state::session::{self, SessionError};
use crate::storage::TestStore;
use sc_protocol::{
    ActionLogEntry, Event, ExecutionResult, ExecutorSettings, GoalDescriptor, GoalLimits, TestCase,
    TestKind, TestSession,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Test instructions supplied with a request instead of a stored configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineTest {
    pub test_kind: TestKind,
    pub instructions: Value,
}

/// A request to test one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub url: String,
    /// Restricts resolution to configurations of this kind.
    pub test_kind: Option<TestKind>,
    /// Generated when absent.
    pub session_id: Option<String>,
    /// Used instead of resolving a stored configuration.
    pub inline: Option<InlineTest>,
}

impl RunRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            test_kind: None,
            session_id: None,
            inline: None,
        }
    }

    pub fn with_kind(mut self, test_kind: TestKind) -> Self {
        self.test_kind = Some(test_kind);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_inline(mut self, test_kind: TestKind, instructions: Value) -> Self {
        self.inline = Some(InlineTest {
            test_kind,
            instructions,
        });
        self
    }
}

/// Decoded instructions, ready for an executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Instructions {
    Deterministic(TestCase),
    GoalDirected(GoalDescriptor),
}

impl Instructions {
    /// Decode a configuration's instruction payload.
    ///
    /// A null payload is an empty test case. Goal descriptors that omit
    /// `max_attempts` or `timeout_ms`, or give an unreadable value, take them
    /// from `settings`, and start
    /// from `url` when they name no page of their own.
    pub fn decode(
        test_kind: TestKind,
        payload: Value,
        settings: &ExecutorSettings,
        url: &str,
        source_name: &str,
    ) -> Result<Self, SessionError> {
        let invalid = |e: serde_json::Error| SessionError::InvalidInstructions {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        };

        match test_kind {
            TestKind::Deterministic if payload.is_null() => {
                Ok(Instructions::Deterministic(TestCase::default()))
            }
            TestKind::Deterministic => serde_json::from_value(payload)
                .map(Instructions::Deterministic)
                .map_err(invalid),
            TestKind::GoalDirected => {
                let limits: GoalLimits =
                    serde_json::from_value(payload.clone()).map_err(invalid)?;
                let mut goal: GoalDescriptor = serde_json::from_value(payload).map_err(invalid)?;
                if limits.max_attempts.is_none() {
                    goal.max_attempts = settings.default_max_attempts;
                }
                if limits.timeout_ms.is_none() {
                    goal.timeout_ms = settings.default_timeout_ms;
                }
                if goal.url.is_none() {
                    goal.url = Some(url.to_string());
                }
                Ok(Instructions::GoalDirected(goal))
            }
        }
    }

    pub fn test_kind(&self) -> TestKind {
        match self {
            Instructions::Deterministic(_) => TestKind::Deterministic,
            Instructions::GoalDirected(_) => TestKind::GoalDirected,
        }
    }
}

/// Manages test sessions from request to persisted result.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn TestStore>,
    resolver: ConfigResolver,
    provider: Arc<dyn AutomationProvider>,
    judge: Arc<dyn PageJudge>,
    registry: Arc<HandlerRegistry>,
    settings: ExecutorSettings,
    events_tx: mpsc::Sender<Event>,
    /// Cancellation tokens of the sessions currently executing.
    running: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn TestStore>,
        provider: Arc<dyn AutomationProvider>,
        judge: Arc<dyn PageJudge>,
        events_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            resolver: ConfigResolver::new(Arc::clone(&store)),
            store,
            provider,
            judge,
            registry: Arc::new(HandlerRegistry::with_builtins()),
            settings: ExecutorSettings::default(),
            events_tx,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// Resolve the request's configuration and build its session record.
    ///
    /// Nothing is persisted yet.
    pub async fn prepare(&self, request: RunRequest) -> Result<(TestSession, Instructions), SessionError> {
        let (config_id, test_kind, payload) = match request.inline {
            Some(inline) => (None, inline.test_kind, inline.instructions),
            None => {
                let config = self
                    .resolver
                    .resolve(&request.url, request.test_kind)
                    .await?
                    .ok_or_else(|| SessionError::NoConfiguration {
                        url: request.url.clone(),
                    })?;
                (Some(config.id), config.test_kind, config.instructions)
            }
        };

        let source_name = config_id
            .as_deref()
            .map_or_else(|| "inline test".to_string(), |id| format!("configuration '{id}'"));
        let instructions =
            Instructions::decode(test_kind, payload, &self.settings, &request.url, &source_name)?;

        let session_id = request
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = session::new_session(session_id, request.url, test_kind, config_id);
        Ok((session, instructions))
    }

    /// Run a test to completion and return its result.
    pub async fn run_test(&self, request: RunRequest) -> Result<ExecutionResult, SessionError> {
        let (session, instructions) = self.prepare(request).await?;
        let (session_id, cancel) = self.begin(session).await?;
        self.execute(session_id, instructions, cancel).await
    }

    /// Start a test on a background task and return its session id.
    ///
    /// The session exists in `running` state when this returns.
    pub async fn start_test(&self, request: RunRequest) -> Result<String, SessionError> {
        let (session, instructions) = self.prepare(request).await?;
        let (session_id, cancel) = self.begin(session).await?;

        let manager = self.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.execute(id.clone(), instructions, cancel).await {
                error!(session_id = %id, error = %e, "Failed to persist session outcome");
            }
        });
        Ok(session_id)
    }

    /// Operator cancellation of a running session.
    ///
    /// The stored status becomes `cancelled` at once; the executor stops at
    /// its next step, assertion or attempt boundary.
    pub async fn cancel_session(&self, session_id: &str) -> Result<TestSession, SessionError> {
        let running = self.running.lock().await;
        let session = session::cancel_session(self.store.as_ref(), session_id, &self.events_tx).await?;
        if let Some(token) = running.get(session_id) {
            token.cancel();
        }
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<TestSession, SessionError> {
        self.store
            .get_test_session(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub async fn get_action_logs(&self, session_id: &str) -> Result<Vec<ActionLogEntry>, SessionError> {
        Ok(self.store.get_action_logs(session_id).await?)
    }

    pub async fn get_result(&self, session_id: &str) -> Result<Option<ExecutionResult>, SessionError> {
        Ok(self.store.get_test_result(session_id).await?)
    }

    /// Ids of the sessions currently executing, sorted.
    pub async fn running_sessions(&self) -> Vec<String> {
        let running = self.running.lock().await;
        let mut ids: Vec<String> = running.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Persist the session and register its cancellation token.
    async fn begin(&self, session: TestSession) -> Result<(String, CancellationToken), SessionError> {
        let session = session::open_session(self.store.as_ref(), session, &self.events_tx).await?;
        let cancel = CancellationToken::new();
        self.running
            .lock()
            .await
            .insert(session.id.clone(), cancel.clone());
        Ok((session.id, cancel))
    }

    async fn execute(
        &self,
        session_id: String,
        instructions: Instructions,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, SessionError> {
        info!(session_id = %session_id, kind = %instructions.test_kind(), "Executing session");
        let result = match &instructions {
            Instructions::Deterministic(test_case) => {
                TraditionalExecutor::new(
                    Arc::clone(&self.provider),
                    Arc::clone(&self.store),
                    self.events_tx.clone(),
                )
                .with_registry(Arc::clone(&self.registry))
                .with_settings(self.settings.clone())
                .execute_with_cancel(&session_id, test_case, cancel)
                .await
            }
            Instructions::GoalDirected(goal) => {
                AgenticExecutor::new(
                    Arc::clone(&self.provider),
                    Arc::clone(&self.store),
                    Arc::clone(&self.judge),
                    self.events_tx.clone(),
                )
                .with_settings(self.settings.clone())
                .execute_with_cancel(&session_id, goal, cancel)
                .await
            }
        };

        // Holding the registry lock orders this against cancel_session.
        let mut running = self.running.lock().await;
        running.remove(&session_id);
        session::finish_session(self.store.as_ref(), &result, &self.events_tx).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_goal_applies_settings_defaults() {
        let settings = ExecutorSettings {
            default_max_attempts: 5,
            default_timeout_ms: 60_000,
            ..ExecutorSettings::default()
        };
        let payload = json!({ "goal": "Find pricing", "success_criteria": ["Pricing"] });

        let decoded = Instructions::decode(
            TestKind::GoalDirected,
            payload,
            &settings,
            "https://example.com",
            "inline test",
        )
        .unwrap();

        let Instructions::GoalDirected(goal) = decoded else {
            panic!("expected a goal descriptor");
        };
        assert_eq!(goal.max_attempts, 5);
        assert_eq!(goal.timeout_ms, 60_000);
        assert_eq!(goal.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_decode_goal_keeps_explicit_values() {
        let payload = json!({
            "goal": "Find pricing",
            "successCriteria": ["Pricing"],
            "maxAttempts": 2,
            "timeout": 1000,
            "url": "https://example.com/start",
        });

        let decoded = Instructions::decode(
            TestKind::GoalDirected,
            payload,
            &ExecutorSettings::default(),
            "https://example.com",
            "inline test",
        )
        .unwrap();

        let Instructions::GoalDirected(goal) = decoded else {
            panic!("expected a goal descriptor");
        };
        assert_eq!(goal.max_attempts, 2);
        assert_eq!(goal.timeout_ms, 1000);
        assert_eq!(goal.url.as_deref(), Some("https://example.com/start"));
    }

    #[test]
    fn test_decode_goal_unreadable_limits_fall_back_to_settings() {
        let settings = ExecutorSettings {
            default_max_attempts: 4,
            default_timeout_ms: 60_000,
            ..ExecutorSettings::default()
        };
        let payload = json!({
            "goal": "g",
            "success_criteria": ["x"],
            "timeout_ms": "soon",
            "max_attempts": null,
        });

        let decoded = Instructions::decode(
            TestKind::GoalDirected,
            payload,
            &settings,
            "https://example.com",
            "inline test",
        )
        .unwrap();

        let Instructions::GoalDirected(goal) = decoded else {
            panic!("expected a goal descriptor");
        };
        assert_eq!(goal.timeout_ms, 60_000);
        assert_eq!(goal.max_attempts, 4);
    }

    #[test]
    fn test_decode_rejects_missing_goal() {
        let result = Instructions::decode(
            TestKind::GoalDirected,
            json!({ "success_criteria": ["x"] }),
            &ExecutorSettings::default(),
            "https://example.com",
            "configuration 'c-1'",
        );
        match result {
            Err(SessionError::InvalidInstructions { source_name, .. }) => {
                assert_eq!(source_name, "configuration 'c-1'");
            }
            other => panic!("expected InvalidInstructions, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_null_deterministic_is_empty_case() {
        let decoded = Instructions::decode(
            TestKind::Deterministic,
            Value::Null,
            &ExecutorSettings::default(),
            "https://example.com",
            "inline test",
        )
        .unwrap();
        assert_eq!(decoded, Instructions::Deterministic(TestCase::default()));
    }
}
