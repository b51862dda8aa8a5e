//! Deterministic executor: ordered steps, then ordered assertions.
//!
//! Steps fail fast: the first failing step ends the run and no assertion is
//! attempted. Assertions are contained: each one runs and is logged whatever
//! the outcome of the others.

use crate::action_log::{elapsed_ms, ActionLogger};
use crate::automation::{AutomationHandle, AutomationProvider};
use crate::error::{ExecResult, ExecutionError};
use crate::executor::deadline::Deadline;
use crate::executor::registry::{AssertionContext, HandlerRegistry, StepContext};
use crate::storage::TestStore;
use sc_protocol::{
    Assertion, Event, ExecutionResult, ExecutorSettings, OperationKind, OperationResult,
    Screenshot, Step, TestCase,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct TraditionalExecutor {
    provider: Arc<dyn AutomationProvider>,
    store: Arc<dyn TestStore>,
    registry: Arc<HandlerRegistry>,
    settings: ExecutorSettings,
    events_tx: Sender<Event>,
}

impl TraditionalExecutor {
    pub fn new(
        provider: Arc<dyn AutomationProvider>,
        store: Arc<dyn TestStore>,
        events_tx: Sender<Event>,
    ) -> Self {
        Self {
            provider,
            store,
            registry: Arc::new(HandlerRegistry::with_builtins()),
            settings: ExecutorSettings::default(),
            events_tx,
        }
    }

    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run `test_case` for `session_id`. Never fails: errors end up in the
    /// returned result's `error_summary`.
    pub async fn execute(&self, session_id: &str, test_case: &TestCase) -> ExecutionResult {
        self.execute_with_cancel(session_id, test_case, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), stopping once `cancel` fires. The step
    /// or assertion in flight is interrupted.
    pub async fn execute_with_cancel(
        &self,
        session_id: &str,
        test_case: &TestCase,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let start = Instant::now();
        let logger = ActionLogger::new(session_id, Arc::clone(&self.store), self.events_tx.clone());
        info!(
            session_id,
            steps = test_case.steps.len(),
            assertions = test_case.assertions.len(),
            "Starting deterministic run"
        );

        let mut automation = match AutomationHandle::open(self.provider.as_ref(), session_id).await {
            Ok(handle) => handle,
            Err(e) => {
                let error = ExecutionError::from(e);
                logger
                    .record("open_session", None, None, Some(error.to_string()), elapsed_ms(start))
                    .await;
                let mut result = ExecutionResult::failure(
                    session_id,
                    format!("Failed to open automation session: {error}"),
                );
                result.execution_time_ms = elapsed_ms(start);
                result.action_logs = logger.entries().await;
                return result;
            }
        };

        let interrupt = Deadline::unbounded(cancel.clone());
        let mut results = Vec::new();
        let mut screenshots = Vec::new();
        let mut error_summary = None;

        for (index, step) in test_case.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                error_summary = Some(ExecutionError::Cancelled.to_string());
                break;
            }

            let tag = step.action.tag().to_string();
            let timed = logger
                .timed(
                    &tag,
                    serde_json::to_value(step).ok(),
                    interrupt.run(self.run_step(
                        session_id,
                        index,
                        step,
                        &mut automation,
                        &mut screenshots,
                    )),
                )
                .await;

            let cancelled = matches!(timed.outcome, Err(ExecutionError::Cancelled));
            let failure = timed.outcome.as_ref().err().map(ToString::to_string);
            results.push(OperationResult {
                kind: OperationKind::Step,
                index,
                name: tag.clone(),
                description: step.description.clone(),
                success: failure.is_none(),
                detail: timed.outcome.ok(),
                error: failure.clone(),
                execution_time_ms: timed.execution_time_ms,
            });

            if cancelled {
                error_summary = Some(ExecutionError::Cancelled.to_string());
                break;
            }
            if let Some(error) = failure {
                warn!(session_id, step = index + 1, action = %tag, %error, "Step failed, skipping the rest of the run");
                error_summary = Some(format!("Step {} ({tag}) failed: {error}", index + 1));
                break;
            }
        }

        if error_summary.is_none() {
            error_summary = self
                .run_assertions(&logger, session_id, &test_case.assertions, &mut automation, &mut results, &interrupt)
                .await;
        }

        automation.dispose().await;

        let success = error_summary.is_none();
        let execution_time_ms = elapsed_ms(start);
        info!(session_id, success, execution_time_ms, "Deterministic run finished");

        ExecutionResult {
            session_id: session_id.to_string(),
            success,
            results,
            screenshots,
            error_summary,
            execution_time_ms,
            action_logs: logger.entries().await,
        }
    }

    async fn run_step(
        &self,
        session_id: &str,
        index: usize,
        step: &Step,
        automation: &mut AutomationHandle,
        screenshots: &mut Vec<Screenshot>,
    ) -> ExecResult<Value> {
        let handler = self.registry.step_handler(step.action.tag())?;
        let mut ctx = StepContext {
            session_id,
            index,
            automation,
            settings: &self.settings,
            screenshots,
        };
        handler.execute(step, &mut ctx).await
    }

    /// Run every assertion and summarize the failures, if any.
    async fn run_assertions(
        &self,
        logger: &ActionLogger,
        session_id: &str,
        assertions: &[Assertion],
        automation: &mut AutomationHandle,
        results: &mut Vec<OperationResult>,
        interrupt: &Deadline,
    ) -> Option<String> {
        let mut failures = Vec::new();

        for (index, assertion) in assertions.iter().enumerate() {
            if interrupt.is_cancelled() {
                return Some(ExecutionError::Cancelled.to_string());
            }

            let tag = assertion.kind.tag().to_string();
            let timed = logger
                .timed(
                    "assertion",
                    serde_json::to_value(assertion).ok(),
                    interrupt.run(self.check_assertion(session_id, index, assertion, automation)),
                )
                .await;

            let failure = timed.outcome.as_ref().err().map(ToString::to_string);
            results.push(OperationResult {
                kind: OperationKind::Assertion,
                index,
                name: tag.clone(),
                description: assertion.description.clone(),
                success: failure.is_none(),
                detail: timed.outcome.ok(),
                error: failure.clone(),
                execution_time_ms: timed.execution_time_ms,
            });

            if let Some(error) = failure {
                warn!(session_id, assertion = index + 1, kind = %tag, %error, "Assertion failed");
                failures.push(format!("Assertion {} ({tag}): {error}", index + 1));
            }
        }

        failures.first().map(|first| {
            format!(
                "{} of {} assertions failed: {first}",
                failures.len(),
                assertions.len()
            )
        })
    }

    async fn check_assertion(
        &self,
        session_id: &str,
        index: usize,
        assertion: &Assertion,
        automation: &mut AutomationHandle,
    ) -> ExecResult<Value> {
        let handler = self.registry.assertion_handler(assertion.kind.tag())?;
        let mut ctx = AssertionContext {
            session_id,
            index,
            automation,
        };
        handler.check(assertion, &mut ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::adapters::{MockBrowser, MockElement, MockPage, MockProvider};
    use crate::storage::MemoryStore;
    use sc_protocol::{AssertionKind, StepAction};
    use tokio::sync::mpsc;

    fn executor(provider: MockProvider) -> (TraditionalExecutor, Arc<MockProvider>) {
        let provider = Arc::new(provider);
        let (tx, _rx) = mpsc::channel(16);
        let executor = TraditionalExecutor::new(provider.clone(), Arc::new(MemoryStore::new()), tx);
        (executor, provider)
    }

    #[tokio::test]
    async fn test_empty_test_case_succeeds() {
        let (executor, provider) = executor(MockProvider::new(MockBrowser::blank()));
        let result = executor.execute("s-1", &TestCase::default()).await;

        assert!(result.success);
        assert!(result.error_summary.is_none());
        assert_eq!(provider.recorder().closes(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_automation_returns_failed_result() {
        let (executor, _provider) = executor(MockProvider::unavailable());
        let test_case = TestCase {
            steps: vec![Step::new(StepAction::Navigate, "go").with_url("https://example.com")],
            assertions: vec![],
        };

        let result = executor.execute("s-1", &test_case).await;
        assert!(!result.success);
        assert!(result
            .error_summary
            .as_deref()
            .unwrap()
            .starts_with("Failed to open automation session"));
        assert_eq!(result.action_logs.len(), 1);
        assert_eq!(result.action_logs[0].action_type, "open_session");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let page = MockPage::new("Home").with_element("#app", MockElement::new("main", ""));
        let (executor, provider) = executor(MockProvider::new(MockBrowser::new(page)));
        let test_case = TestCase {
            steps: vec![Step::new(StepAction::Click, "click").with_selector("#app")],
            assertions: vec![Assertion::new(AssertionKind::Exists, "app").with_selector("#app")],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor.execute_with_cancel("s-1", &test_case, cancel).await;
        assert!(!result.success);
        assert_eq!(result.error_summary.as_deref(), Some("Session was cancelled"));
        assert!(result.action_logs.is_empty());
        assert_eq!(provider.recorder().calls_of("click"), 0);
        assert_eq!(provider.recorder().closes(), 1);
    }
}
