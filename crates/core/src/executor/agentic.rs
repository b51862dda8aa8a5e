//! Goal-directed executor: a bounded retry loop against success criteria.
//!
//! Each attempt snapshots the page, asks the judge for an analysis and a
//! plan, then runs the plan one action at a time, re-checking the criteria
//! after every action. The run ends on the first satisfied check, when the
//! attempt budget is spent, or when the deadline or a cancellation fires.

use crate::action_log::{elapsed_ms, ActionLogger};
use crate::automation::{AutomationHandle, AutomationProvider};
use crate::error::{ExecResult, ExecutionError};
use crate::executor::deadline::Deadline;
use crate::executor::handlers::required;
use crate::judge::PageJudge;
use crate::storage::TestStore;
use base64::Engine;
use chrono::Utc;
use sc_protocol::{
    CriteriaEvaluation, Event, ExecutionResult, ExecutorSettings, GoalDescriptor, OperationKind,
    OperationResult, PageSnapshot, PlanAction, PlanActionKind, Screenshot,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one attempt achieved.
#[derive(Debug, Clone, Serialize)]
struct AttemptReport {
    achieved: bool,
    actions_run: usize,
    unmet: Vec<String>,
}

/// Per-attempt state handed down to the action runners.
struct AttemptScope<'a> {
    logger: &'a ActionLogger,
    deadline: &'a Deadline,
    session_id: &'a str,
    attempt: u32,
    criteria: &'a [String],
}

pub struct AgenticExecutor {
    provider: Arc<dyn AutomationProvider>,
    store: Arc<dyn TestStore>,
    judge: Arc<dyn PageJudge>,
    settings: ExecutorSettings,
    events_tx: Sender<Event>,
}

impl AgenticExecutor {
    pub fn new(
        provider: Arc<dyn AutomationProvider>,
        store: Arc<dyn TestStore>,
        judge: Arc<dyn PageJudge>,
        events_tx: Sender<Event>,
    ) -> Self {
        Self {
            provider,
            store,
            judge,
            settings: ExecutorSettings::default(),
            events_tx,
        }
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Pursue `goal` for `session_id`. Never fails: errors end up in the
    /// returned result's `error_summary`.
    pub async fn execute(&self, session_id: &str, goal: &GoalDescriptor) -> ExecutionResult {
        self.execute_with_cancel(session_id, goal, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute); `cancel` interrupts the run like an
    /// expired deadline does.
    pub async fn execute_with_cancel(
        &self,
        session_id: &str,
        goal: &GoalDescriptor,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let start = Instant::now();
        let logger = ActionLogger::new(session_id, Arc::clone(&self.store), self.events_tx.clone());

        let criteria = match validate_goal(goal) {
            Ok(criteria) => criteria,
            Err(e) => {
                logger
                    .record("validate_goal", serde_json::to_value(goal).ok(), None, Some(e.to_string()), 0)
                    .await;
                let mut result = ExecutionResult::failure(session_id, e.to_string());
                result.action_logs = logger.entries().await;
                return result;
            }
        };

        let max_attempts = goal.max_attempts.max(1);
        // A zero timeout means no deadline.
        let deadline = if goal.timeout_ms == 0 {
            Deadline::unbounded(cancel)
        } else {
            Deadline::after(goal.timeout_ms, cancel)
        };
        info!(session_id, goal = %goal.goal, max_attempts, timeout_ms = goal.timeout_ms, "Starting goal-directed run");

        let mut automation: Option<AutomationHandle> = None;
        let mut results = Vec::new();
        let mut screenshots = Vec::new();
        let mut achieved = false;
        let mut stopped: Option<ExecutionError> = None;
        let mut last_error: Option<ExecutionError> = None;

        for attempt in 1..=max_attempts {
            if let Err(e) = deadline.check() {
                stopped = Some(e);
                break;
            }

            let scope = AttemptScope {
                logger: &logger,
                deadline: &deadline,
                session_id,
                attempt,
                criteria: &criteria,
            };
            let timed = logger
                .timed(
                    "attempt",
                    Some(json!({ "attempt": attempt, "max_attempts": max_attempts })),
                    self.run_attempt(&scope, goal, &mut automation, &mut screenshots),
                )
                .await;

            let failure = timed.outcome.as_ref().err().cloned();
            results.push(OperationResult {
                kind: OperationKind::Attempt,
                index: (attempt - 1) as usize,
                name: format!("attempt {attempt}"),
                description: goal.goal.clone(),
                success: timed.outcome.as_ref().is_ok_and(|r| r.achieved),
                detail: timed
                    .outcome
                    .as_ref()
                    .ok()
                    .and_then(|r| serde_json::to_value(r).ok()),
                error: failure.as_ref().map(ToString::to_string),
                execution_time_ms: timed.execution_time_ms,
            });

            match (timed.outcome, failure) {
                (Ok(report), _) if report.achieved => {
                    info!(session_id, attempt, actions = report.actions_run, "Goal achieved");
                    achieved = true;
                    break;
                }
                (Ok(report), _) => {
                    debug!(session_id, attempt, unmet = ?report.unmet, "Criteria not met");
                    last_error = None;
                }
                (Err(_), Some(e)) if e.is_terminal() => {
                    warn!(session_id, attempt, error = %e, "Run stopped");
                    stopped = Some(e);
                    break;
                }
                (Err(e), _) => {
                    warn!(session_id, attempt, error = %e, "Attempt failed");
                    last_error = Some(e);
                }
            }
        }

        if let Some(mut handle) = automation.take() {
            handle.dispose().await;
        }

        let error_summary = if achieved {
            None
        } else if let Some(e) = stopped {
            Some(e.to_string())
        } else if let Some(e) = last_error {
            Some(format!("Attempt {max_attempts} of {max_attempts} failed: {e}"))
        } else {
            Some(format!(
                "Goal not achieved after {max_attempts} attempts: {}",
                goal.goal
            ))
        };

        let execution_time_ms = elapsed_ms(start);
        info!(session_id, success = achieved, execution_time_ms, "Goal-directed run finished");

        ExecutionResult {
            session_id: session_id.to_string(),
            success: achieved,
            results,
            screenshots,
            error_summary,
            execution_time_ms,
            action_logs: logger.entries().await,
        }
    }

    async fn run_attempt(
        &self,
        scope: &AttemptScope<'_>,
        goal: &GoalDescriptor,
        automation: &mut Option<AutomationHandle>,
        screenshots: &mut Vec<Screenshot>,
    ) -> ExecResult<AttemptReport> {
        let handle = self.ensure_automation(scope, goal, automation).await?;

        let snapshot = scope
            .logger
            .timed_with(
                "snapshot",
                None,
                scope
                    .deadline
                    .run(async { handle.snapshot().await.map_err(ExecutionError::from) }),
                |s: &PageSnapshot| Some(snapshot_summary(s)),
            )
            .await
            .outcome?;

        let analysis = scope
            .logger
            .timed_with(
                "analyze",
                None,
                scope.deadline.run(async {
                    self.judge
                        .analyze(&snapshot, goal)
                        .await
                        .map_err(ExecutionError::from)
                }),
                |a| Some(json!({ "summary": a.summary, "actionable": a.actionable.len() })),
            )
            .await
            .outcome?;

        let plan: Vec<PlanAction> = scope
            .logger
            .timed(
                "plan",
                Some(json!({ "attempt": scope.attempt })),
                scope.deadline.run(async {
                    self.judge
                        .plan(&analysis, goal)
                        .await
                        .map_err(ExecutionError::from)
                }),
            )
            .await
            .outcome?;
        debug!(session_id = scope.session_id, attempt = scope.attempt, actions = plan.len(), "Plan derived");

        if plan.is_empty() {
            let evaluation = self.criteria_check(scope, handle, "criteria_check").await?;
            return Ok(report(&evaluation, 0));
        }

        let mut last = CriteriaEvaluation::default();
        for (index, action) in plan.iter().enumerate() {
            if action.kind != PlanActionKind::VerifySuccess {
                scope
                    .logger
                    .timed(
                        action.kind.as_str(),
                        serde_json::to_value(action).ok(),
                        scope
                            .deadline
                            .run(self.perform(scope, goal, action, index, handle, screenshots)),
                    )
                    .await
                    .outcome?;
            }

            // verify_success is itself the check
            let check_type = if action.kind == PlanActionKind::VerifySuccess {
                PlanActionKind::VerifySuccess.as_str()
            } else {
                "criteria_check"
            };
            last = self.criteria_check(scope, handle, check_type).await?;
            if last.satisfied {
                return Ok(report(&last, index + 1));
            }
        }
        Ok(report(&last, plan.len()))
    }

    /// Open a fresh capability when none is live and bring it to the goal URL.
    async fn ensure_automation<'h>(
        &self,
        scope: &AttemptScope<'_>,
        goal: &GoalDescriptor,
        automation: &'h mut Option<AutomationHandle>,
    ) -> ExecResult<&'h mut AutomationHandle> {
        let stale = automation.as_ref().map_or(true, AutomationHandle::is_disposed);
        if stale {
            let started = Instant::now();
            let opened = scope
                .deadline
                .run(async {
                    AutomationHandle::open(self.provider.as_ref(), scope.session_id)
                        .await
                        .map_err(ExecutionError::from)
                })
                .await;
            let handle = match opened {
                Ok(handle) => handle,
                Err(e) => {
                    scope
                        .logger
                        .record(
                            "open_session",
                            Some(json!({ "attempt": scope.attempt })),
                            None,
                            Some(e.to_string()),
                            elapsed_ms(started),
                        )
                        .await;
                    return Err(e);
                }
            };

            // Stored before navigating so a failed or timed-out navigation
            // still gets disposed.
            let handle = automation.insert(handle);

            if let Some(url) = goal.url.as_deref() {
                scope
                    .logger
                    .timed(
                        "navigate",
                        Some(json!({ "url": url })),
                        scope.deadline.run(async {
                            handle.navigate(url).await?;
                            Ok::<_, ExecutionError>(json!({ "url": url }))
                        }),
                    )
                    .await
                    .outcome?;
            }
            return Ok(handle);
        }

        automation
            .as_mut()
            .ok_or_else(|| ExecutionError::Automation("No automation session".to_string()))
    }

    /// Snapshot the page and evaluate every criterion against it.
    async fn criteria_check(
        &self,
        scope: &AttemptScope<'_>,
        handle: &mut AutomationHandle,
        action_type: &str,
    ) -> ExecResult<CriteriaEvaluation> {
        scope
            .logger
            .timed(
                action_type,
                Some(json!({ "criteria": scope.criteria })),
                scope.deadline.run(async {
                    let snapshot = handle.snapshot().await?;
                    let evaluation = self.judge.evaluate(&snapshot, scope.criteria).await?;
                    Ok::<_, ExecutionError>(evaluation)
                }),
            )
            .await
            .outcome
    }

    /// Validate and dispatch one plan action.
    async fn perform(
        &self,
        scope: &AttemptScope<'_>,
        goal: &GoalDescriptor,
        action: &PlanAction,
        index: usize,
        handle: &mut AutomationHandle,
        screenshots: &mut Vec<Screenshot>,
    ) -> ExecResult<Value> {
        match action.kind {
            PlanActionKind::AnalyzePage => {
                let snapshot = handle.snapshot().await?;
                let analysis = self.judge.analyze(&snapshot, goal).await?;
                Ok(json!({ "summary": analysis.summary, "notes": analysis.notes }))
            }
            PlanActionKind::TakeScreenshot => {
                let bytes = handle.take_screenshot().await?;
                let captured_at = Utc::now();
                let id = format!(
                    "screenshots/{}/attempt-{}-action-{}-{}.png",
                    scope.session_id,
                    scope.attempt,
                    index + 1,
                    captured_at.timestamp_millis()
                );
                screenshots.push(Screenshot {
                    id: id.clone(),
                    data_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
                    captured_at,
                });
                Ok(json!({ "screenshot_id": id }))
            }
            PlanActionKind::ClickElement => {
                let selector = required(action.selector.as_deref(), "selector", "click_element")?;
                handle.click(selector).await?;
                Ok(json!({ "selector": selector }))
            }
            PlanActionKind::TypeText => {
                let selector = required(action.selector.as_deref(), "selector", "type_text")?;
                let text = action
                    .text
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| ExecutionError::Validation("type_text requires 'text'".to_string()))?;
                handle.type_text(selector, text).await?;
                Ok(json!({ "selector": selector }))
            }
            PlanActionKind::NavigateTo => {
                let url = required(action.url.as_deref(), "url", "navigate_to")?;
                handle.navigate(url).await?;
                Ok(json!({ "url": url }))
            }
            PlanActionKind::WaitForElement => {
                let selector = required(action.selector.as_deref(), "selector", "wait_for_element")?;
                let timeout_ms = action.timeout_ms.unwrap_or(self.settings.element_timeout_ms);
                handle
                    .wait_for_element(selector, Duration::from_millis(timeout_ms))
                    .await?;
                Ok(json!({ "selector": selector, "timeout_ms": timeout_ms }))
            }
            PlanActionKind::VerifySuccess => Err(ExecutionError::Validation(
                "verify_success is evaluated as a criteria check".to_string(),
            )),
        }
    }
}

/// Required goal fields; returns the non-blank criteria.
fn validate_goal(goal: &GoalDescriptor) -> ExecResult<Vec<String>> {
    if goal.goal.trim().is_empty() {
        return Err(ExecutionError::Validation(
            "Goal descriptor requires 'goal'".to_string(),
        ));
    }
    let criteria: Vec<String> = goal
        .success_criteria
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if criteria.is_empty() {
        return Err(ExecutionError::Validation(
            "Goal descriptor requires at least one success criterion".to_string(),
        ));
    }
    Ok(criteria)
}

fn snapshot_summary(snapshot: &PageSnapshot) -> Value {
    json!({
        "url": snapshot.url,
        "title": snapshot.title,
        "elements": snapshot.elements.len(),
    })
}

fn report(evaluation: &CriteriaEvaluation, actions_run: usize) -> AttemptReport {
    AttemptReport {
        achieved: evaluation.satisfied,
        actions_run,
        unmet: evaluation.unmet().into_iter().map(str::to_string).collect(),
    }
}
