//! Deterministic runs against the in-memory browser.
//!
//! Covers:
//! - Fail-fast step execution and its action log
//! - One log entry per assertion, with every assertion evaluated
//! - Screenshots, waits and registry extensions
//! - Disposal of the automation capability

mod common;

use async_trait::async_trait;
use common::*;
use sc_core::automation::adapters::{MockBrowser, MockElement, MockPage};
use sc_core::executor::{HandlerRegistry, StepContext, StepHandler, TraditionalExecutor};
use sc_core::storage::TestStore;
use sc_core::{ExecResult, ExecutionError};
use sc_protocol::{OperationKind, Step, StepAction, TestCase};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_login_flow_passes() {
    let provider = provider(login_browser());
    let store = store();
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider.clone(), store.clone(), tx);

    let result = executor.execute("login-1", &login_case()).await;

    assert!(result.success, "{:?}", result.error_summary);
    assert!(result.error_summary.is_none());
    assert_eq!(
        action_types(&result.action_logs),
        vec!["navigate", "type", "type", "click", "assertion", "assertion"]
    );
    assert_eq!(result.results_of(OperationKind::Step).count(), 4);
    assert_eq!(result.results_of(OperationKind::Assertion).count(), 2);
    assert_eq!(provider.recorder().opens(), 1);
    assert_eq!(provider.recorder().closes(), 1);
}

/// A failing step ends the run: later steps and all assertions are skipped.
#[tokio::test]
async fn test_step_failure_is_fail_fast() {
    let provider = provider(login_browser());
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider.clone(), store(), tx);
    let case = TestCase {
        steps: vec![
            navigate("https://example.com/login"),
            click("#missing"),
            type_into("#username", "demo"),
        ],
        assertions: vec![exists("#login-form"), exists("h1")],
    };

    let result = executor.execute("fail-fast", &case).await;

    assert!(!result.success);
    assert_eq!(action_types(&result.action_logs), vec!["navigate", "click"]);
    assert!(result.action_logs[0].succeeded());
    assert!(!result.action_logs[1].succeeded());
    assert_eq!(count_logs(&result.action_logs, "assertion"), 0);
    assert_eq!(provider.recorder().calls_of("type"), 0);
    assert_eq!(provider.recorder().calls_of("exists"), 0);

    let summary = result.error_summary.unwrap();
    assert!(summary.starts_with("Step 2 (click) failed: Automation failed"), "{summary}");
    assert_eq!(provider.recorder().closes(), 1);
}

/// navigate succeeds, click fails: one passed step log, one failed step log,
/// no assertion log.
#[tokio::test]
async fn test_navigate_then_failing_click_skips_assertions() {
    let browser = MockBrowser::new(MockPage::new("Home").with_element("#go", MockElement::new("button", "Go")))
        .fail_on("click:#go");
    let provider = provider(browser);
    let store = store();
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider.clone(), store.clone(), tx);
    let case = TestCase {
        steps: vec![navigate("https://example.com"), click("#go")],
        assertions: vec![exists("#go")],
    };

    let result = executor.execute("nav-click", &case).await;

    let logs = store.get_action_logs("nav-click").await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs.iter().filter(|e| e.succeeded()).count(), 1);
    assert_eq!(count_failed(&logs), 1);
    assert_eq!(count_logs(&logs, "assertion"), 0);
    assert_eq!(logs, result.action_logs);
    assert_eq!(provider.recorder().closes(), 1);
}

/// Every assertion runs and gets its own log entry, even after a failure.
#[tokio::test]
async fn test_every_assertion_is_logged() {
    let provider = provider(login_browser());
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider.clone(), store(), tx);
    let case = TestCase {
        steps: vec![navigate("https://example.com/login")],
        assertions: vec![
            exists("#login-form"),
            text_equals("h1", "Goodbye"),
            exists("#nope"),
            text_equals("h1", "  Welcome back "),
        ],
    };

    let result = executor.execute("assertions", &case).await;

    assert!(!result.success);
    assert_eq!(count_logs(&result.action_logs, "assertion"), 4);
    let outcomes: Vec<bool> = result
        .results_of(OperationKind::Assertion)
        .map(|r| r.success)
        .collect();
    assert_eq!(outcomes, vec![true, false, false, true]);

    let summary = result.error_summary.unwrap();
    assert!(summary.starts_with("2 of 4 assertions failed: Assertion 2 (text): Assertion failed"), "{summary}");
}

#[tokio::test]
async fn test_count_and_value_assertions() {
    let provider = provider(login_browser());
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider, store(), tx);
    let case: TestCase = serde_json::from_value(json!({
        "steps": [
            { "action": "type", "selector": "#username", "value": "demo" }
        ],
        "assertions": [
            { "type": "count", "selector": "li.item", "expected": 3 },
            { "type": "count", "selector": "li.item", "expected": "3" },
            { "type": "value", "selector": "#username", "expected": "demo" }
        ]
    }))
    .unwrap();

    let result = executor.execute("count", &case).await;

    assert!(result.success, "{:?}", result.error_summary);
}

#[tokio::test]
async fn test_screenshot_step_is_collected() {
    let provider = provider(MockBrowser::blank().with_screenshot(vec![1, 2, 3]));
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider, store(), tx);
    let case = TestCase {
        steps: vec![
            navigate("https://example.com"),
            Step::new(StepAction::Screenshot, "capture"),
        ],
        assertions: vec![],
    };

    let result = executor.execute("shots", &case).await;

    assert!(result.success);
    assert_eq!(result.screenshots.len(), 1);
    assert!(result.screenshots[0].id.starts_with("screenshots/shots/step-2-"));
    assert_eq!(result.screenshots[0].data_base64, "AQID");
}

#[tokio::test(start_paused = true)]
async fn test_wait_step_never_touches_the_browser() {
    let provider = provider(MockBrowser::blank());
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider.clone(), store(), tx);
    let case = TestCase {
        steps: vec![Step::new(StepAction::Wait, "pause").with_timeout(2_000)],
        assertions: vec![],
    };

    let result = executor.execute("wait", &case).await;

    assert!(result.success);
    assert_eq!(result.action_logs[0].result, Some(json!({ "waited_ms": 2000 })));
    assert!(result.action_logs[0].execution_time_ms >= 2_000);
    assert_eq!(provider.recorder().calls(), vec!["open:wait".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_a_long_wait() {
    let provider = provider(MockBrowser::blank());
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider.clone(), store(), tx);
    let case = TestCase {
        steps: vec![
            Step::new(StepAction::Wait, "long pause").with_timeout(600_000),
            Step::new(StepAction::Wait, "never reached").with_timeout(10),
        ],
        assertions: vec![],
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let result = executor.execute_with_cancel("wait-cancel", &case, cancel).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!result.success);
    assert_eq!(result.error_summary.as_deref(), Some("Session was cancelled"));
    assert_eq!(action_types(&result.action_logs), vec!["wait"]);
    assert_eq!(count_failed(&result.action_logs), 1);
    assert_eq!(provider.recorder().closes(), 1);
}

#[tokio::test]
async fn test_unknown_action_fails_validation() {
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider(MockBrowser::blank()), store(), tx);
    let case = TestCase {
        steps: vec![Step::new(StepAction::from_tag("hover"), "hover the menu")],
        assertions: vec![],
    };

    let result = executor.execute("hover", &case).await;

    assert_eq!(
        result.error_summary.as_deref(),
        Some("Step 1 (hover) failed: Validation failed: Unsupported step action 'hover'")
    );
}

#[tokio::test]
async fn test_missing_step_field_fails_validation() {
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider(MockBrowser::blank()), store(), tx);
    let case = TestCase {
        steps: vec![Step::new(StepAction::Navigate, "no url")],
        assertions: vec![],
    };

    let result = executor.execute("no-url", &case).await;

    let summary = result.error_summary.unwrap();
    assert!(summary.starts_with("Step 1 (navigate) failed: Validation failed"), "{summary}");
}

struct CountItems;

#[async_trait]
impl StepHandler for CountItems {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let selector = step
            .selector
            .as_deref()
            .ok_or_else(|| ExecutionError::Validation("selector is required".to_string()))?;
        let count = ctx.automation.element_count(selector).await?;
        Ok(json!({ "count": count }))
    }
}

#[tokio::test]
async fn test_registered_step_handler_extends_the_executor() {
    let mut registry = HandlerRegistry::with_builtins();
    registry.register_step("count_items", CountItems);
    let (tx, _rx) = events();
    let executor = TraditionalExecutor::new(provider(login_browser()), store(), tx)
        .with_registry(Arc::new(registry));
    let case = TestCase {
        steps: vec![Step::new(StepAction::from_tag("count_items"), "count").with_selector("li.item")],
        assertions: vec![],
    };

    let result = executor.execute("ext", &case).await;

    assert!(result.success, "{:?}", result.error_summary);
    assert_eq!(result.action_logs[0].action_type, "count_items");
    assert_eq!(result.action_logs[0].result, Some(json!({ "count": 3 })));
}
