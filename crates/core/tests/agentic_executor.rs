//! Goal-directed runs with scripted and keyword judges.

mod common;

use common::*;
use sc_core::automation::adapters::{MockBrowser, MockElement, MockPage};
use sc_core::executor::AgenticExecutor;
use sc_core::judge::{KeywordJudge, ScriptedJudge};
use sc_core::storage::TestStore;
use sc_protocol::{GoalDescriptor, OperationKind, PlanAction, PlanActionKind};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A page holding `#step-1` .. `#step-n`, the targets of `ScriptedJudge::clicks`.
fn steps_browser(n: usize) -> MockBrowser {
    let page = (1..=n).fold(MockPage::new("Steps"), |page, i| {
        page.with_element(format!("#step-{i}"), MockElement::new("button", format!("Step {i}")))
    });
    MockBrowser::new(page)
}

fn goal(max_attempts: u32) -> GoalDescriptor {
    GoalDescriptor::new("Reach the end", vec!["Finished".to_string()])
        .with_url("https://example.com/steps")
        .with_max_attempts(max_attempts)
}

#[tokio::test]
async fn test_every_attempt_is_logged_until_the_budget_is_spent() {
    let judge = Arc::new(ScriptedJudge::new(ScriptedJudge::clicks(1)));
    let provider = provider(steps_browser(1));
    let store = store();
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store.clone(), judge.clone(), tx);

    let result = executor.execute("budget", &goal(3)).await;

    assert!(!result.success);
    assert_eq!(count_logs(&result.action_logs, "attempt"), 3);
    assert_eq!(result.results_of(OperationKind::Attempt).count(), 3);
    assert_eq!(
        result.error_summary.as_deref(),
        Some("Goal not achieved after 3 attempts: Reach the end")
    );
    assert_eq!(judge.plan_calls(), 3);
    // One capability for the whole run, navigated once.
    assert_eq!(count_logs(&result.action_logs, "navigate"), 1);
    assert_eq!(provider.recorder().opens(), 1);
    assert_eq!(provider.recorder().closes(), 1);
    assert_eq!(store.get_action_logs("budget").await.unwrap(), result.action_logs);
}

/// Criteria are checked after every action; the run stops as soon as they hold.
#[tokio::test]
async fn test_run_stops_after_the_action_that_satisfies_the_criteria() {
    let judge = Arc::new(ScriptedJudge::new(ScriptedJudge::clicks(3)).satisfied_on(2));
    let provider = provider(steps_browser(3));
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store(), judge.clone(), tx);

    let result = executor.execute("early-exit", &goal(3)).await;

    assert!(result.success, "{:?}", result.error_summary);
    assert!(result.error_summary.is_none());
    assert_eq!(
        action_types(&result.action_logs),
        vec![
            "navigate",
            "snapshot",
            "analyze",
            "plan",
            "click_element",
            "criteria_check",
            "click_element",
            "criteria_check",
            "attempt",
        ]
    );
    assert_eq!(provider.recorder().calls_of("click"), 2);
    assert_eq!(provider.recorder().calls_of("click:#step-3"), 0);
    assert_eq!(judge.evaluate_calls(), 2);
    assert_eq!(judge.plan_calls(), 1);
}

#[tokio::test]
async fn test_keyword_judge_follows_the_matching_link() {
    let provider = provider(pricing_browser());
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store(), Arc::new(KeywordJudge::new()), tx);

    let result = executor.execute("pricing", &pricing_goal()).await;

    assert!(result.success, "{:?}", result.error_summary);
    assert_eq!(provider.recorder().calls_of("click:#pricing"), 1);
    assert_eq!(provider.recorder().calls_of("click:#about"), 0);
    assert_eq!(count_logs(&result.action_logs, "attempt"), 1);
}

/// A failed capability call disposes the capability; the next attempt opens
/// a fresh one.
#[tokio::test]
async fn test_automation_failure_reopens_on_next_attempt() {
    let judge = Arc::new(ScriptedJudge::new(ScriptedJudge::clicks(1)).satisfied_on(1));
    let provider = provider(steps_browser(1).fail_times("click", 1));
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store(), judge, tx);

    let result = executor.execute("reopen", &goal(2)).await;

    assert!(result.success, "{:?}", result.error_summary);
    let attempts: Vec<bool> = result
        .results_of(OperationKind::Attempt)
        .map(|r| r.success)
        .collect();
    assert_eq!(attempts, vec![false, true]);
    assert_eq!(provider.recorder().opens(), 2);
    assert_eq!(provider.recorder().closes(), 2);
    assert_eq!(count_logs(&result.action_logs, "navigate"), 2);
}

#[tokio::test]
async fn test_last_attempt_error_is_summarized() {
    let judge = Arc::new(ScriptedJudge::new(ScriptedJudge::clicks(1)).failing_analysis(5));
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider(steps_browser(1)), store(), judge, tx);

    let result = executor.execute("analysis", &goal(2)).await;

    assert!(!result.success);
    let summary = result.error_summary.unwrap();
    assert!(summary.starts_with("Attempt 2 of 2 failed: Analysis failed"), "{summary}");
    assert_eq!(count_logs(&result.action_logs, "analyze"), 2);
    assert_eq!(count_failed(&result.action_logs), 4);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_the_run() {
    let judge = Arc::new(ScriptedJudge::new(ScriptedJudge::clicks(1)));
    let provider = provider(steps_browser(1).with_delay(Duration::from_secs(10)));
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store(), judge.clone(), tx);

    let result = executor
        .execute("deadline", &goal(5).with_timeout_ms(1_000))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error_summary.as_deref(),
        Some("Run exceeded its deadline of 1000 ms")
    );
    assert_eq!(count_logs(&result.action_logs, "attempt"), 1);
    assert_eq!(judge.analyze_calls(), 0);
    assert_eq!(provider.recorder().closes(), 1);
}

#[tokio::test]
async fn test_cancelled_run_makes_no_attempt() {
    let judge = Arc::new(ScriptedJudge::new(ScriptedJudge::clicks(1)));
    let provider = provider(steps_browser(1));
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store(), judge.clone(), tx);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = executor.execute_with_cancel("cancelled", &goal(3), cancel).await;

    assert_eq!(result.error_summary.as_deref(), Some("Session was cancelled"));
    assert!(result.action_logs.is_empty());
    assert_eq!(provider.recorder().opens(), 0);
}

#[tokio::test]
async fn test_plan_actions_cover_navigation_typing_and_screenshots() {
    let page = MockPage::new("Search")
        .with_element("#q", MockElement::new("searchbox", ""))
        .with_element("#results", MockElement::new("list", "Results"));
    let plan = vec![
        PlanAction::new(PlanActionKind::NavigateTo).with_url("https://example.com/search"),
        PlanAction::new(PlanActionKind::TypeText)
            .with_selector("#q")
            .with_text("rust"),
        PlanAction::new(PlanActionKind::WaitForElement).with_selector("#results"),
        PlanAction::new(PlanActionKind::TakeScreenshot),
        PlanAction::new(PlanActionKind::AnalyzePage),
    ];
    let judge = Arc::new(ScriptedJudge::new(plan));
    let provider = provider(MockBrowser::new(page));
    let (tx, _rx) = events();
    let executor = AgenticExecutor::new(provider.clone(), store(), judge, tx);

    let result = executor.execute("actions", &goal(1)).await;

    assert_eq!(
        result.error_summary.as_deref(),
        Some("Goal not achieved after 1 attempts: Reach the end")
    );
    assert_eq!(count_logs(&result.action_logs, "criteria_check"), 5);
    assert_eq!(count_failed(&result.action_logs), 0);
    assert_eq!(result.screenshots.len(), 1);
    assert!(result.screenshots[0]
        .id
        .starts_with("screenshots/actions/attempt-1-action-4-"));
    assert_eq!(provider.recorder().calls_of("type:#q"), 1);
    assert_eq!(provider.recorder().calls_of("navigate:https://example.com/search"), 1);
}
