//! Scripted judge for testing.

use crate::judge::base::{JudgeError, PageJudge};
use async_trait::async_trait;
use sc_protocol::{
    CriteriaEvaluation, CriterionVerdict, GoalDescriptor, PageAnalysis, PageSnapshot, PlanAction,
    PlanActionKind,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Judge whose answers are fixed up front.
///
/// Plans are handed out one per `plan` call; the last one repeats once the
/// queue is drained. `evaluate` reports satisfied from the `n`th call on
/// when built with [`ScriptedJudge::satisfied_on`], never otherwise.
#[derive(Debug, Default)]
pub struct ScriptedJudge {
    plans: Mutex<VecDeque<Vec<PlanAction>>>,
    last_plan: Mutex<Vec<PlanAction>>,
    satisfied_from: Option<usize>,
    analyze_failures: AtomicUsize,
    analyze_calls: AtomicUsize,
    plan_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
}

impl ScriptedJudge {
    /// A judge that plans `plan` on every attempt and is never satisfied.
    pub fn new(plan: Vec<PlanAction>) -> Self {
        Self::with_plans(vec![plan])
    }

    pub fn with_plans(plans: Vec<Vec<PlanAction>>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            ..Self::default()
        }
    }

    /// Plan of `n` clicks on `#step-1` .. `#step-n`.
    pub fn clicks(n: usize) -> Vec<PlanAction> {
        (1..=n)
            .map(|i| PlanAction::new(PlanActionKind::ClickElement).with_selector(format!("#step-{i}")))
            .collect()
    }

    /// The `n`th and later `evaluate` calls (1-based) are satisfied.
    pub fn satisfied_on(mut self, n: usize) -> Self {
        self.satisfied_from = Some(n);
        self
    }

    /// The next `times` `analyze` calls fail.
    pub fn failing_analysis(self, times: usize) -> Self {
        self.analyze_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageJudge for ScriptedJudge {
    async fn analyze(
        &self,
        snapshot: &PageSnapshot,
        _goal: &GoalDescriptor,
    ) -> Result<PageAnalysis, JudgeError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .analyze_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(JudgeError::Failed("Scripted analysis failure".to_string()));
        }
        Ok(PageAnalysis {
            summary: snapshot.title.clone(),
            actionable: snapshot.elements.clone(),
            notes: Vec::new(),
        })
    }

    async fn plan(
        &self,
        _analysis: &PageAnalysis,
        _goal: &GoalDescriptor,
    ) -> Result<Vec<PlanAction>, JudgeError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .plans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let mut last = self
            .last_plan
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(plan) = next {
            *last = plan;
        }
        Ok(last.clone())
    }

    async fn evaluate(
        &self,
        _snapshot: &PageSnapshot,
        criteria: &[String],
    ) -> Result<CriteriaEvaluation, JudgeError> {
        let call = self.evaluate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let satisfied = self.satisfied_from.is_some_and(|n| call >= n);
        let verdicts = criteria
            .iter()
            .map(|c| CriterionVerdict {
                criterion: c.clone(),
                satisfied,
                detail: format!("evaluation #{call}"),
            })
            .collect();
        Ok(CriteriaEvaluation::from_verdicts(verdicts))
    }
}
