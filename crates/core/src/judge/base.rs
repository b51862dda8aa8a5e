//! Base judge trait and error type.

use async_trait::async_trait;
use sc_protocol::{CriteriaEvaluation, GoalDescriptor, PageAnalysis, PageSnapshot, PlanAction};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JudgeError {
    #[error("Judge not available: {0}")]
    NotAvailable(String),
    #[error("Judge failed: {0}")]
    Failed(String),
    #[error("Invalid judge response: {0}")]
    InvalidResponse(String),
}

/// Pluggable judgment over page state.
///
/// Contract for `evaluate`: given a snapshot and the criteria, report
/// satisfied or unsatisfied with a verdict per criterion. Partial
/// satisfaction is unsatisfied.
#[async_trait]
pub trait PageJudge: Send + Sync {
    async fn analyze(
        &self,
        snapshot: &PageSnapshot,
        goal: &GoalDescriptor,
    ) -> Result<PageAnalysis, JudgeError>;

    async fn plan(
        &self,
        analysis: &PageAnalysis,
        goal: &GoalDescriptor,
    ) -> Result<Vec<PlanAction>, JudgeError>;

    async fn evaluate(
        &self,
        snapshot: &PageSnapshot,
        criteria: &[String],
    ) -> Result<CriteriaEvaluation, JudgeError>;
}
