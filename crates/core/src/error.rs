//! Error kinds raised while executing steps, assertions and attempts.
//!
//! Executors never return these to their caller: every error is logged to
//! the action log and folded into the `error_summary` of a failed
//! `ExecutionResult`.

use crate::automation::AutomationError;
use crate::judge::JudgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// A required step, assertion, plan-action or goal field is missing.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The automation capability call failed.
    #[error("Automation failed: {0}")]
    Automation(String),

    /// A goal-directed run exceeded its deadline.
    #[error("Run exceeded its deadline of {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// An expectation did not hold.
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// The judge capability could not analyze, plan or evaluate.
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// An operator cancelled the session.
    #[error("Session was cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Errors after which a goal-directed run must stop retrying.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. } | ExecutionError::Cancelled)
    }
}

impl From<AutomationError> for ExecutionError {
    fn from(error: AutomationError) -> Self {
        ExecutionError::Automation(error.to_string())
    }
}

impl From<JudgeError> for ExecutionError {
    fn from(error: JudgeError) -> Self {
        ExecutionError::Analysis(error.to_string())
    }
}

/// Result type for executor internals.
pub type ExecResult<T> = Result<T, ExecutionError>;
