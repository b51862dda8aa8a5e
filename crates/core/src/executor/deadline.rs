//! Run deadline and cancellation.

use crate::error::{ExecResult, ExecutionError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on a run plus the operator's cancellation token.
///
/// [`Deadline::run`] races an operation against both, so an in-flight
/// automation or judge call is interrupted when either fires.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Option<Instant>,
    timeout_ms: u64,
    cancel: CancellationToken,
}

impl Deadline {
    /// A deadline `timeout_ms` from now.
    pub fn after(timeout_ms: u64, cancel: CancellationToken) -> Self {
        Self {
            at: Some(Instant::now() + Duration::from_millis(timeout_ms)),
            timeout_ms,
            cancel,
        }
    }

    /// No time limit; only cancellation applies.
    pub fn unbounded(cancel: CancellationToken) -> Self {
        Self {
            at: None,
            timeout_ms: 0,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail if the run was cancelled or the deadline has passed.
    pub fn check(&self) -> ExecResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        match self.at {
            Some(at) if Instant::now() >= at => Err(ExecutionError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
            _ => Ok(()),
        }
    }

    /// Run `operation` unless cancellation or the deadline comes first.
    pub async fn run<T, F>(&self, operation: F) -> ExecResult<T>
    where
        F: Future<Output = ExecResult<T>>,
    {
        self.check()?;
        let expired = async {
            match self.at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ExecutionError::Cancelled),
            _ = expired => Err(ExecutionError::Timeout { timeout_ms: self.timeout_ms }),
            result = operation => result,
        }
    }
}
