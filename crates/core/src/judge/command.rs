//! Judge that delegates every request to an external command.
//!
//! The command receives one JSON document on stdin:
//!
//! ```json
//! {"op": "evaluate", "snapshot": {...}, "criteria": ["Welcome"]}
//! ```
//!
//! and prints JSON lines on stdout. The last well-formed line is the answer:
//! a `PageAnalysis` for `analyze`, a list of `PlanAction`s (bare or under
//! `actions`) for `plan`, a `CriteriaEvaluation` for `evaluate`.

use crate::judge::base::{JudgeError, PageJudge};
use crate::judge::cli_executor::CliExecutor;
use async_trait::async_trait;
use sc_protocol::{
    CommandSettings, CriteriaEvaluation, GoalDescriptor, PageAnalysis, PageSnapshot, PlanAction,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tracing::debug;

pub struct CommandJudge {
    settings: CommandSettings,
    working_dir: Option<PathBuf>,
}

impl CommandJudge {
    pub fn new(settings: CommandSettings) -> Self {
        Self {
            settings,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    async fn request(&self, payload: Value) -> Result<Value, JudgeError> {
        let mut stream = CliExecutor::execute(
            self.settings.command.clone(),
            self.settings.args.clone(),
            self.working_dir.clone(),
            Some(payload.to_string()),
        );

        let mut last = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => last = Some(value),
                Err(JudgeError::InvalidResponse(msg)) => debug!(%msg, "Ignoring judge output line"),
                Err(e) => return Err(e),
            }
        }
        last.ok_or_else(|| JudgeError::InvalidResponse("Judge produced no JSON output".to_string()))
    }

    fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, JudgeError> {
        serde_json::from_value(value)
            .map_err(|e| JudgeError::InvalidResponse(format!("Invalid {what}: {e}")))
    }
}

#[async_trait]
impl PageJudge for CommandJudge {
    async fn analyze(
        &self,
        snapshot: &PageSnapshot,
        goal: &GoalDescriptor,
    ) -> Result<PageAnalysis, JudgeError> {
        let value = self
            .request(json!({ "op": "analyze", "snapshot": snapshot, "goal": goal }))
            .await?;
        Self::decode(value, "analysis")
    }

    async fn plan(
        &self,
        analysis: &PageAnalysis,
        goal: &GoalDescriptor,
    ) -> Result<Vec<PlanAction>, JudgeError> {
        let mut value = self
            .request(json!({ "op": "plan", "analysis": analysis, "goal": goal }))
            .await?;
        if let Some(actions) = value.get_mut("actions") {
            value = actions.take();
        }
        Self::decode(value, "plan")
    }

    async fn evaluate(
        &self,
        snapshot: &PageSnapshot,
        criteria: &[String],
    ) -> Result<CriteriaEvaluation, JudgeError> {
        let value = self
            .request(json!({ "op": "evaluate", "snapshot": snapshot, "criteria": criteria }))
            .await?;
        let evaluation: CriteriaEvaluation = Self::decode(value, "evaluation")?;
        if evaluation.verdicts.is_empty() {
            Ok(evaluation)
        } else {
            // Per-criterion verdicts decide; a stray top-level flag cannot
            // turn partial satisfaction into success.
            Ok(CriteriaEvaluation::from_verdicts(evaluation.verdicts))
        }
    }
}
