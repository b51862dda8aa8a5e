//! Built-in deterministic judge based on text matching.

use crate::judge::base::{JudgeError, PageJudge};
use async_trait::async_trait;
use sc_protocol::{
    CriteriaEvaluation, CriterionVerdict, GoalDescriptor, PageAnalysis, PageElement, PageSnapshot,
    PlanAction, PlanActionKind,
};

/// Judge that needs no external service.
///
/// - `analyze` keeps the visible elements of the snapshot.
/// - `plan` fills inputs named in the goal context (`{"#selector": "text"}`),
///   clicks elements whose text occurs in the goal, then verifies.
/// - `evaluate` treats each criterion as text that must occur on the page.
///   When a criterion contains double-quoted phrases, only those phrases
///   must occur.
#[derive(Debug, Clone, Default)]
pub struct KeywordJudge;

impl KeywordJudge {
    pub fn new() -> Self {
        Self
    }

    fn page_text(snapshot: &PageSnapshot) -> String {
        let mut text = format!("{}\n{}", snapshot.title, snapshot.content);
        for element in snapshot.elements.iter().filter(|e| e.visible) {
            text.push('\n');
            text.push_str(&element.text);
        }
        text.to_lowercase()
    }

    fn needles(criterion: &str) -> Vec<String> {
        // Every other segment between double quotes is a quoted phrase.
        let quoted: Vec<String> = criterion
            .split('"')
            .skip(1)
            .step_by(2)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if quoted.is_empty() {
            vec![criterion.trim().to_lowercase()]
        } else {
            quoted
        }
    }

    fn is_input(element: &PageElement) -> bool {
        matches!(
            element.role.as_str(),
            "textbox" | "input" | "textarea" | "searchbox" | "combobox"
        )
    }
}

#[async_trait]
impl PageJudge for KeywordJudge {
    async fn analyze(
        &self,
        snapshot: &PageSnapshot,
        _goal: &GoalDescriptor,
    ) -> Result<PageAnalysis, JudgeError> {
        let actionable: Vec<PageElement> = snapshot
            .elements
            .iter()
            .filter(|e| e.visible)
            .cloned()
            .collect();
        let hidden = snapshot.elements.len() - actionable.len();

        let mut notes = Vec::new();
        if hidden > 0 {
            notes.push(format!("{hidden} hidden elements ignored"));
        }
        Ok(PageAnalysis {
            summary: format!(
                "{} ({}): {} actionable elements",
                snapshot.title,
                snapshot.url,
                actionable.len()
            ),
            actionable,
            notes,
        })
    }

    async fn plan(
        &self,
        analysis: &PageAnalysis,
        goal: &GoalDescriptor,
    ) -> Result<Vec<PlanAction>, JudgeError> {
        let goal_text = goal.goal.to_lowercase();
        let mut plan = Vec::new();

        if let Some(inputs) = goal.context.as_object() {
            for element in analysis.actionable.iter().filter(|e| Self::is_input(e)) {
                if let Some(text) = inputs.get(&element.selector).and_then(|v| v.as_str()) {
                    plan.push(
                        PlanAction::new(PlanActionKind::TypeText)
                            .with_selector(&element.selector)
                            .with_text(text)
                            .with_description(format!("Fill {}", element.selector)),
                    );
                }
            }
        }

        for element in analysis.actionable.iter().filter(|e| !Self::is_input(e)) {
            let label = element.text.trim().to_lowercase();
            if !label.is_empty() && goal_text.contains(&label) {
                plan.push(
                    PlanAction::new(PlanActionKind::ClickElement)
                        .with_selector(&element.selector)
                        .with_description(format!("Click '{}'", element.text.trim())),
                );
            }
        }

        plan.push(PlanAction::new(PlanActionKind::VerifySuccess).with_description("Check success criteria"));
        Ok(plan)
    }

    async fn evaluate(
        &self,
        snapshot: &PageSnapshot,
        criteria: &[String],
    ) -> Result<CriteriaEvaluation, JudgeError> {
        let page = Self::page_text(snapshot);
        let verdicts = criteria
            .iter()
            .map(|criterion| {
                let missing: Vec<String> = Self::needles(criterion)
                    .into_iter()
                    .filter(|needle| !page.contains(needle.as_str()))
                    .collect();
                CriterionVerdict {
                    criterion: criterion.clone(),
                    satisfied: missing.is_empty(),
                    detail: if missing.is_empty() {
                        "found on page".to_string()
                    } else {
                        format!("not found on page: {}", missing.join(", "))
                    },
                }
            })
            .collect();
        Ok(CriteriaEvaluation::from_verdicts(verdicts))
    }
}
