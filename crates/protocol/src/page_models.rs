//! Page state and judgment records exchanged with the judge capability.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An element the automation capability reports in a snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(default)]
pub struct PageElement {
    pub selector: String,
    /// Accessibility role or tag name (`button`, `link`, `textbox`, ...).
    pub role: String,
    pub text: String,
    pub visible: bool,
}

/// Representation of the current page returned by `snapshot()`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    /// Visible text or accessibility tree rendered as text.
    pub content: String,
    pub elements: Vec<PageElement>,
}

/// Abstract description of a page produced by the judge's analysis step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(default)]
pub struct PageAnalysis {
    pub summary: String,
    /// Elements the planner may act on.
    pub actionable: Vec<PageElement>,
    pub notes: Vec<String>,
}

/// Judgment for a single success criterion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CriterionVerdict {
    pub criterion: String,
    pub satisfied: bool,
    #[serde(default)]
    pub detail: String,
}

/// Pass/fail judgment over a whole criteria set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct CriteriaEvaluation {
    /// True only if every criterion is satisfied.
    pub satisfied: bool,
    #[serde(default)]
    pub verdicts: Vec<CriterionVerdict>,
}

impl CriteriaEvaluation {
    /// Build an evaluation from per-criterion verdicts.
    ///
    /// Partial satisfaction never counts: an empty verdict list is not
    /// satisfied either.
    pub fn from_verdicts(verdicts: Vec<CriterionVerdict>) -> Self {
        let satisfied = !verdicts.is_empty() && verdicts.iter().all(|v| v.satisfied);
        Self {
            satisfied,
            verdicts,
        }
    }

    /// Criteria that did not hold.
    pub fn unmet(&self) -> Vec<&str> {
        self.verdicts
            .iter()
            .filter(|v| !v.satisfied)
            .map(|v| v.criterion.as_str())
            .collect()
    }
}
