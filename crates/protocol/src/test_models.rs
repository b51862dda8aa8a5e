//! Test instruction models: steps, assertions, goal descriptors and plan actions.
//!
//! Step actions and assertion kinds are open sets: the tags listed in the
//! enums are built in, any other tag deserializes into the `Extension`
//! variant and is dispatched through the executor's handler registry.

use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

/// Default attempt budget for goal-directed runs.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wall-clock budget for goal-directed runs.
pub const DEFAULT_GOAL_TIMEOUT_MS: u64 = 300_000;

/// The action a deterministic step performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepAction {
    Navigate,
    Click,
    Type,
    Select,
    Wait,
    Screenshot,
    Custom,
    /// A tag with no built-in handler.
    Extension(String),
}

impl StepAction {
    /// The registry key for this action.
    pub fn tag(&self) -> &str {
        match self {
            StepAction::Navigate => "navigate",
            StepAction::Click => "click",
            StepAction::Type => "type",
            StepAction::Select => "select",
            StepAction::Wait => "wait",
            StepAction::Screenshot => "screenshot",
            StepAction::Custom => "custom",
            StepAction::Extension(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "navigate" => StepAction::Navigate,
            "click" => StepAction::Click,
            "type" => StepAction::Type,
            "select" => StepAction::Select,
            "wait" => StepAction::Wait,
            "screenshot" => StepAction::Screenshot,
            "custom" => StepAction::Custom,
            _ => StepAction::Extension(tag.trim().to_string()),
        }
    }
}

impl Serialize for StepAction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for StepAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(StepAction::from_tag(&tag))
    }
}

/// One deterministic step.
///
/// Which optional fields are required depends on the action: `navigate`
/// needs `url`; `click` needs `selector`; `type` and `select` need both
/// `selector` and `value`. Missing fields are reported when the step runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Step {
    #[ts(type = "string")]
    pub action: StepAction,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Milliseconds; used by `wait`.
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
}

impl Step {
    /// A step with only the action set.
    pub fn new(action: StepAction, description: impl Into<String>) -> Self {
        Self {
            action,
            selector: None,
            value: None,
            url: None,
            timeout: None,
            description: description.into(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}

/// The check an assertion performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssertionKind {
    Exists,
    Visible,
    Text,
    Value,
    Count,
    Custom,
    /// A tag with no built-in handler.
    Extension(String),
}

impl AssertionKind {
    /// The registry key for this assertion kind.
    pub fn tag(&self) -> &str {
        match self {
            AssertionKind::Exists => "exists",
            AssertionKind::Visible => "visible",
            AssertionKind::Text => "text",
            AssertionKind::Value => "value",
            AssertionKind::Count => "count",
            AssertionKind::Custom => "custom",
            AssertionKind::Extension(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "exists" => AssertionKind::Exists,
            "visible" => AssertionKind::Visible,
            "text" => AssertionKind::Text,
            "value" => AssertionKind::Value,
            "count" => AssertionKind::Count,
            "custom" => AssertionKind::Custom,
            _ => AssertionKind::Extension(tag.trim().to_string()),
        }
    }
}

impl Serialize for AssertionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for AssertionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(AssertionKind::from_tag(&tag))
    }
}

/// One expectation checked after all steps succeeded.
///
/// `expected` is a string for `text`/`value` and an integer for `count`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Assertion {
    #[serde(rename = "type")]
    #[ts(type = "string")]
    pub kind: AssertionKind,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,

    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
}

impl Assertion {
    pub fn new(kind: AssertionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            selector: None,
            expected: None,
            description: description.into(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<serde_json::Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

/// Instructions of a deterministic configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct TestCase {
    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_goal_timeout() -> u64 {
    DEFAULT_GOAL_TIMEOUT_MS
}

fn max_attempts_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::opt_u64(deserializer)?
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(DEFAULT_MAX_ATTEMPTS))
}

fn timeout_or_default<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::opt_u64(deserializer)?.unwrap_or(DEFAULT_GOAL_TIMEOUT_MS))
}

/// Instructions of a goal-directed configuration.
///
/// # Example
///
/// ```json
/// {
///   "goal": "Sign in as the demo user",
///   "context": "Credentials are demo / demo",
///   "success_criteria": ["Welcome, demo", "Sign out"],
///   "max_attempts": 3,
///   "timeout_ms": 120000
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct GoalDescriptor {
    pub goal: String,

    /// Free-form background for the judge.
    #[serde(default)]
    pub context: serde_json::Value,

    /// Every criterion must hold for the goal to count as met.
    #[serde(default, alias = "successCriteria", deserialize_with = "lenient::string_list")]
    pub success_criteria: Vec<String>,

    #[serde(
        default = "default_max_attempts",
        alias = "maxAttempts",
        deserialize_with = "max_attempts_or_default"
    )]
    pub max_attempts: u32,

    #[serde(
        default = "default_goal_timeout",
        alias = "timeoutMs",
        alias = "timeout",
        deserialize_with = "timeout_or_default"
    )]
    pub timeout_ms: u64,

    /// Page the run starts from. Filled from the session URL when absent.
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl GoalDescriptor {
    pub fn new(goal: impl Into<String>, success_criteria: Vec<String>) -> Self {
        Self {
            goal: goal.into(),
            context: serde_json::Value::Null,
            success_criteria,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_ms: DEFAULT_GOAL_TIMEOUT_MS,
            url: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<serde_json::Value>) -> Self {
        self.context = context.into();
        self
    }
}

/// Run limits a goal payload sets itself. Missing or malformed values are `None`.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalLimits {
    #[serde(default, alias = "maxAttempts", deserialize_with = "lenient::opt_u64")]
    pub max_attempts: Option<u64>,

    #[serde(default, alias = "timeoutMs", alias = "timeout", deserialize_with = "lenient::opt_u64")]
    pub timeout_ms: Option<u64>,
}

/// Kinds of action a goal-directed plan may contain.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum PlanActionKind {
    AnalyzePage,
    TakeScreenshot,
    ClickElement,
    TypeText,
    NavigateTo,
    WaitForElement,
    VerifySuccess,
}

impl PlanActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanActionKind::AnalyzePage => "analyze_page",
            PlanActionKind::TakeScreenshot => "take_screenshot",
            PlanActionKind::ClickElement => "click_element",
            PlanActionKind::TypeText => "type_text",
            PlanActionKind::NavigateTo => "navigate_to",
            PlanActionKind::WaitForElement => "wait_for_element",
            PlanActionKind::VerifySuccess => "verify_success",
        }
    }
}

/// One action of a plan derived by the judge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PlanAction {
    pub kind: PlanActionKind,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
}

impl PlanAction {
    pub fn new(kind: PlanActionKind) -> Self {
        Self {
            kind,
            selector: None,
            text: None,
            url: None,
            timeout_ms: None,
            description: String::new(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
