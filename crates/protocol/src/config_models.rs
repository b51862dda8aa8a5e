//! Configuration models: stored test configurations and `.sitecheck/config.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Which executor a configuration (or session) runs under.
///
/// The source domain called these "traditional" and "agentic"; both spellings
/// are accepted on input.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Explicit steps followed by assertions.
    #[serde(alias = "traditional")]
    Deterministic,

    /// Bounded retry loop against natural-language success criteria.
    #[serde(alias = "agentic", alias = "goal-directed")]
    GoalDirected,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Deterministic => "deterministic",
            TestKind::GoalDirected => "goal_directed",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "traditional" => Ok(TestKind::Deterministic),
            "goal_directed" | "goal-directed" | "agentic" => Ok(TestKind::GoalDirected),
            other => Err(format!("unknown test kind '{other}'")),
        }
    }
}

fn default_active() -> bool {
    true
}

/// A URL-scoped test configuration.
///
/// Configurations are loaded from `.sitecheck/configurations/*.yaml` and
/// `.sitecheck/goals/*.md`, or registered through a store. The resolver picks
/// the most specific active configuration for a target URL.
///
/// # Example
///
/// ```yaml
/// id: login-smoke
/// name: Login page smoke test
/// url_pattern: example.com/login
/// test_kind: deterministic
/// instructions:
///   steps:
///     - action: navigate
///       url: https://example.com/login
///       description: Open the login page
///   assertions:
///     - type: exists
///       selector: "#login-form"
///       description: Login form is rendered
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct TestConfiguration {
    /// Unique identifier of the configuration.
    pub id: String,

    /// Substring of the target URL, or a pattern containing `*` wildcards.
    #[serde(alias = "urlPattern")]
    pub url_pattern: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Opaque instruction payload: a step/assertion list for deterministic
    /// configurations, a goal descriptor for goal-directed ones.
    #[serde(default)]
    pub instructions: serde_json::Value,

    /// Executor this configuration is written for.
    #[serde(alias = "testType", alias = "test_type")]
    pub test_kind: TestKind,

    /// Inactive configurations are never selected by the resolver.
    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
}

/// Executor tuning from the `[executor]` table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Pause used by `wait` steps that carry no timeout.
    pub default_wait_ms: u64,

    /// Upper bound for `wait_for_element` plan actions without a timeout.
    pub element_timeout_ms: u64,

    /// Attempt budget applied when a goal descriptor omits `max_attempts`.
    pub default_max_attempts: u32,

    /// Wall-clock budget applied when a goal descriptor omits `timeout_ms`.
    pub default_timeout_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            default_wait_ms: 5_000,
            element_timeout_ms: 5_000,
            default_max_attempts: 3,
            default_timeout_ms: 300_000,
        }
    }
}

/// An external command the core talks to over stdin/stdout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CommandSettings {
    /// Executable name or path.
    pub command: String,

    /// Extra arguments passed on every spawn.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Where run artifacts are persisted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for sessions, action logs and results. Relative paths are
    /// resolved against the project root. Defaults to `.sitecheck/runs`.
    pub dir: Option<String>,
}

/// Represents global settings from `.sitecheck/config.toml`.
///
/// # Example
///
/// ```toml
/// [executor]
/// default_wait_ms = 5000
/// default_max_attempts = 3
///
/// [automation]
/// command = "sitecheck-driver"
/// args = ["--headless"]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(default)]
pub struct GlobalConfig {
    pub executor: ExecutorSettings,

    /// Browser driver process. Without it only `--dry-run` runs are possible.
    pub automation: Option<CommandSettings>,

    /// External judgment command. The built-in keyword judge is used otherwise.
    pub judge: Option<CommandSettings>,

    pub storage: StorageSettings,
}
