//! Open registry of step and assertion handlers keyed by tag.

use crate::automation::AutomationHandle;
use crate::error::{ExecResult, ExecutionError};
use crate::executor::handlers;
use async_trait::async_trait;
use sc_protocol::{Assertion, ExecutorSettings, Screenshot, Step};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a step handler may touch while it runs.
pub struct StepContext<'a> {
    pub session_id: &'a str,
    /// Zero-based position of the step in its test case.
    pub index: usize,
    pub automation: &'a mut AutomationHandle,
    pub settings: &'a ExecutorSettings,
    pub screenshots: &'a mut Vec<Screenshot>,
}

/// What an assertion handler may touch while it runs.
pub struct AssertionContext<'a> {
    pub session_id: &'a str,
    pub index: usize,
    pub automation: &'a mut AutomationHandle,
}

/// Executes one kind of step. The returned value becomes the log entry's result.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value>;
}

/// Checks one kind of assertion. A mismatch is `ExecutionError::Assertion`.
#[async_trait]
pub trait AssertionHandler: Send + Sync {
    async fn check(&self, assertion: &Assertion, ctx: &mut AssertionContext<'_>) -> ExecResult<Value>;
}

/// Handlers for every step action and assertion kind the executor knows.
///
/// New kinds are added with [`HandlerRegistry::register_step`] and
/// [`HandlerRegistry::register_assertion`]; a tag without a handler fails
/// validation.
#[derive(Clone)]
pub struct HandlerRegistry {
    steps: HashMap<String, Arc<dyn StepHandler>>,
    assertions: HashMap<String, Arc<dyn AssertionHandler>>,
}

impl HandlerRegistry {
    /// A registry without any handlers.
    pub fn empty() -> Self {
        Self {
            steps: HashMap::new(),
            assertions: HashMap::new(),
        }
    }

    /// A registry with the built-in handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_step("navigate", handlers::Navigate);
        registry.register_step("click", handlers::Click);
        registry.register_step("type", handlers::TypeText);
        registry.register_step("select", handlers::SelectOption);
        registry.register_step("wait", handlers::Wait);
        registry.register_step("screenshot", handlers::TakeScreenshot);
        registry.register_step("custom", handlers::CustomStep);

        registry.register_assertion("exists", handlers::Exists);
        registry.register_assertion("visible", handlers::Visible);
        registry.register_assertion("text", handlers::TextEquals);
        registry.register_assertion("value", handlers::ValueEquals);
        registry.register_assertion("count", handlers::CountEquals);
        registry.register_assertion("custom", handlers::CustomAssertion);
        registry
    }

    /// Register (or replace) the handler for a step tag.
    pub fn register_step(&mut self, tag: impl Into<String>, handler: impl StepHandler + 'static) {
        self.steps.insert(tag.into(), Arc::new(handler));
    }

    /// Register (or replace) the handler for an assertion tag.
    pub fn register_assertion(
        &mut self,
        tag: impl Into<String>,
        handler: impl AssertionHandler + 'static,
    ) {
        self.assertions.insert(tag.into(), Arc::new(handler));
    }

    pub fn step_handler(&self, tag: &str) -> ExecResult<Arc<dyn StepHandler>> {
        self.steps
            .get(tag)
            .cloned()
            .ok_or_else(|| ExecutionError::Validation(format!("Unsupported step action '{tag}'")))
    }

    pub fn assertion_handler(&self, tag: &str) -> ExecResult<Arc<dyn AssertionHandler>> {
        self.assertions
            .get(tag)
            .cloned()
            .ok_or_else(|| ExecutionError::Validation(format!("Unsupported assertion type '{tag}'")))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
