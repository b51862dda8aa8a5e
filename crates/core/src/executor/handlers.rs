//! Built-in step and assertion handlers.

use crate::error::{ExecResult, ExecutionError};
use crate::executor::registry::{AssertionContext, AssertionHandler, StepContext, StepHandler};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use sc_protocol::{Assertion, Screenshot, Step};
use serde_json::{json, Value};
use std::time::Duration;

/// A required, non-empty string field.
pub(crate) fn required<'a>(field: Option<&'a str>, name: &str, what: &str) -> ExecResult<&'a str> {
    match field.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ExecutionError::Validation(format!("{what} requires '{name}'"))),
    }
}

/// Expected string of a text/value assertion. Scalars are accepted as text.
fn expected_text(assertion: &Assertion) -> ExecResult<String> {
    match &assertion.expected {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(ExecutionError::Validation(format!(
            "{} assertion requires a string 'expected'",
            assertion.kind.tag()
        ))),
    }
}

/// Expected integer of a count assertion: a number or a numeric string.
fn expected_count(assertion: &Assertion) -> ExecResult<u64> {
    let parsed = match &assertion.expected {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ExecutionError::Validation("count assertion requires an integer 'expected'".to_string())
    })
}

pub struct Navigate;

#[async_trait]
impl StepHandler for Navigate {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let url = required(step.url.as_deref(), "url", "navigate")?;
        ctx.automation.navigate(url).await?;
        Ok(json!({ "url": url }))
    }
}

pub struct Click;

#[async_trait]
impl StepHandler for Click {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let selector = required(step.selector.as_deref(), "selector", "click")?;
        ctx.automation.click(selector).await?;
        Ok(json!({ "selector": selector }))
    }
}

pub struct TypeText;

#[async_trait]
impl StepHandler for TypeText {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let selector = required(step.selector.as_deref(), "selector", "type")?;
        let value = step
            .value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ExecutionError::Validation("type requires 'value'".to_string()))?;
        ctx.automation.type_text(selector, value).await?;
        Ok(json!({ "selector": selector, "typed_chars": value.chars().count() }))
    }
}

pub struct SelectOption;

#[async_trait]
impl StepHandler for SelectOption {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let selector = required(step.selector.as_deref(), "selector", "select")?;
        let value = required(step.value.as_deref(), "value", "select")?;
        ctx.automation.select_option(selector, value).await?;
        Ok(json!({ "selector": selector, "value": value }))
    }
}

/// Pauses without touching the browser.
pub struct Wait;

#[async_trait]
impl StepHandler for Wait {
    async fn execute(&self, step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let waited_ms = step.timeout.unwrap_or(ctx.settings.default_wait_ms);
        tokio::time::sleep(Duration::from_millis(waited_ms)).await;
        Ok(json!({ "waited_ms": waited_ms }))
    }
}

pub struct TakeScreenshot;

#[async_trait]
impl StepHandler for TakeScreenshot {
    async fn execute(&self, _step: &Step, ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        let bytes = ctx.automation.take_screenshot().await?;
        let captured_at = Utc::now();
        let id = format!(
            "screenshots/{}/step-{}-{}.png",
            ctx.session_id,
            ctx.index + 1,
            captured_at.timestamp_millis()
        );
        ctx.screenshots.push(Screenshot {
            id: id.clone(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            captured_at,
        });
        Ok(json!({ "screenshot_id": id, "bytes": bytes.len() }))
    }
}

/// Recorded only; custom steps run outside the engine.
pub struct CustomStep;

#[async_trait]
impl StepHandler for CustomStep {
    async fn execute(&self, step: &Step, _ctx: &mut StepContext<'_>) -> ExecResult<Value> {
        Ok(json!({
            "delegated": true,
            "description": step.description,
            "value": step.value,
        }))
    }
}

pub struct Exists;

#[async_trait]
impl AssertionHandler for Exists {
    async fn check(&self, assertion: &Assertion, ctx: &mut AssertionContext<'_>) -> ExecResult<Value> {
        let selector = required(assertion.selector.as_deref(), "selector", "exists assertion")?;
        if ctx.automation.element_exists(selector).await? {
            Ok(json!({ "exists": true }))
        } else {
            Err(ExecutionError::Assertion(format!("Element '{selector}' does not exist")))
        }
    }
}

pub struct Visible;

#[async_trait]
impl AssertionHandler for Visible {
    async fn check(&self, assertion: &Assertion, ctx: &mut AssertionContext<'_>) -> ExecResult<Value> {
        let selector = required(assertion.selector.as_deref(), "selector", "visible assertion")?;
        if ctx.automation.element_visible(selector).await? {
            Ok(json!({ "visible": true }))
        } else {
            Err(ExecutionError::Assertion(format!("Element '{selector}' is not visible")))
        }
    }
}

pub struct TextEquals;

#[async_trait]
impl AssertionHandler for TextEquals {
    async fn check(&self, assertion: &Assertion, ctx: &mut AssertionContext<'_>) -> ExecResult<Value> {
        let selector = required(assertion.selector.as_deref(), "selector", "text assertion")?;
        let expected = expected_text(assertion)?;
        let actual = ctx.automation.element_text(selector).await?;
        if actual.trim() == expected.trim() {
            Ok(json!({ "actual": actual }))
        } else {
            Err(ExecutionError::Assertion(format!(
                "Expected text '{expected}' for '{selector}', got '{actual}'"
            )))
        }
    }
}

pub struct ValueEquals;

#[async_trait]
impl AssertionHandler for ValueEquals {
    async fn check(&self, assertion: &Assertion, ctx: &mut AssertionContext<'_>) -> ExecResult<Value> {
        let selector = required(assertion.selector.as_deref(), "selector", "value assertion")?;
        let expected = expected_text(assertion)?;
        let actual = ctx.automation.element_value(selector).await?;
        if actual.trim() == expected.trim() {
            Ok(json!({ "actual": actual }))
        } else {
            Err(ExecutionError::Assertion(format!(
                "Expected value '{expected}' for '{selector}', got '{actual}'"
            )))
        }
    }
}

pub struct CountEquals;

#[async_trait]
impl AssertionHandler for CountEquals {
    async fn check(&self, assertion: &Assertion, ctx: &mut AssertionContext<'_>) -> ExecResult<Value> {
        let selector = required(assertion.selector.as_deref(), "selector", "count assertion")?;
        let expected = expected_count(assertion)?;
        let actual = ctx.automation.element_count(selector).await?;
        if u64::try_from(actual).is_ok_and(|a| a == expected) {
            Ok(json!({ "actual": actual }))
        } else {
            Err(ExecutionError::Assertion(format!(
                "Expected {expected} elements for '{selector}', found {actual}"
            )))
        }
    }
}

/// Logged, never verified by the engine.
pub struct CustomAssertion;

#[async_trait]
impl AssertionHandler for CustomAssertion {
    async fn check(&self, assertion: &Assertion, _ctx: &mut AssertionContext<'_>) -> ExecResult<Value> {
        Ok(json!({
            "verified": false,
            "description": assertion.description,
            "expected": assertion.expected,
        }))
    }
}
