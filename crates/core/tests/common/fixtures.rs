//! Sample pages, test cases and configurations.

#![allow(dead_code)]

use sc_core::automation::adapters::{MockBrowser, MockElement, MockPage, MockProvider};
use sc_core::storage::MemoryStore;
use sc_protocol::{
    Assertion, AssertionKind, Event, GoalDescriptor, Step, StepAction, TestCase,
    TestConfiguration, TestKind,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A login page with a form, two inputs, a submit button and a heading.
pub fn login_page() -> MockPage {
    MockPage::new("Sign in")
        .with_content("Sign in to continue")
        .with_element("#login-form", MockElement::new("form", ""))
        .with_element("#username", MockElement::new("textbox", ""))
        .with_element("#password", MockElement::new("textbox", ""))
        .with_element("#submit", MockElement::new("button", "Sign in"))
        .with_element("h1", MockElement::new("heading", "Welcome back"))
        .with_element("li.item", MockElement::new("listitem", "Item").with_count(3))
}

/// Page shown after `#submit` is clicked on [`login_page`].
pub fn dashboard_page() -> MockPage {
    MockPage::new("Dashboard")
        .with_content("Welcome, demo")
        .with_element("#dashboard", MockElement::new("main", ""))
        .with_element("#welcome", MockElement::new("heading", "Welcome, demo"))
}

pub fn login_browser() -> MockBrowser {
    MockBrowser::new(login_page()).on_click("#submit", dashboard_page())
}

pub fn navigate(url: &str) -> Step {
    Step::new(StepAction::Navigate, format!("Open {url}")).with_url(url)
}

pub fn click(selector: &str) -> Step {
    Step::new(StepAction::Click, format!("Click {selector}")).with_selector(selector)
}

pub fn type_into(selector: &str, value: &str) -> Step {
    Step::new(StepAction::Type, format!("Type into {selector}"))
        .with_selector(selector)
        .with_value(value)
}

pub fn exists(selector: &str) -> Assertion {
    Assertion::new(AssertionKind::Exists, format!("{selector} exists")).with_selector(selector)
}

pub fn text_equals(selector: &str, expected: &str) -> Assertion {
    Assertion::new(AssertionKind::Text, format!("{selector} reads {expected}"))
        .with_selector(selector)
        .with_expected(expected)
}

/// Fill in and submit the login form, then check the dashboard.
pub fn login_case() -> TestCase {
    TestCase {
        steps: vec![
            navigate("https://example.com/login"),
            type_into("#username", "demo"),
            type_into("#password", "demo"),
            click("#submit"),
        ],
        assertions: vec![exists("#dashboard"), text_equals("#welcome", "Welcome, demo")],
    }
}

pub fn deterministic_config(id: &str, url_pattern: &str, case: &TestCase) -> TestConfiguration {
    TestConfiguration {
        id: id.to_string(),
        url_pattern: url_pattern.to_string(),
        name: id.to_string(),
        instructions: serde_json::to_value(case).unwrap_or_default(),
        test_kind: TestKind::Deterministic,
        is_active: true,
    }
}

pub fn goal_config(id: &str, url_pattern: &str, goal: &GoalDescriptor) -> TestConfiguration {
    TestConfiguration {
        id: id.to_string(),
        url_pattern: url_pattern.to_string(),
        name: id.to_string(),
        instructions: serde_json::to_value(goal).unwrap_or_default(),
        test_kind: TestKind::GoalDirected,
        is_active: true,
    }
}

pub fn pricing_goal() -> GoalDescriptor {
    GoalDescriptor::new("Open the pricing page", vec!["Plans start at".to_string()])
        .with_url("https://example.com")
        .with_context(json!({ "plan": "starter" }))
}

/// A home page whose "Pricing" link leads to the pricing page.
pub fn pricing_browser() -> MockBrowser {
    let home = MockPage::new("Home")
        .with_content("Welcome to Example")
        .with_element("#pricing", MockElement::new("link", "Pricing"))
        .with_element("#about", MockElement::new("link", "About us"));
    let pricing = MockPage::new("Pricing")
        .with_content("Plans start at $10 per month")
        .with_element("#buy", MockElement::new("button", "Buy now"));
    MockBrowser::new(home).on_click("#pricing", pricing)
}

pub fn provider(browser: MockBrowser) -> Arc<MockProvider> {
    Arc::new(MockProvider::new(browser))
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// An event channel large enough that no test run ever blocks on it.
pub fn events() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(1024)
}
