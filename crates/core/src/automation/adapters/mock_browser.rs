//! Scripted in-process browser for tests and dry runs.

use crate::automation::base::{AutomationError, AutomationProvider, BrowserAutomation};
use async_trait::async_trait;
use sc_protocol::{PageElement, PageSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A 1x1 transparent PNG.
const BLANK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[derive(Debug, Clone)]
pub struct MockElement {
    pub role: String,
    pub text: String,
    pub value: String,
    pub visible: bool,
    /// How many nodes the selector matches.
    pub count: usize,
}

impl MockElement {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
            value: String::new(),
            visible: true,
            count: 1,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Static page content served by [`MockBrowser`].
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub title: String,
    pub content: String,
    pub elements: BTreeMap<String, MockElement>,
}

impl MockPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_element(mut self, selector: impl Into<String>, element: MockElement) -> Self {
        self.elements.insert(selector.into(), element);
        self
    }

    fn element(&self, selector: &str) -> Result<&MockElement, AutomationError> {
        self.elements
            .get(selector)
            .ok_or_else(|| AutomationError::CallFailed(format!("No element matches '{selector}'")))
    }

    fn element_mut(&mut self, selector: &str) -> Result<&mut MockElement, AutomationError> {
        self.elements
            .get_mut(selector)
            .ok_or_else(|| AutomationError::CallFailed(format!("No element matches '{selector}'")))
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<String>,
    opens: usize,
    closes: usize,
    /// Remaining forced failures keyed by `op` or `op:arg`.
    failures: HashMap<String, usize>,
}

/// Call history shared by every browser a [`MockProvider`] opens.
#[derive(Debug, Clone, Default)]
pub struct MockRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl MockRecorder {
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Calls matching `op`, either an operation name or an exact `"op:arg"` key.
    pub fn calls_of(&self, op: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == op || c.split(':').next() == Some(op))
            .count()
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    fn set_failures(&self, key: String, times: usize) {
        self.lock().failures.insert(key, times);
    }

    /// Record a call and consume a forced failure for it if one is pending.
    fn record(&self, op: &str, arg: Option<&str>) -> Result<(), AutomationError> {
        let mut state = self.lock();
        let entry = match arg {
            Some(arg) => format!("{op}:{arg}"),
            None => op.to_string(),
        };
        state.calls.push(entry.clone());

        for key in [entry.as_str(), op] {
            if let Some(remaining) = state.failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AutomationError::CallFailed(format!("Scripted failure on '{key}'")));
                }
            }
        }
        Ok(())
    }
}

/// In-process [`BrowserAutomation`] driven by a scripted [`MockPage`].
#[derive(Debug, Clone)]
pub struct MockBrowser {
    url: String,
    page: MockPage,
    /// Page that replaces the current one after a selector is clicked.
    transitions: HashMap<String, MockPage>,
    screenshot: Vec<u8>,
    delay: Option<Duration>,
    recorder: MockRecorder,
}

impl MockBrowser {
    pub fn new(page: MockPage) -> Self {
        Self {
            url: "about:blank".to_string(),
            page,
            transitions: HashMap::new(),
            screenshot: BLANK_PNG.to_vec(),
            delay: None,
            recorder: MockRecorder::default(),
        }
    }

    pub fn blank() -> Self {
        Self::new(MockPage::new("Blank"))
    }

    /// Every call to `key` (`"click"` or `"click:#selector"`) fails.
    pub fn fail_on(self, key: impl Into<String>) -> Self {
        self.fail_times(key, usize::MAX)
    }

    /// The next `times` calls to `key` fail.
    pub fn fail_times(self, key: impl Into<String>, times: usize) -> Self {
        self.recorder.set_failures(key.into(), times);
        self
    }

    pub fn on_click(mut self, selector: impl Into<String>, page: MockPage) -> Self {
        self.transitions.insert(selector.into(), page);
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot = bytes;
        self
    }

    pub fn recorder(&self) -> MockRecorder {
        self.recorder.clone()
    }

    async fn call(&self, op: &str, arg: Option<&str>) -> Result<(), AutomationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.recorder.record(op, arg)
    }
}

#[async_trait]
impl BrowserAutomation for MockBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.call("navigate", Some(url)).await?;
        self.url = url.to_string();
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), AutomationError> {
        self.call("click", Some(selector)).await?;
        self.page.element(selector)?;
        if let Some(next) = self.transitions.get(selector) {
            self.page = next.clone();
        }
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), AutomationError> {
        self.call("type", Some(selector)).await?;
        self.page.element_mut(selector)?.value.push_str(text);
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), AutomationError> {
        self.call("select", Some(selector)).await?;
        self.page.element_mut(selector)?.value = value.to_string();
        Ok(())
    }

    async fn take_screenshot(&mut self) -> Result<Vec<u8>, AutomationError> {
        self.call("screenshot", None).await?;
        Ok(self.screenshot.clone())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, AutomationError> {
        self.call("snapshot", None).await?;
        let elements = self
            .page
            .elements
            .iter()
            .map(|(selector, el)| PageElement {
                selector: selector.clone(),
                role: el.role.clone(),
                text: el.text.clone(),
                visible: el.visible,
            })
            .collect();
        Ok(PageSnapshot {
            url: self.url.clone(),
            title: self.page.title.clone(),
            content: self.page.content.clone(),
            elements,
        })
    }

    async fn element_exists(&mut self, selector: &str) -> Result<bool, AutomationError> {
        self.call("exists", Some(selector)).await?;
        Ok(self.page.elements.contains_key(selector))
    }

    async fn element_visible(&mut self, selector: &str) -> Result<bool, AutomationError> {
        self.call("visible", Some(selector)).await?;
        Ok(self.page.elements.get(selector).is_some_and(|el| el.visible))
    }

    async fn element_text(&mut self, selector: &str) -> Result<String, AutomationError> {
        self.call("text", Some(selector)).await?;
        Ok(self.page.element(selector)?.text.clone())
    }

    async fn element_value(&mut self, selector: &str) -> Result<String, AutomationError> {
        self.call("value", Some(selector)).await?;
        Ok(self.page.element(selector)?.value.clone())
    }

    async fn element_count(&mut self, selector: &str) -> Result<usize, AutomationError> {
        self.call("count", Some(selector)).await?;
        Ok(self.page.elements.get(selector).map_or(0, |el| el.count))
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        self.recorder.lock().closes += 1;
        Ok(())
    }
}

/// Hands out clones of a template [`MockBrowser`] that share one recorder.
pub struct MockProvider {
    template: MockBrowser,
    available: bool,
}

impl MockProvider {
    pub fn new(template: MockBrowser) -> Self {
        Self {
            template,
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            template: MockBrowser::blank(),
            available: false,
        }
    }

    pub fn recorder(&self) -> MockRecorder {
        self.template.recorder()
    }
}

#[async_trait]
impl AutomationProvider for MockProvider {
    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn open(&self, session_id: &str) -> Result<Box<dyn BrowserAutomation>, AutomationError> {
        if !self.available {
            return Err(AutomationError::NotAvailable(
                "Mock browser not available".to_string(),
            ));
        }
        self.template.recorder.record("open", Some(session_id))?;
        self.template.recorder.lock().opens += 1;
        Ok(Box::new(self.template.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_page() -> MockPage {
        MockPage::new("Login")
            .with_content("Please sign in")
            .with_element("#user", MockElement::new("textbox", ""))
            .with_element("#submit", MockElement::new("button", "Sign in"))
            .with_element("#hint", MockElement::new("note", "Forgot?").hidden())
    }

    #[tokio::test]
    async fn test_mock_browser_page_queries() {
        let mut browser = MockBrowser::new(login_page());
        browser.navigate("https://example.com/login").await.unwrap();
        browser.type_text("#user", "demo").await.unwrap();

        assert!(browser.element_exists("#submit").await.unwrap());
        assert!(!browser.element_visible("#hint").await.unwrap());
        assert_eq!(browser.element_value("#user").await.unwrap(), "demo");
        assert_eq!(browser.element_count("#missing").await.unwrap(), 0);

        let snapshot = browser.snapshot().await.unwrap();
        assert_eq!(snapshot.url, "https://example.com/login");
        assert_eq!(snapshot.elements.len(), 3);
    }

    #[tokio::test]
    async fn test_click_transition_replaces_page() {
        let welcome = MockPage::new("Welcome").with_content("Welcome, demo");
        let mut browser = MockBrowser::new(login_page()).on_click("#submit", welcome);

        browser.click("#submit").await.unwrap();
        let snapshot = browser.snapshot().await.unwrap();
        assert_eq!(snapshot.title, "Welcome");
        assert!(browser.click("#missing").await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed() {
        let mut browser = MockBrowser::new(login_page()).fail_times("click:#submit", 1);

        assert!(browser.click("#submit").await.is_err());
        assert!(browser.click("#submit").await.is_ok());
        assert_eq!(browser.recorder().calls_of("click"), 2);
    }

    #[tokio::test]
    async fn test_provider_shares_recorder_across_opens() {
        let provider = MockProvider::new(MockBrowser::blank());
        let mut first = provider.open("s-1").await.unwrap();
        let mut second = provider.open("s-2").await.unwrap();
        first.close().await.unwrap();
        second.close().await.unwrap();

        let recorder = provider.recorder();
        assert_eq!(recorder.opens(), 2);
        assert_eq!(recorder.closes(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_provider() {
        let provider = MockProvider::unavailable();
        assert!(!provider.check_availability().await);
        assert!(matches!(
            provider.open("s-1").await,
            Err(AutomationError::NotAvailable(_))
        ));
    }
}
