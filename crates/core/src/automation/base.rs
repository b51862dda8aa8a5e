//! Base automation traits and supporting types.

use async_trait::async_trait;
use sc_protocol::PageSnapshot;
use std::time::Duration;
use thiserror::Error;

/// Poll interval of the default `wait_for_element` implementation.
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    #[error("Automation not available: {0}")]
    NotAvailable(String),
    #[error("Automation call failed: {0}")]
    CallFailed(String),
    #[error("Driver protocol error: {0}")]
    Protocol(String),
    #[error("Automation session has been disposed")]
    Disposed,
}

/// Remote browser control for a single session.
///
/// Methods take `&mut self`: a capability has exactly one owner and is never
/// driven by two runs at once. Any failing call invalidates the underlying
/// browser session; callers dispose the capability and do not reuse it.
#[async_trait]
pub trait BrowserAutomation: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError>;
    async fn click(&mut self, selector: &str) -> Result<(), AutomationError>;
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), AutomationError>;
    async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), AutomationError>;

    /// Raw image bytes (PNG).
    async fn take_screenshot(&mut self) -> Result<Vec<u8>, AutomationError>;
    async fn snapshot(&mut self) -> Result<PageSnapshot, AutomationError>;

    async fn element_exists(&mut self, selector: &str) -> Result<bool, AutomationError>;
    async fn element_visible(&mut self, selector: &str) -> Result<bool, AutomationError>;
    async fn element_text(&mut self, selector: &str) -> Result<String, AutomationError>;
    async fn element_value(&mut self, selector: &str) -> Result<String, AutomationError>;
    async fn element_count(&mut self, selector: &str) -> Result<usize, AutomationError>;

    /// Wait until `selector` exists, polling `element_exists` by default.
    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AutomationError> {
        let started = tokio::time::Instant::now();
        loop {
            if self.element_exists(selector).await? {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(AutomationError::CallFailed(format!(
                    "Element '{selector}' did not appear within {} ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    /// Release the browser session. Called exactly once per capability.
    async fn close(&mut self) -> Result<(), AutomationError>;
}

/// Opens a fresh, exclusively owned capability for a session.
#[async_trait]
pub trait AutomationProvider: Send + Sync {
    async fn check_availability(&self) -> bool;
    async fn open(&self, session_id: &str) -> Result<Box<dyn BrowserAutomation>, AutomationError>;
}
