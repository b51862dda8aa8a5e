//! Single-owner guard around a browser automation capability.

use crate::automation::base::{AutomationError, AutomationProvider, BrowserAutomation};
use sc_protocol::PageSnapshot;
use std::time::Duration;
use tracing::{debug, warn};

/// Owns one capability for the length of an executor run.
///
/// The capability is disposed exactly once: right after the first failing
/// call, or when the run ends through [`AutomationHandle::dispose`],
/// whichever comes first. Calls after disposal fail with
/// [`AutomationError::Disposed`] without reaching the browser.
pub struct AutomationHandle {
    session_id: String,
    inner: Option<Box<dyn BrowserAutomation>>,
}

impl AutomationHandle {
    pub fn new(session_id: impl Into<String>, automation: Box<dyn BrowserAutomation>) -> Self {
        Self {
            session_id: session_id.into(),
            inner: Some(automation),
        }
    }

    /// Open a capability for `session_id` through `provider`.
    pub async fn open(
        provider: &dyn AutomationProvider,
        session_id: &str,
    ) -> Result<Self, AutomationError> {
        let automation = provider.open(session_id).await?;
        debug!(session_id, "Opened automation capability");
        Ok(Self::new(session_id, automation))
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_none()
    }

    /// Close the capability if it is still live. Safe to call repeatedly.
    pub async fn dispose(&mut self) {
        if let Some(mut automation) = self.inner.take() {
            match automation.close().await {
                Ok(()) => debug!(session_id = %self.session_id, "Disposed automation capability"),
                Err(e) => warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to close automation capability"
                ),
            }
        }
    }

    fn live(&mut self) -> Result<&mut (dyn BrowserAutomation + 'static), AutomationError> {
        self.inner.as_deref_mut().ok_or(AutomationError::Disposed)
    }

    /// Dispose on failure, then hand the result back.
    async fn settle<T>(&mut self, result: Result<T, AutomationError>) -> Result<T, AutomationError> {
        if let Err(e) = &result {
            if !matches!(e, AutomationError::Disposed) {
                warn!(session_id = %self.session_id, error = %e, "Automation call failed");
                self.dispose().await;
            }
        }
        result
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.navigate(url).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn click(&mut self, selector: &str) -> Result<(), AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.click(selector).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.type_text(selector, text).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.select_option(selector, value).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn take_screenshot(&mut self) -> Result<Vec<u8>, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.take_screenshot().await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn snapshot(&mut self) -> Result<PageSnapshot, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.snapshot().await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn element_exists(&mut self, selector: &str) -> Result<bool, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.element_exists(selector).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn element_visible(&mut self, selector: &str) -> Result<bool, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.element_visible(selector).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn element_text(&mut self, selector: &str) -> Result<String, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.element_text(selector).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn element_value(&mut self, selector: &str) -> Result<String, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.element_value(selector).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn element_count(&mut self, selector: &str) -> Result<usize, AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.element_count(selector).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    pub async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AutomationError> {
        let result = match self.live() {
            Ok(automation) => automation.wait_for_element(selector, timeout).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::adapters::{MockBrowser, MockProvider};

    #[tokio::test]
    async fn test_failure_disposes_exactly_once() {
        let provider = MockProvider::new(MockBrowser::blank().fail_on("click:#broken"));
        let mut handle = AutomationHandle::open(&provider, "s-1").await.unwrap();

        handle.navigate("https://example.com").await.unwrap();
        let err = handle.click("#broken").await.unwrap_err();
        assert!(matches!(err, AutomationError::CallFailed(_)));
        assert!(handle.is_disposed());

        // Later calls never reach the browser
        let err = handle.navigate("https://example.com/next").await.unwrap_err();
        assert_eq!(err, AutomationError::Disposed);

        handle.dispose().await;
        let recorder = provider.recorder();
        assert_eq!(recorder.closes(), 1);
        assert_eq!(recorder.calls(), vec![
            "open:s-1".to_string(),
            "navigate:https://example.com".to_string(),
            "click:#broken".to_string(),
        ]);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let provider = MockProvider::new(MockBrowser::blank());
        let mut handle = AutomationHandle::open(&provider, "s-2").await.unwrap();

        handle.dispose().await;
        handle.dispose().await;

        assert!(handle.is_disposed());
        assert_eq!(provider.recorder().closes(), 1);
    }
}
