//! Automation capability implementations.

pub mod driver;
pub mod mock_browser;

pub use driver::{DriverBrowser, DriverProvider};
pub use mock_browser::{MockBrowser, MockElement, MockPage, MockProvider, MockRecorder};
