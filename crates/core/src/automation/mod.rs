//! Browser automation seam.
//!
//! This module provides the `BrowserAutomation` trait (Adapter Pattern),
//! the `AutomationProvider` that opens one capability per session, and the
//! `AutomationHandle` that owns a capability for the duration of a run.

pub mod adapters;
pub mod base;
pub mod handle;

pub use adapters::{DriverProvider, MockBrowser, MockProvider};
pub use base::{AutomationError, AutomationProvider, BrowserAutomation};
pub use handle::AutomationHandle;
