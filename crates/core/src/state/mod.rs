//! Session state management.
//!
//! This module provides:
//! - Session lifecycle functions (open, finish, cancel) that emit events
//! - SessionManager for running, tracking and cancelling sessions

pub mod manager;
pub mod session;

pub use manager::{InlineTest, Instructions, RunRequest, SessionManager};
pub use session::SessionError;
