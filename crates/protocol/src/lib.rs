//! # sc-protocol
//!
//! Data records and runtime event protocol shared by the sitecheck crates.
//!
//! This crate defines:
//! - Stored test configurations and global settings
//! - Steps, assertions and goal descriptors that make up test instructions
//! - Sessions, action log entries and execution results
//! - Page snapshots and judgment records used by goal-directed runs
//! - Runtime events emitted while a session executes
//!
//! ## Modules
//!
//! - [`config_models`]: Test configurations, test kinds and `config.toml` settings
//! - [`test_models`]: Steps, assertions, goal descriptors and plan actions
//! - [`page_models`]: Page snapshots, analyses and criteria verdicts
//! - [`session_models`]: Session records and the action log
//! - [`result_models`]: Execution results returned by both executors
//! - [`ipc`]: Events streamed to observers of a running session
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde, chrono and ts-rs
//! - TypeScript generation: records derive `TS` for client compatibility
//! - Lenient decoding: malformed optional fields fall back to defaults

pub mod config_models;
pub mod ipc;
mod lenient;
pub mod page_models;
pub mod result_models;
pub mod session_models;
pub mod test_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use page_models::*;
pub use result_models::*;
pub use session_models::*;
pub use test_models::*;
