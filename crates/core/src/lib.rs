//! # sc-core
//!
//! Test execution orchestration engine for sitecheck.
//!
//! This crate provides:
//! - Configuration loading from the `.sitecheck/` directory
//! - URL-to-configuration resolution
//! - The deterministic (traditional) and goal-directed (agentic) executors
//! - Browser automation and page judgment behind swappable traits
//! - Session lifecycle, action logging and result persistence
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`resolver`]: Most-specific configuration lookup for a URL
//! - [`automation`]: Browser automation trait, scoped handle and adapters
//! - [`judge`]: Page analysis, planning and criteria evaluation
//! - [`executor`]: Step/assertion registry and both executors
//! - [`action_log`]: Timed, persisted action log entries
//! - [`storage`]: Session, log, result and configuration stores
//! - [`state`]: Session lifecycle and the session manager
//! - [`factory`]: Wiring from configuration to runtime objects
//! - [`init`]: `.sitecheck/` project scaffolding

pub mod action_log;
pub mod automation;
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod init;
pub mod judge;
pub mod resolver;
pub mod state;
pub mod storage;

pub use error::{ExecResult, ExecutionError};
