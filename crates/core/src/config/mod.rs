//! Configuration loading and management.
//!
//! Reads `config.toml`, the YAML test configurations and the Markdown goal
//! files from the `.sitecheck/` directory of a project.

pub mod error;
pub mod loader;
pub mod models;
