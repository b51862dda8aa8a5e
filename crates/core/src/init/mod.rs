//! Scaffolding for a new `.sitecheck/` project directory.
//!
//! Generates:
//! - Global configuration (`config.toml`)
//! - Sample test configurations (`configurations/*.yaml`)
//! - Sample goal files (`goals/*.md`)
//!
//! # Example
//!
//! ```no_run
//! use sc_core::init::{generate_project_structure, InitOptions};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! generate_project_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_project_structure, InitOptions};
pub use templates::{get_template, list_templates};
