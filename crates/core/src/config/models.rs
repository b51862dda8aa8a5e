//! Aggregated project configuration.

use sc_protocol::config_models::GlobalConfig;
use sc_protocol::config_models::TestConfiguration;

/// Everything loaded from a project's `.sitecheck/` directory.
///
/// - `config.toml`: global settings
/// - `configurations/*.yaml`: deterministic and goal-directed configurations
/// - `goals/*.md`: goal-directed configurations whose Markdown body is the goal
///
/// # Example
///
/// ```rust,no_run
/// use sc_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} configurations", config.configurations.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// Every configuration, YAML files first, then goal files, each group in
    /// file name order.
    pub configurations: Vec<TestConfiguration>,
}

impl AppConfig {
    pub fn configuration(&self, id: &str) -> Option<&TestConfiguration> {
        self.configurations.iter().find(|c| c.id == id)
    }
}
