//! Directory structure and file generation for `.sitecheck/` initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::loader::PROJECT_DIR;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory in which `.sitecheck/` will be created.
    pub target_dir: PathBuf,

    /// Overwrite an existing `.sitecheck/` directory.
    pub force: bool,

    /// Only write `config.toml` and the homepage smoke configuration.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a `.sitecheck/` directory with sample files.
///
/// ```text
/// .sitecheck/
/// ├── config.toml
/// ├── configurations/
/// │   ├── homepage-smoke.yaml
/// │   └── login-flow.yaml (unless minimal)
/// └── goals/
///     └── find-pricing.md (unless minimal)
/// ```
///
/// # Errors
///
/// - The `.sitecheck/` directory already exists (without force flag)
/// - A template file cannot be found
/// - File system operations fail
pub async fn generate_project_structure(options: InitOptions) -> InitResult<()> {
    let sc_dir = options.target_dir.join(PROJECT_DIR);

    if sc_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(sc_dir));
    }

    for sub in ["configurations", "goals"] {
        let path = sc_dir.join(sub);
        fs::create_dir_all(&path).map_err(|source| InitError::DirectoryCreate { path, source })?;
    }

    write_template_file(&sc_dir, "config.toml")?;

    if options.minimal {
        write_template_file(&sc_dir, "configurations/homepage-smoke.yaml")?;
    } else {
        for path in list_templates("configurations/") {
            write_template_file(&sc_dir, &path)?;
        }
        for path in list_templates("goals/") {
            write_template_file(&sc_dir, &path)?;
        }
    }

    Ok(())
}

fn write_template_file(sc_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = sc_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}
