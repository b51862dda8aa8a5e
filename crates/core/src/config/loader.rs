//! Configuration file loader for the `.sitecheck/` directory structure.
//!
//! Loads:
//! - `config.toml`: global settings
//! - `configurations/*.yaml` / `*.yml`: test configurations
//! - `goals/*.md`: goal-directed configurations with YAML front matter

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use sc_protocol::config_models::GlobalConfig;
use sc_protocol::config_models::TestConfiguration;
use sc_protocol::config_models::TestKind;
use serde_json::Map;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Name of the project directory holding all sitecheck files.
pub const PROJECT_DIR: &str = ".sitecheck";

/// Loads all configuration from the `.sitecheck/` directory under `root`.
///
/// Missing directories or files yield an empty/default configuration rather
/// than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML, YAML, or Markdown front matter)
/// - Two configurations share an id
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let sc_dir = root.join(PROJECT_DIR);

    if !sc_dir.exists() {
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&sc_dir)?;

    let mut configurations = load_configurations(&sc_dir)?;
    configurations.extend(load_goals(&sc_dir)?);
    check_unique_ids(&configurations)?;

    Ok(AppConfig {
        global,
        configurations: configurations.into_iter().map(|(_, c)| c).collect(),
    })
}

fn load_global_config(sc_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = sc_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content = read_file(&config_path)?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

fn load_configurations(sc_dir: &Path) -> ConfigResult<Vec<(PathBuf, TestConfiguration)>> {
    let mut configurations = Vec::new();

    for path in files_with_extension(&sc_dir.join("configurations"), &["yaml", "yml"])? {
        let content = read_file(&path)?;

        let configuration: TestConfiguration =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.clone(),
                source,
            })?;

        if configuration.id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                path,
                reason: "Configuration id must not be empty".to_string(),
            });
        }

        configurations.push((path, configuration));
    }

    Ok(configurations)
}

/// Goal files: the front matter carries the configuration fields and any goal
/// options (`success_criteria`, `max_attempts`, `timeout_ms`, `context`, `url`),
/// the Markdown body is the goal itself.
fn load_goals(sc_dir: &Path) -> ConfigResult<Vec<(PathBuf, TestConfiguration)>> {
    let matter = Matter::<YAML>::new();
    let mut goals = Vec::new();

    for path in files_with_extension(&sc_dir.join("goals"), &["md"])? {
        let content = read_file(&path)?;
        let parsed = matter.parse(&content);

        let front: Value = parsed
            .data
            .ok_or_else(|| ConfigError::MarkdownParse {
                path: path.clone(),
                reason: "Missing YAML front matter".to_string(),
            })?
            .deserialize()
            .map_err(|e| ConfigError::MarkdownParse {
                path: path.clone(),
                reason: format!("Failed to deserialize front matter: {}", e),
            })?;

        let Value::Object(mut fields) = front else {
            return Err(ConfigError::MarkdownParse {
                path,
                reason: "Front matter must be a mapping".to_string(),
            });
        };

        let id = take_string(&mut fields, &["id"]).or_else(|| file_stem(&path));
        let Some(id) = id else {
            return Err(ConfigError::InvalidConfig {
                path,
                reason: "Goal file needs an id".to_string(),
            });
        };
        let Some(url_pattern) = take_string(&mut fields, &["url_pattern", "urlPattern"]) else {
            return Err(ConfigError::MarkdownParse {
                path,
                reason: "Missing 'url_pattern' in front matter".to_string(),
            });
        };
        let name = take_string(&mut fields, &["name"]).unwrap_or_else(|| id.clone());
        let is_active = match take(&mut fields, &["is_active", "isActive"]) {
            None => true,
            Some(Value::Bool(active)) => active,
            Some(other) => {
                return Err(ConfigError::InvalidConfig {
                    path,
                    reason: format!("'is_active' must be a boolean, got {}", other),
                })
            }
        };
        take(&mut fields, &["test_kind", "testType", "test_type"]);

        let body = parsed.content.trim();
        if !body.is_empty() {
            fields.insert("goal".to_string(), Value::String(body.to_string()));
        }

        goals.push((
            path,
            TestConfiguration {
                id,
                url_pattern,
                name,
                instructions: Value::Object(fields),
                test_kind: TestKind::GoalDirected,
                is_active,
            },
        ));
    }

    Ok(goals)
}

fn check_unique_ids(configurations: &[(PathBuf, TestConfiguration)]) -> ConfigResult<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for (path, configuration) in configurations {
        if let Some(first) = seen.insert(&configuration.id, path) {
            return Err(ConfigError::InvalidConfig {
                path: path.clone(),
                reason: format!(
                    "Duplicate configuration id '{}' (already defined in {})",
                    configuration.id,
                    first.display()
                ),
            });
        }
    }
    Ok(())
}

/// Files directly inside `dir` with one of `extensions`, in file name order.
fn files_with_extension(dir: &Path, extensions: &[&str]) -> ConfigResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        let ext = path.extension().and_then(|s| s.to_str());
        if ext.is_some_and(|ext| extensions.contains(&ext)) && entry.file_type().is_file() {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn read_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn take(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(value) = fields.remove(*key) {
            found.get_or_insert(value);
        }
    }
    found
}

fn take_string(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    match take(fields, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().expect("Failed to create temp dir");
        let sc_dir = dir.path().join(PROJECT_DIR);
        fs::create_dir_all(sc_dir.join("configurations")).expect("Failed to create dir");
        fs::create_dir_all(sc_dir.join("goals")).expect("Failed to create dir");
        (dir, sc_dir)
    }

    #[tokio::test]
    async fn test_load_config_acceptance() {
        let (dir, sc_dir) = project();

        fs::write(
            sc_dir.join("config.toml"),
            r#"
[executor]
default_wait_ms = 250
default_max_attempts = 5

[automation]
command = "sitecheck-driver"
args = ["--headless"]

[storage]
dir = "runs"
"#,
        )
        .expect("Failed to write config.toml");

        fs::write(
            sc_dir.join("configurations/login.yaml"),
            r##"id: login-smoke
name: Login smoke
url_pattern: example.com/login
test_kind: traditional
instructions:
  steps:
    - action: navigate
      url: https://example.com/login
      description: Open the login page
  assertions:
    - type: exists
      selector: "#login-form"
      description: Login form is rendered
"##,
        )
        .expect("Failed to write configuration");

        fs::write(
            sc_dir.join("goals/pricing.md"),
            r#"---
url_pattern: example.com
success_criteria:
  - "Pricing"
max_attempts: 2
---

Find the pricing page."#,
        )
        .expect("Failed to write goal");

        let config = load_config(dir.path()).await.expect("Failed to load config");

        assert_eq!(config.global.executor.default_wait_ms, 250);
        assert_eq!(config.global.executor.default_max_attempts, 5);
        assert_eq!(config.global.executor.element_timeout_ms, 5_000);
        let automation = config.global.automation.as_ref().expect("automation table");
        assert_eq!(automation.command, "sitecheck-driver");
        assert_eq!(automation.args, vec!["--headless"]);
        assert_eq!(config.global.storage.dir.as_deref(), Some("runs"));
        assert!(config.global.judge.is_none());

        assert_eq!(config.configurations.len(), 2);
        let login = &config.configurations[0];
        assert_eq!(login.id, "login-smoke");
        assert_eq!(login.test_kind, TestKind::Deterministic);
        assert!(login.is_active);
        assert_eq!(login.instructions["steps"][0]["action"], "navigate");

        let goal = &config.configurations[1];
        assert_eq!(goal.id, "pricing");
        assert_eq!(goal.name, "pricing");
        assert_eq!(goal.test_kind, TestKind::GoalDirected);
        assert_eq!(goal.url_pattern, "example.com");
        assert_eq!(goal.instructions["goal"], "Find the pricing page.");
        assert_eq!(goal.instructions["max_attempts"], 2);
        assert_eq!(goal.instructions["success_criteria"][0], "Pricing");
        assert!(goal.instructions.get("url_pattern").is_none());
        assert!(config.configuration("pricing").is_some());
    }

    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().expect("Failed to create temp dir");

        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .sitecheck");

        assert_eq!(config.global, GlobalConfig::default());
        assert!(config.configurations.is_empty());
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let (dir, sc_dir) = project();
        fs::write(sc_dir.join("config.toml"), "[executor\ndefault_wait_ms = ")
            .expect("Failed to write config.toml");

        match load_config(dir.path()).await {
            Err(ConfigError::TomlParse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected TomlParse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_config_invalid_yaml() {
        let (dir, sc_dir) = project();
        fs::write(
            sc_dir.join("configurations/broken.yml"),
            "id: test\n  invalid: [yaml",
        )
        .expect("Failed to write configuration");

        match load_config(dir.path()).await {
            Err(ConfigError::YamlParse { path, .. }) => assert!(path.ends_with("broken.yml")),
            other => panic!("Expected YamlParse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_goal_without_front_matter() {
        let (dir, sc_dir) = project();
        fs::write(sc_dir.join("goals/plain.md"), "Just plain markdown content")
            .expect("Failed to write goal");

        match load_config(dir.path()).await {
            Err(ConfigError::MarkdownParse { path, reason }) => {
                assert!(path.ends_with("plain.md"));
                assert!(reason.contains("Missing YAML front matter"));
            }
            other => panic!("Expected MarkdownParse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_goal_without_url_pattern() {
        let (dir, sc_dir) = project();
        fs::write(
            sc_dir.join("goals/nowhere.md"),
            "---\nname: Nowhere\n---\n\nGo somewhere.",
        )
        .expect("Failed to write goal");

        match load_config(dir.path()).await {
            Err(ConfigError::MarkdownParse { reason, .. }) => {
                assert!(reason.contains("url_pattern"));
            }
            other => panic!("Expected MarkdownParse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let (dir, sc_dir) = project();
        fs::write(
            sc_dir.join("configurations/a.yaml"),
            "id: shared\nurl_pattern: example.com\ntest_kind: deterministic\n",
        )
        .expect("Failed to write configuration");
        fs::write(
            sc_dir.join("goals/shared.md"),
            "---\nurl_pattern: example.com\n---\n\nDo a thing.",
        )
        .expect("Failed to write goal");

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { path, reason }) => {
                assert!(path.ends_with("shared.md"));
                assert!(reason.contains("Duplicate configuration id 'shared'"));
            }
            other => panic!("Expected InvalidConfig error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_files_load_in_name_order_and_others_are_ignored() {
        let (dir, sc_dir) = project();
        for name in ["c", "a", "b"] {
            fs::write(
                sc_dir.join(format!("configurations/{}.yaml", name)),
                format!("id: {}\nurl_pattern: {}.example.com\ntest_kind: deterministic\n", name, name),
            )
            .expect("Failed to write configuration");
        }
        fs::write(sc_dir.join("configurations/notes.txt"), "Not a yaml file")
            .expect("Failed to write txt file");

        let config = load_config(dir.path()).await.expect("Should load");

        let ids: Vec<&str> = config.configurations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_inactive_goal() {
        let (dir, sc_dir) = project();
        fs::write(
            sc_dir.join("goals/off.md"),
            "---\nid: paused-goal\nurl_pattern: example.com\nis_active: false\n---\n\nDo nothing.",
        )
        .expect("Failed to write goal");

        let config = load_config(dir.path()).await.expect("Should load");

        assert_eq!(config.configurations[0].id, "paused-goal");
        assert!(!config.configurations[0].is_active);
    }
}
