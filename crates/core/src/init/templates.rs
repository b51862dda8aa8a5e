//! Embedded template files for `.sitecheck/` initialization.
//!
//! Everything under the workspace `templates/` directory is embedded at compile
//! time, so `sitecheck init` works without any files next to the binary.

use rust_embed::RustEmbed;

/// Files from the workspace root `templates/` directory.
///
/// With the `debug-embed` feature the files are still compiled in for debug
/// builds, which keeps tests independent of the working directory.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Template content by path relative to the templates root, e.g.
/// `"configurations/login-flow.yaml"`.
///
/// ```
/// use sc_core::init::templates::get_template;
///
/// let config = get_template("config.toml").expect("config.toml should exist");
/// assert!(config.contains("[executor]"));
/// ```
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// All template paths starting with `prefix`, sorted.
pub fn list_templates(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_template() {
        let content = get_template("config.toml").expect("config.toml should be embedded");
        assert!(content.contains("[executor]"));
        assert!(content.contains("default_max_attempts"));
    }

    #[test]
    fn test_get_configuration_templates() {
        let smoke = get_template("configurations/homepage-smoke.yaml")
            .expect("homepage-smoke.yaml should be embedded");
        assert!(smoke.contains("id: homepage-smoke"));

        let login = get_template("configurations/login-flow.yaml")
            .expect("login-flow.yaml should be embedded");
        assert!(login.contains("id: login-flow"));
    }

    #[test]
    fn test_get_goal_template() {
        let goal = get_template("goals/find-pricing.md").expect("find-pricing.md should be embedded");
        assert!(goal.starts_with("---"));
        assert!(goal.contains("success_criteria"));
    }

    #[test]
    fn test_get_nonexistent_template() {
        assert!(get_template("nonexistent.txt").is_none());
    }

    #[test]
    fn test_list_templates() {
        assert_eq!(
            list_templates("configurations/"),
            vec![
                "configurations/homepage-smoke.yaml".to_string(),
                "configurations/login-flow.yaml".to_string(),
            ]
        );
        assert_eq!(list_templates("goals/"), vec!["goals/find-pricing.md".to_string()]);
        assert_eq!(list_templates("").len(), 4);
    }
}
