//! Builds the runtime objects a front end needs from a loaded [`AppConfig`].

use crate::automation::{AutomationProvider, DriverProvider, MockBrowser, MockProvider};
use crate::config::loader::PROJECT_DIR;
use crate::config::models::AppConfig;
use crate::judge::{CommandJudge, KeywordJudge, PageJudge};
use crate::state::SessionManager;
use crate::storage::FileStore;
use anyhow::{bail, Result};
use sc_protocol::Event;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Directory for run artifacts: `[storage] dir`, relative to `root`, or
/// `.sitecheck/runs`.
pub fn storage_dir(root: &Path, config: &AppConfig) -> PathBuf {
    match config.global.storage.dir.as_deref() {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => root.join(dir),
        None => root.join(PROJECT_DIR).join("runs"),
    }
}

/// File store rooted at [`storage_dir`], seeded with the loaded configurations.
pub fn build_store(root: &Path, config: &AppConfig) -> FileStore {
    FileStore::new(storage_dir(root, config)).with_configurations(config.configurations.clone())
}

/// The `[automation]` driver, or an in-memory blank browser for dry runs.
pub async fn build_provider(
    root: &Path,
    config: &AppConfig,
    dry_run: bool,
) -> Result<Arc<dyn AutomationProvider>> {
    if dry_run {
        debug!("Using in-memory browser for dry run");
        return Ok(Arc::new(MockProvider::new(MockBrowser::blank())));
    }

    let Some(settings) = config.global.automation.clone() else {
        bail!("No [automation] command configured in {PROJECT_DIR}/config.toml; use --dry-run to run without a browser");
    };
    let provider = DriverProvider::new(settings).with_working_dir(root);
    if !provider.check_availability().await {
        bail!("Automation driver is not available on PATH");
    }
    Ok(Arc::new(provider))
}

/// The `[judge]` command, or the built-in keyword judge.
pub fn build_judge(root: &Path, config: &AppConfig) -> Arc<dyn PageJudge> {
    match config.global.judge.clone() {
        Some(settings) => {
            debug!(command = %settings.command, "Using external judge");
            Arc::new(CommandJudge::new(settings).with_working_dir(root))
        }
        None => Arc::new(KeywordJudge::new()),
    }
}

/// A fully wired [`SessionManager`] for the project at `root`.
pub async fn build_manager(
    root: &Path,
    config: &AppConfig,
    dry_run: bool,
    events_tx: mpsc::Sender<Event>,
) -> Result<SessionManager> {
    let store = Arc::new(build_store(root, config));
    let provider = build_provider(root, config, dry_run).await?;
    let judge = build_judge(root, config);
    Ok(SessionManager::new(store, provider, judge, events_tx)
        .with_settings(config.global.executor.clone()))
}
