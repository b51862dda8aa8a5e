//! File-backed store.
//!
//! Layout under the store root:
//!
//! ```text
//! sessions/<id>.json        one TestSession per file
//! logs/<id>.jsonl           action log, one entry per line, append only
//! results/<id>.json         ExecutionResult
//! configurations/<id>.json  configurations saved through the store
//! ```

use crate::storage::base::{
    apply_update, upsert_configuration, StoreError, StoreResult, TestStore,
};
use async_trait::async_trait;
use sc_protocol::{ActionLogEntry, ExecutionResult, SessionUpdate, TestConfiguration, TestSession};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct FileStore {
    root: PathBuf,
    /// Configurations loaded from the project, listed before saved ones.
    seeded: Vec<TestConfiguration>,
    /// Serializes read-modify-write cycles and appends.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seeded: Vec::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_configurations(mut self, configurations: Vec<TestConfiguration>) -> Self {
        self.seeded = configurations;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, dir: &str, id: &str, ext: &str) -> StoreResult<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(dir).join(format!("{id}.{ext}")))
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
                StoreError::Serialization(format!("Failed to parse {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        ensure_parent(path).await?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn saved_configurations(&self) -> StoreResult<Vec<TestConfiguration>> {
        let dir = self.root.join("configurations");
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut configs = Vec::new();
        for path in paths {
            if let Some(config) = Self::read_json(&path).await? {
                configs.push(config);
            }
        }
        Ok(configs)
    }
}

/// Ids become file names: ASCII alphanumerics, `-`, `_` and `.` only.
fn validate_id(id: &str) -> StoreResult<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

async fn ensure_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

#[async_trait]
impl TestStore for FileStore {
    async fn create_test_session(&self, session: TestSession) -> StoreResult<TestSession> {
        let path = self.path_for("sessions", &session.id, "json")?;
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::AlreadyExists {
                kind: "Session",
                id: session.id,
            });
        }
        Self::write_json(&path, &session).await?;
        Ok(session)
    }

    async fn update_test_session(&self, id: &str, update: SessionUpdate) -> StoreResult<TestSession> {
        let path = self.path_for("sessions", id, "json")?;
        let _guard = self.write_lock.lock().await;
        let mut session: TestSession =
            Self::read_json(&path)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    kind: "Session",
                    id: id.to_string(),
                })?;
        apply_update(&mut session, update);
        Self::write_json(&path, &session).await?;
        Ok(session)
    }

    async fn get_test_session(&self, id: &str) -> StoreResult<Option<TestSession>> {
        let path = self.path_for("sessions", id, "json")?;
        Self::read_json(&path).await
    }

    async fn log_action(&self, entry: ActionLogEntry) -> StoreResult<()> {
        let path = self.path_for("logs", &entry.session_id, "jsonl")?;
        let mut line =
            serde_json::to_string(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        ensure_parent(&path).await?;
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)
    }

    async fn get_action_logs(&self, session_id: &str) -> StoreResult<Vec<ActionLogEntry>> {
        let path = self.path_for("logs", session_id, "jsonl")?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    StoreError::Serialization(format!(
                        "Invalid log entry {} in {}: {e}",
                        i + 1,
                        path.display()
                    ))
                })
            })
            .collect()
    }

    async fn save_test_result(&self, result: &ExecutionResult) -> StoreResult<()> {
        let path = self.path_for("results", &result.session_id, "json")?;
        let _guard = self.write_lock.lock().await;
        Self::write_json(&path, result).await
    }

    async fn get_test_result(&self, session_id: &str) -> StoreResult<Option<ExecutionResult>> {
        let path = self.path_for("results", session_id, "json")?;
        Self::read_json(&path).await
    }

    async fn list_configurations(&self) -> StoreResult<Vec<TestConfiguration>> {
        let mut configs = self.seeded.clone();
        for saved in self.saved_configurations().await? {
            upsert_configuration(&mut configs, saved);
        }
        Ok(configs)
    }

    async fn save_configuration(&self, config: TestConfiguration) -> StoreResult<()> {
        let path = self.path_for("configurations", &config.id, "json")?;
        let _guard = self.write_lock.lock().await;
        Self::write_json(&path, &config).await
    }
}
