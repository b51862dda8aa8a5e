//! Browser driver process speaking JSON lines over stdin/stdout.
//!
//! Every request is one line:
//!
//! ```json
//! {"id": 1, "op": "click", "params": {"selector": "#submit"}}
//! ```
//!
//! and the driver answers each request with one line carrying the same id:
//!
//! ```json
//! {"id": 1, "ok": true, "result": null}
//! {"id": 2, "ok": false, "error": "element not found"}
//! ```
//!
//! Lines that are empty or carry another id are skipped. One driver process
//! is spawned per session and owned by the returned [`DriverBrowser`].

use crate::automation::base::{AutomationError, AutomationProvider, BrowserAutomation};
use async_trait::async_trait;
use base64::Engine;
use sc_protocol::{CommandSettings, PageSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct DriverResponse {
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Spawns the configured driver command for each session.
pub struct DriverProvider {
    settings: CommandSettings,
    working_dir: Option<PathBuf>,
    call_timeout: Duration,
}

impl DriverProvider {
    pub fn new(settings: CommandSettings) -> Self {
        Self {
            settings,
            working_dir: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

#[async_trait]
impl AutomationProvider for DriverProvider {
    async fn check_availability(&self) -> bool {
        which::which(&self.settings.command).is_ok()
    }

    async fn open(&self, session_id: &str) -> Result<Box<dyn BrowserAutomation>, AutomationError> {
        let mut cmd = Command::new(&self.settings.command);
        cmd.args(&self.settings.args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            AutomationError::NotAvailable(format!(
                "Failed to spawn driver '{}': {e}",
                self.settings.command
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AutomationError::Protocol("Failed to capture driver stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AutomationError::Protocol("Failed to capture driver stdout".to_string()))?;

        let mut browser = DriverBrowser {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 0,
            call_timeout: self.call_timeout,
        };
        browser
            .request("open", json!({ "session_id": session_id }))
            .await?;
        debug!(session_id, command = %self.settings.command, "Driver session opened");
        Ok(Box::new(browser))
    }
}

/// One driver process bound to one browser session.
pub struct DriverBrowser {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    call_timeout: Duration,
}

impl DriverBrowser {
    async fn send(&mut self, request: &Value) -> Result<(), AutomationError> {
        let line = serde_json::to_string(request)
            .map_err(|e| AutomationError::Protocol(format!("JSON serialize error: {e}")))?;
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AutomationError::CallFailed(format!("Failed to write to driver: {e}")))?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|e| AutomationError::CallFailed(format!("Failed to write newline: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| AutomationError::CallFailed(format!("Failed to flush driver stdin: {e}")))
    }

    async fn receive(&mut self, id: u64) -> Result<DriverResponse, AutomationError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| AutomationError::CallFailed(format!("Failed to read from driver: {e}")))?
                .ok_or_else(|| AutomationError::CallFailed("Driver exited".to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let response: DriverResponse = serde_json::from_str(&line).map_err(|e| {
                AutomationError::Protocol(format!("Failed to parse JSON: {e} (line: {line})"))
            })?;
            if response.id == Some(id) {
                return Ok(response);
            }
            debug!(expected = id, got = ?response.id, "Skipping unrelated driver line");
        }
    }

    /// Send one request and wait for its response.
    async fn request(&mut self, op: &str, params: Value) -> Result<Value, AutomationError> {
        self.next_id += 1;
        let id = self.next_id;
        self.send(&json!({ "id": id, "op": op, "params": params }))
            .await?;

        let response = tokio::time::timeout(self.call_timeout, self.receive(id))
            .await
            .map_err(|_| {
                AutomationError::CallFailed(format!(
                    "Driver did not answer '{op}' within {} ms",
                    self.call_timeout.as_millis()
                ))
            })??;

        if response.ok {
            Ok(response.result)
        } else {
            Err(AutomationError::CallFailed(
                response
                    .error
                    .unwrap_or_else(|| format!("Driver rejected '{op}'")),
            ))
        }
    }

    async fn request_bool(&mut self, op: &str, selector: &str) -> Result<bool, AutomationError> {
        let result = self.request(op, json!({ "selector": selector })).await?;
        result
            .as_bool()
            .ok_or_else(|| AutomationError::Protocol(format!("'{op}' expected a boolean, got {result}")))
    }

    async fn request_string(&mut self, op: &str, selector: &str) -> Result<String, AutomationError> {
        let result = self.request(op, json!({ "selector": selector })).await?;
        match result {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(AutomationError::Protocol(format!(
                "'{op}' expected a string, got {other}"
            ))),
        }
    }
}

#[async_trait]
impl BrowserAutomation for DriverBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.request("navigate", json!({ "url": url })).await.map(|_| ())
    }

    async fn click(&mut self, selector: &str) -> Result<(), AutomationError> {
        self.request("click", json!({ "selector": selector }))
            .await
            .map(|_| ())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), AutomationError> {
        self.request("type", json!({ "selector": selector, "text": text }))
            .await
            .map(|_| ())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), AutomationError> {
        self.request("select", json!({ "selector": selector, "value": value }))
            .await
            .map(|_| ())
    }

    async fn take_screenshot(&mut self) -> Result<Vec<u8>, AutomationError> {
        let result = self.request("screenshot", Value::Null).await?;
        let encoded = result
            .as_str()
            .or_else(|| result.get("data").and_then(Value::as_str))
            .ok_or_else(|| AutomationError::Protocol("Screenshot payload is not base64 text".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AutomationError::Protocol(format!("Invalid screenshot encoding: {e}")))
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, AutomationError> {
        let result = self.request("snapshot", Value::Null).await?;
        serde_json::from_value(result)
            .map_err(|e| AutomationError::Protocol(format!("Invalid snapshot: {e}")))
    }

    async fn element_exists(&mut self, selector: &str) -> Result<bool, AutomationError> {
        self.request_bool("exists", selector).await
    }

    async fn element_visible(&mut self, selector: &str) -> Result<bool, AutomationError> {
        self.request_bool("visible", selector).await
    }

    async fn element_text(&mut self, selector: &str) -> Result<String, AutomationError> {
        self.request_string("text", selector).await
    }

    async fn element_value(&mut self, selector: &str) -> Result<String, AutomationError> {
        self.request_string("value", selector).await
    }

    async fn element_count(&mut self, selector: &str) -> Result<usize, AutomationError> {
        let result = self.request("count", json!({ "selector": selector })).await?;
        result
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| AutomationError::Protocol(format!("'count' expected an integer, got {result}")))
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AutomationError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.request(
            "wait_for",
            json!({ "selector": selector, "timeout_ms": timeout_ms }),
        )
        .await
        .map(|_| ())
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        let goodbye = self.request("close", Value::Null).await;
        let _ = self.stdin.shutdown().await;

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Driver exited"),
            _ => {
                warn!("Driver did not exit after close, killing it");
                self.child
                    .kill()
                    .await
                    .map_err(|e| AutomationError::CallFailed(format!("Failed to kill driver: {e}")))?;
            }
        }
        goodbye.map(|_| ())
    }
}
