//! Subprocess executor for command-backed judges.
//!
//! Spawns a command, writes an optional payload to its stdin and parses its
//! stdout as JSON Lines / NDJSON. Stderr is drained alongside; its tail is
//! reported when the command exits unsuccessfully.

use crate::judge::base::JudgeError;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_stream::Stream;

/// Bytes of stderr kept for error messages.
const STDERR_TAIL_BYTES: usize = 2048;

pub struct CliExecutor;

impl CliExecutor {
    /// Execute `command` and stream its stdout as JSON values.
    ///
    /// Empty lines are skipped. Lines that fail to parse yield
    /// `JudgeError::InvalidResponse` and the stream continues.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sc_core::judge::cli_executor::CliExecutor;
    /// use tokio_stream::StreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let stream = CliExecutor::execute(
    ///         "echo".to_string(),
    ///         vec![r#"{"satisfied":true}"#.to_string()],
    ///         None,
    ///         None,
    ///     );
    ///
    ///     let values: Vec<_> = stream.collect().await;
    ///     println!("Got {} values", values.len());
    /// }
    /// ```
    pub fn execute(
        command: String,
        args: Vec<String>,
        working_dir: Option<PathBuf>,
        input: Option<String>,
    ) -> Pin<Box<dyn Stream<Item = Result<serde_json::Value, JudgeError>> + Send>> {
        let stream = async_stream::stream! {
            let mut cmd = Command::new(&command);
            cmd.args(&args);
            if let Some(dir) = &working_dir {
                cmd.current_dir(dir);
            }
            cmd.stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() });
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.kill_on_drop(true);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    yield Err(JudgeError::NotAvailable(format!(
                        "Failed to spawn command '{command}': {e}"
                    )));
                    return;
                }
            };

            let stderr_tail = child.stderr.take().map(|stderr| tokio::spawn(drain_tail(stderr)));

            if let (Some(payload), Some(mut stdin)) = (input, child.stdin.take()) {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    yield Err(JudgeError::Failed(format!("Failed to write to stdin: {e}")));
                    return;
                }
                // Dropping stdin closes it so the command sees EOF.
                drop(stdin);
            }

            let stdout = match child.stdout.take() {
                Some(stdout) => stdout,
                None => {
                    yield Err(JudgeError::Failed("Failed to capture stdout".to_string()));
                    return;
                }
            };

            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<serde_json::Value>(&line) {
                    Ok(value) => yield Ok(value),
                    Err(e) => {
                        yield Err(JudgeError::InvalidResponse(format!(
                            "Failed to parse JSON: {e} (line: {line})"
                        )));
                    }
                }
            }

            match child.wait().await {
                Ok(status) if !status.success() => {
                    let tail = collect_tail(stderr_tail).await;
                    let message = if tail.is_empty() {
                        format!("Command '{command}' exited with {status}")
                    } else {
                        format!("Command '{command}' exited with {status}: {tail}")
                    };
                    yield Err(JudgeError::Failed(message));
                }
                Ok(_) => {}
                Err(e) => {
                    yield Err(JudgeError::Failed(format!("Failed to wait for '{command}': {e}")));
                }
            }
        };

        Box::pin(stream)
    }
}

/// Read `reader` to EOF, keeping only the last [`STDERR_TAIL_BYTES`].
async fn drain_tail<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut tail = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    tail.drain(..tail.len() - STDERR_TAIL_BYTES);
                }
            }
        }
    }
    tail
}

async fn collect_tail(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    match handle {
        Some(handle) => handle
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .unwrap_or_default(),
        None => String::new(),
    }
}
