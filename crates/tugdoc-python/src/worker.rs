//! Python worker manager: spawns and talks to a long-lived Python subprocess.
//!
//! - Materialize an embedded script into a private temp directory
//! - Spawn it with the configured interpreter
//! - Wait for the ready message
//! - Send requests and receive responses, respawning after a crash
//!
//! Protocol: JSON-lines over stdin/stdout
//! - Ready: `{"status": "ready", "version": "<v>", ...}`
//! - Request: `{"id": <int>, "op": "<operation>", ...params...}`
//! - Response: `{"id": <int>, "status": "ok"|"error", ...result...}`
//!
//! A `WorkerHandle` is not shareable; callers that need concurrent access
//! put it behind a single owning thread (see [`crate::nlp`]).

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during worker operations.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker process failed to start.
    #[error("failed to spawn worker: {reason}")]
    SpawnFailed { reason: String },

    /// Worker process crashed (broken pipe or EOF).
    #[error("worker process crashed: {reason}")]
    WorkerCrashed { reason: String },

    /// Worker returned an error response.
    #[error("worker error: {code} - {message}")]
    WorkerResponseError { code: String, message: String },

    /// Invalid response from worker.
    #[error("invalid worker response: {reason}")]
    InvalidResponse { reason: String },

    /// IO error during worker communication.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker not started.
    #[error("worker not started")]
    NotStarted,

    /// Python interpreter not found.
    #[error("Python interpreter not found: {path}")]
    PythonNotFound { path: PathBuf },
}

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

// ============================================================================
// Protocol Types
// ============================================================================

/// Worker ready message (sent on startup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyMessage {
    pub status: String,
    #[serde(default)]
    pub version: String,
}

/// Generic worker response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Request ID (echoed back).
    pub id: Option<u64>,
    /// Status: "ok" or "error".
    pub status: String,
    /// Error code (if status == "error").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error message (if status == "error").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional data (operation-specific).
    #[serde(flatten)]
    pub data: serde_json::Value,
}

// ============================================================================
// Worker Script
// ============================================================================

/// A Python script embedded in the binary.
#[derive(Debug, Clone, Copy)]
pub struct WorkerScript {
    /// File name the script is materialized under.
    pub file_name: &'static str,
    /// Script source.
    pub source: &'static str,
}

// ============================================================================
// Worker Handle
// ============================================================================

/// Handle to a running worker process.
pub struct WorkerHandle {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_reader: Option<BufReader<ChildStdout>>,
    next_request_id: u64,
    python_path: PathBuf,
    args: Vec<String>,
    /// Keeps the materialized script alive for respawns.
    script_dir: TempDir,
    script_path: PathBuf,
    worker_version: Option<String>,
}

impl WorkerHandle {
    /// Check if the worker is running.
    pub fn is_running(&self) -> bool {
        self.child.is_some() && self.stdin.is_some() && self.stdout_reader.is_some()
    }

    /// Version string from the ready message.
    pub fn worker_version(&self) -> Option<&str> {
        self.worker_version.as_deref()
    }

    /// Directory holding the materialized script.
    pub fn script_dir(&self) -> &Path {
        self.script_dir.path()
    }

    /// Send a request and wait for its response.
    pub fn send_request(&mut self, op: &str, params: serde_json::Value) -> WorkerResult<WorkerResponse> {
        if !self.is_running() {
            debug!(op, "worker not running, respawning");
            self.respawn()?;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut request = serde_json::json!({
            "id": request_id,
            "op": op,
        });

        if let serde_json::Value::Object(params_map) = params {
            if let serde_json::Value::Object(ref mut req_map) = request {
                for (k, v) in params_map {
                    req_map.insert(k, v);
                }
            }
        }

        let request_line = serde_json::to_string(&request)?;
        let stdin = self.stdin.as_mut().ok_or(WorkerError::NotStarted)?;

        if let Err(e) = writeln!(stdin, "{}", request_line).and_then(|_| stdin.flush()) {
            self.mark_crashed();
            return Err(WorkerError::WorkerCrashed {
                reason: e.to_string(),
            });
        }

        loop {
            let reader = self.stdout_reader.as_mut().ok_or(WorkerError::NotStarted)?;
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    self.mark_crashed();
                    return Err(WorkerError::WorkerCrashed {
                        reason: "unexpected EOF".to_string(),
                    });
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let response: WorkerResponse =
                        serde_json::from_str(line).map_err(|e| WorkerError::InvalidResponse {
                            reason: format!("JSON parse error: {}: {}", e, line),
                        })?;

                    if response.id != Some(request_id) {
                        debug!(expected = request_id, got = ?response.id, "skipping stale response");
                        continue;
                    }

                    if response.status == "error" {
                        return Err(WorkerError::WorkerResponseError {
                            code: response.error_code.clone().unwrap_or_default(),
                            message: response.message.clone().unwrap_or_default(),
                        });
                    }

                    return Ok(response);
                }
                Err(e) => {
                    self.mark_crashed();
                    return Err(WorkerError::WorkerCrashed {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Gracefully shut the worker down.
    pub fn shutdown(&mut self) -> WorkerResult<()> {
        if !self.is_running() {
            return Ok(());
        }

        let _ = self.send_request("shutdown", serde_json::json!({}));
        self.stdin = None;
        self.stdout_reader = None;

        if let Some(mut child) = self.child.take() {
            std::thread::sleep(std::time::Duration::from_millis(100));
            match child.try_wait() {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => {
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Internal Methods
    // ========================================================================

    fn mark_crashed(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.stdin = None;
        self.stdout_reader = None;
    }

    fn respawn(&mut self) -> WorkerResult<()> {
        self.mark_crashed();
        warn!(script = %self.script_path.display(), "respawning worker");
        spawn_process(self)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

// ============================================================================
// Spawn Function
// ============================================================================

/// Spawn a worker running `script` with extra command-line `args`.
///
/// The interpreter is looked up on `PATH` when it is not a path itself.
pub fn spawn_worker(python: &str, script: WorkerScript, args: &[String]) -> WorkerResult<WorkerHandle> {
    let python_path = resolve_python(python)?;

    let script_dir = tempfile::Builder::new().prefix("tugdoc-worker-").tempdir()?;
    let script_path = script_dir.path().join(script.file_name);
    std::fs::write(&script_path, script.source)?;

    let mut handle = WorkerHandle {
        child: None,
        stdin: None,
        stdout_reader: None,
        next_request_id: 1,
        python_path,
        args: args.to_vec(),
        script_dir,
        script_path,
        worker_version: None,
    };

    spawn_process(&mut handle)?;
    Ok(handle)
}

/// Resolve the interpreter to an executable path.
pub fn resolve_python(python: &str) -> WorkerResult<PathBuf> {
    let candidate = Path::new(python);
    if candidate.components().count() > 1 {
        return if candidate.exists() {
            Ok(candidate.to_path_buf())
        } else {
            Err(WorkerError::PythonNotFound {
                path: candidate.to_path_buf(),
            })
        };
    }
    which::which(python).map_err(|_| WorkerError::PythonNotFound {
        path: candidate.to_path_buf(),
    })
}

fn spawn_process(handle: &mut WorkerHandle) -> WorkerResult<()> {
    let mut child = Command::new(&handle.python_path)
        .arg(&handle.script_path)
        .args(&handle.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| WorkerError::SpawnFailed {
            reason: e.to_string(),
        })?;

    let stdin = child.stdin.take().ok_or_else(|| WorkerError::SpawnFailed {
        reason: "failed to capture stdin".to_string(),
    })?;
    let stdout = child.stdout.take().ok_or_else(|| WorkerError::SpawnFailed {
        reason: "failed to capture stdout".to_string(),
    })?;

    handle.child = Some(child);
    handle.stdin = Some(stdin);
    handle.stdout_reader = Some(BufReader::new(stdout));

    if let Err(err) = wait_for_ready(handle) {
        handle.mark_crashed();
        return Err(err);
    }
    debug!(version = ?handle.worker_version, "worker ready");
    Ok(())
}

fn wait_for_ready(handle: &mut WorkerHandle) -> WorkerResult<()> {
    let reader = handle.stdout_reader.as_mut().ok_or(WorkerError::NotStarted)?;

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                return Err(WorkerError::SpawnFailed {
                    reason: "worker exited before sending ready message".to_string(),
                });
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if let Ok(ready) = serde_json::from_str::<ReadyMessage>(line) {
                    if ready.status == "ready" {
                        handle.worker_version = Some(ready.version);
                        return Ok(());
                    }
                }

                if let Ok(error) = serde_json::from_str::<WorkerResponse>(line) {
                    if error.status == "error" {
                        return Err(WorkerError::SpawnFailed {
                            reason: error.message.unwrap_or_else(|| "unknown error".to_string()),
                        });
                    }
                }
            }
            Err(e) => {
                return Err(WorkerError::SpawnFailed {
                    reason: format!("error reading from worker: {}", e),
                });
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::find_python;

    const ECHO_SCRIPT: WorkerScript = WorkerScript {
        file_name: "echo_worker.py",
        source: r#"
import json, sys
print(json.dumps({"status": "ready", "version": "test"}), flush=True)
for line in sys.stdin:
    req = json.loads(line)
    if req["op"] == "shutdown":
        print(json.dumps({"id": req["id"], "status": "ok"}), flush=True)
        break
    if req["op"] == "fail":
        print(json.dumps({"id": req["id"], "status": "error", "error_code": "Boom", "message": "asked to"}), flush=True)
        continue
    if req["op"] == "die":
        sys.exit(1)
    print(json.dumps({"id": req["id"], "status": "ok", "echo": req.get("value")}), flush=True)
"#,
    };

    fn spawn_echo() -> Option<WorkerHandle> {
        let Some(python) = find_python() else {
            eprintln!("Skipping test: Python not found");
            return None;
        };
        Some(spawn_worker(&python.to_string_lossy(), ECHO_SCRIPT, &[]).unwrap())
    }

    #[test]
    fn test_missing_interpreter() {
        let err = resolve_python("/definitely/not/python3").unwrap_err();
        assert!(matches!(err, WorkerError::PythonNotFound { .. }));
    }

    #[test]
    fn test_worker_spawn_and_ready() {
        let Some(handle) = spawn_echo() else {
            return;
        };
        assert!(handle.is_running());
        assert_eq!(handle.worker_version(), Some("test"));
        assert!(handle.script_dir().join("echo_worker.py").exists());
    }

    #[test]
    fn test_worker_request_merges_params() {
        let Some(mut handle) = spawn_echo() else {
            return;
        };
        let response = handle
            .send_request("echo", serde_json::json!({"value": "hello"}))
            .unwrap();
        assert_eq!(response.data.get("echo").and_then(|v| v.as_str()), Some("hello"));
    }

    #[test]
    fn test_worker_error_response() {
        let Some(mut handle) = spawn_echo() else {
            return;
        };
        let err = handle.send_request("fail", serde_json::json!({})).unwrap_err();
        match err {
            WorkerError::WorkerResponseError { code, .. } => assert_eq!(code, "Boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_worker_respawn_on_crash() {
        let Some(mut handle) = spawn_echo() else {
            return;
        };
        assert!(handle.send_request("die", serde_json::json!({})).is_err());
        assert!(!handle.is_running());

        let response = handle
            .send_request("echo", serde_json::json!({"value": 3}))
            .unwrap();
        assert_eq!(response.data.get("echo").and_then(|v| v.as_u64()), Some(3));
    }

    #[test]
    fn test_worker_shutdown() {
        let Some(mut handle) = spawn_echo() else {
            return;
        };
        handle.shutdown().unwrap();
        assert!(!handle.is_running());
    }
}
