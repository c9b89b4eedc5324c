use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ForgeError;
use crate::scan::source::{DomSource, PageSnapshot};

/// Default location of the Node side of the protocol.
pub const DEFAULT_SERVER_SCRIPT: &str = "node/scan_server.js";

/// Request sent to scan_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ScanRequest {
    Navigate { url: String },
    Ready { selector: String },
    Snapshot,
    Quit,
}

/// Response received from scan_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct ScanResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A persistent browser session backed by scan_server.js.
///
/// The Node process keeps one page open; commands are NDJSON over stdin,
/// responses NDJSON over stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    ready_selector: String,
    closed: bool,
}

impl BrowserSession {
    /// Spawn the scan server and wait for its hello line.
    pub fn launch(script: &str) -> Result<Self, ForgeError> {
        let mut child = Command::new("node")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ForgeError::SubprocessSpawn {
                script: script.to_string(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ForgeError::SessionIo(format!("failed to capture stdin of {}", script)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ForgeError::SessionIo(format!("failed to capture stdout of {}", script)))?;

        let mut session = BrowserSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            ready_selector: "body".to_string(),
            closed: false,
        };

        let hello = session.read_response()?;
        if !hello.ok || hello.ready != Some(true) {
            return Err(ForgeError::SessionProtocol {
                command: "launch".into(),
                error: hello
                    .error
                    .unwrap_or_else(|| "no ready signal from scan server".into()),
            });
        }

        debug!(script, "scan server launched");
        Ok(session)
    }

    /// Element that must exist and be visible before the page counts as ready.
    pub fn with_ready_selector(mut self, selector: impl Into<String>) -> Self {
        self.ready_selector = selector.into();
        self
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), ForgeError> {
        self.send_ok(&ScanRequest::Navigate { url: url.to_string() }, "navigate")?;
        Ok(())
    }

    pub fn quit(&mut self) -> Result<(), ForgeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // The process may already be gone; only the wait matters.
        let _ = self.send(&ScanRequest::Quit);
        self.child
            .wait()
            .map_err(|e| ForgeError::SessionIo(format!("waiting for scan server: {}", e)))?;
        Ok(())
    }

    fn send(&mut self, request: &ScanRequest) -> Result<ScanResponse, ForgeError> {
        let json = serde_json::to_string(request).map_err(|e| ForgeError::json("ScanRequest", e))?;

        writeln!(self.stdin, "{}", json)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| ForgeError::SessionIo(format!("writing to scan server: {}", e)))?;

        self.read_response()
    }

    fn read_response(&mut self) -> Result<ScanResponse, ForgeError> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| ForgeError::SessionIo(format!("reading from scan server: {}", e)))?;

        if line.trim().is_empty() {
            return Err(ForgeError::SessionIo(
                "empty response from scan server (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| ForgeError::json("scan server response", e))
    }

    fn send_ok(&mut self, request: &ScanRequest, command: &str) -> Result<ScanResponse, ForgeError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(ForgeError::SessionProtocol {
                command: command.into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }
}

impl DomSource for BrowserSession {
    fn is_ready(&mut self) -> Result<bool, ForgeError> {
        let request = ScanRequest::Ready {
            selector: self.ready_selector.clone(),
        };
        let response = self.send_ok(&request, "ready")?;
        Ok(response.ready.unwrap_or(false))
    }

    fn snapshot(&mut self) -> Result<PageSnapshot, ForgeError> {
        let response = self.send_ok(&ScanRequest::Snapshot, "snapshot")?;
        let data = response.data.ok_or_else(|| ForgeError::SessionProtocol {
            command: "snapshot".into(),
            error: "no data in snapshot response".into(),
        })?;
        serde_json::from_value(data).map_err(|e| ForgeError::json("snapshot payload", e))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!("scan server did not shut down cleanly: {}", e);
        }
    }
}
