use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::store::read_json;
use crate::dom::dom_model::DomElement;
use crate::error::ForgeError;

/// Everything the scanner needs from a loaded page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub elements: Vec<DomElement>,
}

/// A way to enumerate the DOM nodes of a loaded page.
pub trait DomSource {
    /// Whether the page has signalled it is loaded and its body is visible.
    fn is_ready(&mut self) -> Result<bool, ForgeError>;

    /// Enumerate the descendants of the page body.
    fn snapshot(&mut self) -> Result<PageSnapshot, ForgeError>;
}

// ============================================================================
// Snapshot file source
// ============================================================================

/// A snapshot previously captured to disk. Always ready.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DomSource for SnapshotFile {
    fn is_ready(&mut self) -> Result<bool, ForgeError> {
        Ok(true)
    }

    fn snapshot(&mut self) -> Result<PageSnapshot, ForgeError> {
        read_json(&self.path)
    }
}

// ============================================================================
// Readiness polling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ReadinessOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Poll `source` until it reports ready. A timeout is an error, never a silent continue.
pub fn wait_until_ready(source: &mut dyn DomSource, options: &ReadinessOptions) -> Result<(), ForgeError> {
    let start = Instant::now();
    let mut polls = 0u32;

    loop {
        polls += 1;
        if source.is_ready()? {
            debug!(polls, elapsed_ms = start.elapsed().as_millis() as u64, "page ready");
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            info!(polls, "page did not become ready before timeout");
            return Err(ForgeError::ReadinessTimeout {
                waited_ms: elapsed.as_millis(),
                polls,
            });
        }

        let remaining = options.timeout - elapsed;
        std::thread::sleep(options.poll_interval.min(remaining));
    }
}
