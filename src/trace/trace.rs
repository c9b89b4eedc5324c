use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp_ms: u128,
    pub command: String,
    pub outcome: Outcome,

    pub detail: Option<String>,

    /// Outermost error first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_chain: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
}

impl RunEvent {
    fn now(command: &str, outcome: Outcome) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            command: command.to_string(),
            outcome,
            detail: None,
            error_chain: vec![],
            backtrace: None,
        }
    }

    pub fn success(command: &str) -> Self {
        Self::now(command, Outcome::Success)
    }

    /// A fatal error, with its full source chain and a backtrace of the caller.
    pub fn failure(command: &str, error: &anyhow::Error) -> Self {
        let mut event = Self::now(command, Outcome::Failure);
        event.error_chain = error.chain().map(|e| e.to_string()).collect();
        event.backtrace = Some(std::backtrace::Backtrace::force_capture().to_string());
        event
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
