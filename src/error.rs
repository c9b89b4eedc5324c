use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    /// Reading or writing an artifact failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required JSON input could not be parsed, or an artifact could not be serialized
    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The YAML config file exists but is not valid
    #[error("invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A configured classifier cue is not a valid regular expression
    #[error("invalid cue pattern '{pattern}': {source}")]
    InvalidCuePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The page never reported ready within the configured timeout
    #[error("page not ready after {waited_ms} ms ({polls} polls)")]
    ReadinessTimeout { waited_ms: u128, polls: u32 },

    /// Scan server process failed to spawn
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Scan server answered with an error or an unexpected shape
    #[error("scan server command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// Pipe to the scan server broke
    #[error("scan server I/O: {0}")]
    SessionIo(String),
}

impl ForgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForgeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        ForgeError::Json {
            context: context.into(),
            source,
        }
    }
}
