use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::session::DEFAULT_SERVER_SCRIPT;
use crate::error::ForgeError;
use crate::gherkin::classifier::{CueSet, StepClassifier};
use crate::gherkin::feature::FeatureSettings;
use crate::scan::source::ReadinessOptions;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bdd-forge.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "bdd-forge",
    version,
    about = "Scan pages, build locator maps and generate Gherkin suites"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: bdd-forge.yaml in current dir)
    #[arg(long, global = true, env = "BDD_FORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a page and write an element inventory
    Scan {
        /// URL to open in the browser session
        #[arg(long, conflicts_with = "snapshot")]
        url: Option<String>,

        /// Previously captured snapshot JSON to scan instead of a live page
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Directory for scan artifacts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Selector that must be visible before the page counts as loaded
        #[arg(long)]
        ready_selector: Option<String>,

        /// Readiness timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Build the locator map from a scan
    Optimize {
        /// Scan artifact (default: newest in the scans directory)
        #[arg(long)]
        scan: Option<PathBuf>,

        /// Navigation map to merge (default: configured path, if present)
        #[arg(long)]
        navigation: Option<PathBuf>,

        /// Output path for the locator map
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify free-text instructions into Given/When/Then steps
    Classify {
        /// Instructions to classify
        instructions: Vec<String>,

        /// File with one instruction per line
        #[arg(long)]
        file: Option<PathBuf>,

        /// Placeholder value, `name=value` (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Generate feature files and step definitions from test cases
    Generate {
        /// Cases JSON (section -> list of cases)
        #[arg(long)]
        cases: Option<PathBuf>,

        #[arg(long)]
        features_dir: Option<PathBuf>,

        #[arg(long)]
        steps_dir: Option<PathBuf>,

        /// Locator map used to bind step bodies to selectors
        #[arg(long)]
        locators: Option<PathBuf>,

        /// Print what would be written without touching files
        #[arg(long)]
        dry_run: bool,
    },

    /// Report duplicated, unused and problematic step definitions
    Audit {
        #[arg(long)]
        steps_dir: Option<PathBuf>,

        #[arg(long)]
        features_dir: Option<PathBuf>,

        /// Also write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Fix registration keywords, imports, duplicates and localized features
    Repair {
        #[arg(long)]
        steps_dir: Option<PathBuf>,

        #[arg(long)]
        features_dir: Option<PathBuf>,

        /// Report the edits without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Scan { .. } => "scan",
            Commands::Optimize { .. } => "optimize",
            Commands::Classify { .. } => "classify",
            Commands::Generate { .. } => "generate",
            Commands::Audit { .. } => "audit",
            Commands::Repair { .. } => "repair",
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty placeholder name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `bdd-forge.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub feature: FeatureSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub scans_dir: PathBuf,
    pub navigation_map: PathBuf,
    pub locators: PathBuf,
    pub cases: PathBuf,
    pub features_dir: PathBuf,
    pub steps_dir: PathBuf,

    /// Generated page objects; existing classes here are never regenerated
    pub pages_dir: PathBuf,

    pub run_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scans_dir: PathBuf::from("artifacts/scans"),
            navigation_map: PathBuf::from("artifacts/navigation_map.json"),
            locators: PathBuf::from("artifacts/locators.json"),
            cases: PathBuf::from("casos_prueba.json"),
            features_dir: PathBuf::from("cypress/e2e/features"),
            steps_dir: PathBuf::from("cypress/e2e/step_definitions"),
            pages_dir: PathBuf::from("cypress/pages/generated"),
            run_log: PathBuf::from("artifacts/bdd-forge.log.jsonl"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_server_script")]
    pub server_script: String,

    #[serde(default = "default_ready_selector")]
    pub ready_selector: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            server_script: default_server_script(),
            ready_selector: default_ready_selector(),
        }
    }
}

impl ScanConfig {
    pub fn readiness(&self) -> ReadinessOptions {
        ReadinessOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

/// Extra cue patterns appended after the built-in ones, plus placeholder values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub given_cues: Vec<String>,
    pub when_cues: Vec<String>,
    pub then_cues: Vec<String>,
    pub vars: HashMap<String, String>,
}

impl ClassifierConfig {
    pub fn build(&self) -> Result<StepClassifier, ForgeError> {
        let cues = CueSet::builtin().with_extra(&self.given_cues, &self.when_cues, &self.then_cues)?;
        Ok(StepClassifier::with_cues(cues))
    }
}

// Serde default helpers
fn default_timeout_ms() -> u64 { 10_000 }
fn default_poll_interval_ms() -> u64 { 250 }
fn default_server_script() -> String { DEFAULT_SERVER_SCRIPT.to_string() }
fn default_ready_selector() -> String { "body".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Parse a config file. `Ok(None)` when the file does not exist.
pub fn read_config(path: &Path) -> Result<Option<AppConfig>, ForgeError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ForgeError::io(path, e)),
    };

    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| ForgeError::Config {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Load config from a YAML file. Returns defaults if the file is missing or malformed.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let config_path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    match read_config(config_path) {
        Ok(Some(config)) => {
            debug!(path = %config_path.display(), "config loaded");
            config
        }
        Ok(None) => AppConfig::default(),
        Err(e) => {
            warn!(error = %e, "ignoring config file, using defaults");
            AppConfig::default()
        }
    }
}
