use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::gherkin::classifier::{GeneratedStep, Rejection, StepClassifier};
use crate::gherkin::keyword::{Keyword, StepKind};
use crate::locator::optimizer::sanitize;

static NUMBERED_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\d+\)\s*").expect("valid regex"));

const INDENT: &str = "    ";

// ============================================================================
// Input
// ============================================================================

/// A manual test case: a title and its free-text instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(alias = "titulo")]
    pub title: String,

    #[serde(alias = "pasos", default)]
    pub steps: Vec<String>,
}

/// Section name → cases, as read from the cases file.
pub type CasesFile = BTreeMap<String, Vec<TestCase>>;

/// Split instructions that were pasted as one `1) a 2) b` string.
pub fn split_numbered_steps(text: &str) -> Vec<String> {
    NUMBERED_SPLIT
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Snake-case stem for the files generated from a section.
pub fn feature_file_name(section: &str) -> String {
    let stem = sanitize(section);
    if stem.is_empty() { "section".to_string() } else { stem }
}

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLine {
    pub keyword: Keyword,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplesTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    pub tags: Vec<String>,
    pub steps: Vec<StepLine>,
    pub examples: Option<ExamplesTable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDocument {
    pub title: String,
    pub tags: Vec<String>,
    pub background: Vec<StepLine>,
    pub scenarios: Vec<Scenario>,

    /// Every distinct step the document uses, for step-definition output
    #[serde(skip)]
    pub generated: Vec<GeneratedStep>,
}

impl FeatureDocument {
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.tags.is_empty() {
            let _ = writeln!(out, "{}", self.tags.join(" "));
        }
        let _ = writeln!(out, "Feature: {}", self.title);

        if !self.background.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "{INDENT}Background:");
            for line in &self.background {
                let _ = writeln!(out, "{INDENT}{INDENT}{} {}", line.keyword, line.text);
            }
        }

        for scenario in &self.scenarios {
            out.push('\n');
            if !scenario.tags.is_empty() {
                let _ = writeln!(out, "{INDENT}{}", scenario.tags.join(" "));
            }
            let header = if scenario.examples.is_some() {
                "Scenario Outline"
            } else {
                "Scenario"
            };
            let _ = writeln!(out, "{INDENT}{header}: {}", scenario.title);
            for line in &scenario.steps {
                let _ = writeln!(out, "{INDENT}{INDENT}{} {}", line.keyword, line.text);
            }
            if let Some(examples) = &scenario.examples {
                out.push('\n');
                let _ = writeln!(out, "{INDENT}{INDENT}Examples:");
                render_table(&mut out, examples);
            }
        }

        out
    }
}

fn render_table(out: &mut String, table: &ExamplesTable) {
    let columns = table.header.len();
    let mut widths: Vec<usize> = table.header.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |out: &mut String, cells: &[String]| {
        let _ = write!(out, "{INDENT}{INDENT}{INDENT}|");
        for (i, &width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(out, " {cell:<width$} |");
        }
        out.push('\n');
    };

    render_row(out, &table.header);
    for row in &table.rows {
        render_row(out, row);
    }
}

// ============================================================================
// Generation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Appended to the section name in the `Feature:` line
    pub title_suffix: String,

    /// Full Gherkin lines, keyword included
    pub background: Vec<String>,

    /// Case-insensitive substrings; matching instructions are dropped
    pub skip_phrases: Vec<String>,

    pub examples_header: Vec<String>,
    pub examples_row: Vec<String>,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            title_suffix: "Automated Tests".to_string(),
            background: vec![
                "Given I open the site".to_string(),
                "And I wait for the page to load".to_string(),
            ],
            skip_phrases: vec![
                "open the browser".to_string(),
                "enter the url".to_string(),
                "abrir el navegador".to_string(),
                "ingresar la url".to_string(),
            ],
            examples_header: vec!["user".to_string(), "pass".to_string()],
            examples_row: vec!["standard_user".to_string(), "secret_sauce".to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("section '{section}', case '{case}': step '{step}' rejected: {reason}")]
    RejectedStep {
        section: String,
        case: String,
        step: String,
        reason: Rejection,
    },

    #[error("background line '{line}' has no Given/When/Then/And/But keyword")]
    InvalidBackground { line: String },

    #[error("background line '{line}' rejected: {reason}")]
    RejectedBackground { line: String, reason: Rejection },

    #[error("section '{section}': rendered feature is malformed at line {line}: {issue}")]
    Malformed { section: String, line: usize, issue: String },
}

pub struct FeatureGenerator {
    classifier: StepClassifier,
    settings: FeatureSettings,
    vars: HashMap<String, String>,
}

impl FeatureGenerator {
    pub fn new(classifier: StepClassifier, settings: FeatureSettings) -> Self {
        Self {
            classifier,
            settings,
            vars: HashMap::new(),
        }
    }

    /// Values for `{{name}}` placeholders in instructions.
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    fn is_skipped(&self, instruction: &str) -> bool {
        let lower = instruction.to_lowercase();
        self.settings
            .skip_phrases
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
    }

    fn background(&self, generated: &mut Vec<GeneratedStep>) -> Result<Vec<StepLine>, GenerationError> {
        let mut lines = Vec::new();
        let mut previous: Option<StepKind> = None;

        for raw in &self.settings.background {
            let (keyword, text) = Keyword::split_step_line(raw)
                .ok_or_else(|| GenerationError::InvalidBackground { line: raw.clone() })?;
            let kind = StepKind::from_keyword(keyword)
                .or(previous)
                .ok_or_else(|| GenerationError::InvalidBackground { line: raw.clone() })?;

            let step = self
                .classifier
                .build_step(kind, text)
                .map_err(|reason| GenerationError::RejectedBackground {
                    line: raw.clone(),
                    reason,
                })?;

            lines.push(StepLine {
                keyword: continuation(previous, kind),
                text: step.text.clone(),
            });
            previous = Some(kind);
            remember(generated, step);
        }

        Ok(lines)
    }

    /// Build the feature for one section.
    pub fn generate(&self, section: &str, cases: &[TestCase]) -> Result<FeatureDocument, GenerationError> {
        let slug = feature_file_name(section);
        let mut generated = Vec::new();
        let background = self.background(&mut generated)?;
        let mut scenarios = Vec::new();

        for (index, case) in cases.iter().enumerate() {
            let instructions = case
                .steps
                .iter()
                .flat_map(|s| split_numbered_steps(s))
                .filter(|s| !self.is_skipped(s));

            let mut steps = Vec::new();
            let mut previous: Option<StepKind> = None;
            for instruction in instructions {
                let step = self.classifier.classify(&instruction, &self.vars).map_err(|reason| {
                    GenerationError::RejectedStep {
                        section: section.to_string(),
                        case: case.title.clone(),
                        step: instruction.clone(),
                        reason,
                    }
                })?;

                steps.push(StepLine {
                    keyword: continuation(previous, step.kind),
                    text: step.text.clone(),
                });
                previous = Some(step.kind);
                remember(&mut generated, step);
            }

            if steps.is_empty() {
                debug!(section, case = %case.title, "case has no remaining steps, omitted");
                continue;
            }

            scenarios.push(Scenario {
                title: case.title.clone(),
                tags: vec![format!("@{slug}"), format!("@case_{}", index + 1)],
                steps,
                examples: self.examples(),
            });
        }

        let document = FeatureDocument {
            title: format!("{} - {}", section, self.settings.title_suffix),
            tags: Vec::new(),
            background,
            scenarios,
            generated,
        };

        if let Some(issue) = validate_feature_text(&document.render()).into_iter().next() {
            return Err(GenerationError::Malformed {
                section: section.to_string(),
                line: issue.line,
                issue: issue.kind.to_string(),
            });
        }

        info!(section, scenarios = document.scenarios.len(), steps = document.generated.len(), "feature generated");
        Ok(document)
    }

    fn examples(&self) -> Option<ExamplesTable> {
        if self.settings.examples_header.is_empty() {
            return None;
        }
        Some(ExamplesTable {
            header: self.settings.examples_header.clone(),
            rows: vec![self.settings.examples_row.clone()],
        })
    }
}

fn continuation(previous: Option<StepKind>, kind: StepKind) -> Keyword {
    if previous == Some(kind) { Keyword::And } else { kind.keyword() }
}

fn remember(generated: &mut Vec<GeneratedStep>, step: GeneratedStep) {
    let key = step.dedup_key();
    if !generated.iter().any(|g| g.dedup_key() == key) {
        generated.push(step);
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IssueKind {
    #[error("step line does not start with Given/When/Then/And/But")]
    MissingKeyword,

    #[error("localized keyword '{keyword}'")]
    LocalizedKeyword { keyword: String },

    #[error("keyword without step text")]
    EmptyStep,

    #[error("table row outside Examples or step")]
    StrayTableRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureIssue {
    /// 1-based
    pub line: usize,
    pub text: String,
    pub kind: IssueKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    Preamble,
    Description,
    Steps,
    Examples,
}

/// Check that every line of a Background or Scenario body is a keyword step.
pub fn validate_feature_text(text: &str) -> Vec<FeatureIssue> {
    let mut issues = Vec::new();
    let mut block = Block::Preamble;
    let mut table_allowed = false;
    let mut in_doc_string = false;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let mut report = |kind: IssueKind| {
            issues.push(FeatureIssue {
                line: index + 1,
                text: raw.to_string(),
                kind,
            })
        };

        if line.starts_with("\"\"\"") || line.starts_with("```") {
            in_doc_string = !in_doc_string;
            continue;
        }
        if in_doc_string || line.is_empty() || line.starts_with('#') || line.starts_with('@') {
            continue;
        }

        if line.starts_with("Feature:") || line.starts_with("Rule:") {
            block = Block::Description;
            table_allowed = false;
            continue;
        }
        if line.starts_with("Examples:") || line.starts_with("Scenarios:") {
            block = Block::Examples;
            table_allowed = true;
            continue;
        }
        if line.starts_with("Background:") || line.starts_with("Scenario") || line.starts_with("Example:") {
            block = Block::Steps;
            table_allowed = false;
            continue;
        }

        if line.starts_with('|') {
            if !table_allowed {
                report(IssueKind::StrayTableRow);
            }
            continue;
        }

        match block {
            Block::Preamble | Block::Description => {}
            Block::Examples => report(IssueKind::StrayTableRow),
            Block::Steps => {
                let first = line.split_whitespace().next().unwrap_or_default();
                if let Some((_, rest)) = Keyword::split_step_line(line) {
                    table_allowed = true;
                    if rest.is_empty() {
                        report(IssueKind::EmptyStep);
                    }
                } else if Keyword::ALL.iter().any(|k| k.as_str() == line) {
                    report(IssueKind::EmptyStep);
                } else if Keyword::parse(first).is_some() {
                    report(IssueKind::LocalizedKeyword {
                        keyword: first.to_string(),
                    });
                } else {
                    report(IssueKind::MissingKeyword);
                }
            }
        }
    }

    issues
}
