use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::audit::step_index::normalize_phrase;
use crate::error::ForgeError;
use crate::gherkin::keyword::StepKind;

pub const MIN_STEP_LEN: usize = 5;
pub const MAX_STEP_LEN: usize = 150;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("valid regex"));
static NUMBERED_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+\)\s*").expect("valid regex"));
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid regex"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w{])(\d+(?:\.\d+)?)\b").expect("valid regex"));

// ============================================================================
// Classification cues
// ============================================================================

const GIVEN_CUES: &[&str] = &[
    r"^(que\s+)?(navego|estoy|tengo|existe|hay|abro)\b",
    r"^dado\s+que\b",
    r"^(que\s+)?(el|la|los|las)\s+\w+\s+(está|están|esta|estan|tiene|tienen)\b",
    r"^(i\s+)?(visit|open|navigate|go\s+to|am\s+on|am\s+logged|have\s+opened)\b",
    r"^(given\s+)?(the|a)\s+(user|page|site|cart)\s+(is|are|has)\b",
];

const WHEN_CUES: &[&str] = &[
    r"^(hago\s+(click|clic)|ingreso|escribo|selecciono|presiono|busco|completo|realizo|ejecuto|agrego|elimino)\b",
    r"^cuando\s+el\s+usuario\b",
    r"^(el\s+)?usuario\s+(hace|realiza|ingresa|navega)\b",
    r"^(i\s+)?(click|tap|press|type|enter|fill|select|choose|submit|search|add|remove|scroll|hover|upload|log\s?in|sign\s+in|log\s?out)\b",
    r"^(the\s+)?user\s+(clicks|types|enters|fills|selects|submits|adds|removes|navigates|logs)\b",
    r"^(i\s+)?(wait|espero)\b",
];

const THEN_CUES: &[&str] = &[
    r"^(verifico|compruebo|valido|confirmo|veo)\s+que\b",
    r"^(debe|debería|deberia|tiene\s+que)\s+(mostrar|aparecer|estar|tener)\b",
    r"^(se\s+)?(muestra|visualiza|presenta)\b",
    r"^(i\s+)?(verify|validate|confirm|ensure|assert|expect|check\s+that|see|should)\b",
    r"\b(should|must)\s+(be|see|show|display|contain|have|appear|view)\b",
];

/// Ordered cue patterns per keyword family.
#[derive(Debug, Clone)]
pub struct CueSet {
    given: Vec<Regex>,
    when: Vec<Regex>,
    then: Vec<Regex>,
}

impl CueSet {
    /// Built-in Spanish and English cues.
    pub fn builtin() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)).expect("valid regex"))
                .collect()
        };

        Self {
            given: compile(GIVEN_CUES),
            when: compile(WHEN_CUES),
            then: compile(THEN_CUES),
        }
    }

    /// Append user-supplied patterns after the built-ins of each family.
    pub fn with_extra(mut self, given: &[String], when: &[String], then: &[String]) -> Result<Self, ForgeError> {
        fn extend(target: &mut Vec<Regex>, patterns: &[String]) -> Result<(), ForgeError> {
            for pattern in patterns {
                let regex = Regex::new(&format!("(?i){}", pattern)).map_err(|e| ForgeError::InvalidCuePattern {
                    pattern: pattern.clone(),
                    source: e,
                })?;
                target.push(regex);
            }
            Ok(())
        }

        extend(&mut self.given, given)?;
        extend(&mut self.when, when)?;
        extend(&mut self.then, then)?;
        Ok(self)
    }

    fn families(&self) -> [(StepKind, &[Regex]); 3] {
        [
            (StepKind::Precondition, self.given.as_slice()),
            (StepKind::Action, self.when.as_slice()),
            (StepKind::Assertion, self.then.as_slice()),
        ]
    }
}

impl Default for CueSet {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Classified steps
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCategory {
    Navigation,
    Interaction,
    Input,
    Verification,
    Wait,
    General,
}

impl StepCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepCategory::Navigation => "navigation",
            StepCategory::Interaction => "interaction",
            StepCategory::Input => "input",
            StepCategory::Verification => "verification",
            StepCategory::Wait => "wait",
            StepCategory::General => "general",
        }
    }
}

impl fmt::Display for StepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cucumber expression parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Int,
    Float,
}

/// A classified instruction, ready for a feature file and a step definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedStep {
    pub kind: StepKind,

    /// Cleaned text with literals intact, as written in the feature file
    pub text: String,

    pub category: StepCategory,

    /// Cucumber expression for the step definition
    pub expression: String,

    pub params: Vec<ParamKind>,

    /// Default step-definition body (JavaScript statements, one per line)
    pub body: String,
}

impl GeneratedStep {
    /// Key used for duplicate detection within a run.
    ///
    /// Definitions register by expression, so steps that differ only in a
    /// literal share a key.
    pub fn dedup_key(&self) -> String {
        normalize_phrase(&self.expression)
    }
}

/// Why an instruction was not turned into a step.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("too short ({len} chars, minimum 5)")]
    TooShort { len: usize },

    #[error("too long ({len} chars, maximum 150)")]
    TooLong { len: usize },

    #[error("contains a raw URL")]
    ContainsUrl,

    #[error("contains no alphabetic character")]
    NoAlphabetic,

    #[error("unresolved placeholder {{{{{name}}}}}")]
    UnresolvedPlaceholder { name: String },

    #[error("no keyword family matched")]
    Unclassified,

    #[error("duplicate of an earlier step in this run")]
    Duplicate,
}

// ============================================================================
// Text helpers
// ============================================================================

/// Replace `{{name}}` tokens from `vars`. Unknown names are a rejection.
pub fn substitute_placeholders(text: &str, vars: &HashMap<String, String>) -> Result<String, Rejection> {
    if let Some(missing) = PLACEHOLDER
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .find(|name| !vars.contains_key(name))
    {
        return Err(Rejection::UnresolvedPlaceholder { name: missing });
    }

    Ok(PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| vars[&caps[1]].clone())
        .into_owned())
}

/// Basic sanity filter applied before classification.
pub fn check_sanity(text: &str) -> Result<(), Rejection> {
    let len = text.trim().chars().count();
    if len < MIN_STEP_LEN {
        return Err(Rejection::TooShort { len });
    }
    if len > MAX_STEP_LEN {
        return Err(Rejection::TooLong { len });
    }
    let lower = text.to_lowercase();
    if lower.contains("http://") || lower.contains("https://") {
        return Err(Rejection::ContainsUrl);
    }
    if !text.chars().any(char::is_alphabetic) {
        return Err(Rejection::NoAlphabetic);
    }
    Ok(())
}

/// Drop list numbering and stray punctuation, collapse whitespace.
pub fn clean_step_text(text: &str) -> String {
    let without_number = NUMBERED_PREFIX.replace(text, "");
    let collapsed = without_number.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '"' || c == '\'' || c == '{'))
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ';' | ':' | ',') || c.is_whitespace())
        .to_string()
}

/// Turn literal values into Cucumber expression parameters.
pub fn to_expression(text: &str) -> (String, Vec<ParamKind>) {
    let mut positions: Vec<(usize, ParamKind)> = Vec::new();

    let quoted = QUOTED.replace_all(text, "\u{0}");
    let mut expression = String::new();
    let mut last = 0;
    for caps in NUMBER.captures_iter(&quoted) {
        let Some(number) = caps.get(2) else { continue };
        expression.push_str(&quoted[last..number.start()]);
        let kind = if number.as_str().contains('.') {
            ParamKind::Float
        } else {
            ParamKind::Int
        };
        expression.push_str(if kind == ParamKind::Float { "{float}" } else { "{int}" });
        positions.push((number.start(), kind));
        last = number.end();
    }
    expression.push_str(&quoted[last..]);

    for (i, _) in quoted.match_indices('\u{0}') {
        positions.push((i, ParamKind::String));
    }
    positions.sort_by_key(|(pos, _)| *pos);

    let expression = expression.replace('\u{0}', "{string}");
    (expression, positions.into_iter().map(|(_, k)| k).collect())
}

fn categorize_step(kind: StepKind, text: &str) -> StepCategory {
    let lower = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["espera", "wait"]) {
        return StepCategory::Wait;
    }
    if kind == StepKind::Assertion {
        return StepCategory::Verification;
    }
    if has(&["naveg", "visit", "go to", "open", "navigate"]) {
        return StepCategory::Navigation;
    }
    if has(&["ingres", "escrib", "type", "enter", "fill"]) {
        return StepCategory::Input;
    }
    if has(&["click", "clic", "presion", "press", "tap", "select"]) {
        return StepCategory::Interaction;
    }
    if has(&["verific", "valid", "verify", "should", "must", "debe"]) {
        return StepCategory::Verification;
    }
    StepCategory::General
}

/// Escape a value for a double-quoted JavaScript string literal.
pub fn js_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn default_body(category: StepCategory, text: &str, params: &[ParamKind]) -> String {
    let first_string = params
        .iter()
        .position(|p| *p == ParamKind::String)
        .map(|i| format!("arg{}", i));

    match (category, first_string) {
        (StepCategory::Navigation, Some(arg)) => format!("cy.visit({});", arg),
        (StepCategory::Navigation, None) => "cy.visit(\"/\");".to_string(),
        (StepCategory::Interaction, Some(arg)) => format!("cy.contains({}).click();", arg),
        (StepCategory::Verification, Some(arg)) => format!("cy.contains({}).should(\"be.visible\");", arg),
        (StepCategory::Wait, _) => "cy.get(\"body\").should(\"be.visible\");".to_string(),
        _ => format!("cy.log({});", js_string(&format!("pending: {}", text))),
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Decides which keyword family an instruction belongs to.
#[derive(Debug, Clone, Default)]
pub struct StepClassifier {
    cues: CueSet,
}

impl StepClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cues(cues: CueSet) -> Self {
        Self { cues }
    }

    /// Cue matching only: first family (Given, When, Then) with a matching pattern.
    pub fn keyword_for(&self, text: &str) -> Option<StepKind> {
        let text = text.trim();
        self.cues
            .families()
            .into_iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(kind, _)| kind)
    }

    /// Build a step whose kind is already known (e.g. an explicit background line).
    pub fn build_step(&self, kind: StepKind, raw: &str) -> Result<GeneratedStep, Rejection> {
        let text = clean_step_text(raw);
        check_sanity(&text)?;
        Ok(assemble(kind, text))
    }

    /// Full pipeline: placeholders, cleaning, sanity checks, classification.
    pub fn classify(&self, raw: &str, vars: &HashMap<String, String>) -> Result<GeneratedStep, Rejection> {
        let substituted = substitute_placeholders(raw, vars)?;
        let text = clean_step_text(&substituted);
        check_sanity(&text)?;

        let kind = self.keyword_for(&text).ok_or(Rejection::Unclassified)?;
        let step = assemble(kind, text);

        debug!(kind = %step.kind, category = %step.category, text = %step.text, "classified step");
        Ok(step)
    }
}

fn assemble(kind: StepKind, text: String) -> GeneratedStep {
    let category = categorize_step(kind, &text);
    let (expression, params) = to_expression(&text);
    let body = default_body(category, &text, &params);

    GeneratedStep {
        kind,
        text,
        category,
        expression,
        params,
        body,
    }
}

// ============================================================================
// Batches
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedStep {
    pub input: String,
    pub reason: Rejection,
}

/// Steps accumulated over one generation run. Normalized expressions are unique.
#[derive(Debug, Clone, Default)]
pub struct StepBatch {
    steps: Vec<GeneratedStep>,
    rejects: Vec<RejectedStep>,
    seen: HashSet<String>,
    duplicates: usize,
}

impl StepBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and add one instruction. Returns whether it was accepted.
    pub fn push(&mut self, classifier: &StepClassifier, raw: &str, vars: &HashMap<String, String>) -> bool {
        match classifier.classify(raw, vars) {
            Ok(step) => self.push_step(raw, step),
            Err(reason) => {
                self.rejects.push(RejectedStep {
                    input: raw.to_string(),
                    reason,
                });
                false
            }
        }
    }

    /// Add an already classified step, dropping it if its expression was seen before.
    pub fn push_step(&mut self, raw: &str, step: GeneratedStep) -> bool {
        if !self.seen.insert(step.dedup_key()) {
            self.duplicates += 1;
            self.rejects.push(RejectedStep {
                input: raw.to_string(),
                reason: Rejection::Duplicate,
            });
            return false;
        }
        self.steps.push(step);
        true
    }

    pub fn steps(&self) -> &[GeneratedStep] {
        &self.steps
    }

    pub fn rejects(&self) -> &[RejectedStep] {
        &self.rejects
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
