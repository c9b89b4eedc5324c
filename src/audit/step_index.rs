use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::artifact::store::SourceFile;
use crate::gherkin::keyword::Keyword;

static REGISTRATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([ \t]*)(Given|When|Then|And|But|Y)(\s*\(\s*)(?:"([^"]*)"|'([^']*)'|`([^`]*)`)(.*)$"#)
        .expect("valid regex")
});
static BRACED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("valid regex"));
static ANGLED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid regex"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+(?:[.,]\d+)?\b").expect("valid regex"));

/// Collapse a step phrase to the form used to match definitions to usages.
///
/// Parameters of any shape (`{string}`, `<user>`, `"admin"`, `42`) all become
/// the token `param`.
pub fn normalize_phrase(text: &str) -> String {
    let lower = text.to_lowercase();
    let lower = BRACED.replace_all(&lower, " param ");
    let lower = ANGLED.replace_all(&lower, " param ");
    let lower = QUOTED.replace_all(&lower, " param ");
    let lower = NUMBER.replace_all(&lower, " param ");

    lower
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Registrations
// ============================================================================

/// One `Keyword("phrase", ...)` registration line, split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration<'a> {
    pub indent: &'a str,

    /// Keyword as written, `Y` included
    pub token: &'a str,

    pub keyword: Keyword,

    /// Whitespace and `(` between the keyword and the phrase
    pub open: &'a str,

    pub quote: char,
    pub phrase: &'a str,

    /// Everything after the closing quote
    pub rest: &'a str,
}

/// Parse a registration that starts its line. Commented-out code never matches.
pub fn parse_registration(line: &str) -> Option<Registration<'_>> {
    let caps = REGISTRATION.captures(line)?;
    let token = caps.get(2)?.as_str();
    let (quote, phrase) = [('"', 4), ('\'', 5), ('`', 6)]
        .into_iter()
        .find_map(|(q, group)| caps.get(group).map(|m| (q, m.as_str())))?;

    Some(Registration {
        indent: caps.get(1)?.as_str(),
        token,
        keyword: Keyword::parse(token)?,
        open: caps.get(3)?.as_str(),
        quote,
        phrase,
        rest: caps.get(7).map_or("", |m| m.as_str()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionSite {
    pub file: String,

    /// 1-based
    pub line: usize,

    pub keyword: Keyword,

    /// Phrase as written
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsageSite {
    pub file: String,
    pub line: usize,
    pub text: String,
}

/// Every step registration in a step-definition file.
pub fn extract_definitions(file: &SourceFile) -> Vec<DefinitionSite> {
    file.content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            parse_registration(line).map(|r| DefinitionSite {
                file: file.name.clone(),
                line: i + 1,
                keyword: r.keyword,
                text: r.phrase.to_string(),
            })
        })
        .collect()
}

/// Every step line of a feature file, English or Spanish keywords.
pub fn extract_usages(file: &SourceFile) -> Vec<UsageSite> {
    file.content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let (token, rest) = line.trim().split_once(char::is_whitespace)?;
            Keyword::parse(token)?;
            let text = rest.trim();
            (!text.is_empty()).then(|| UsageSite {
                file: file.name.clone(),
                line: i + 1,
                text: text.to_string(),
            })
        })
        .collect()
}

// ============================================================================
// Index
// ============================================================================

/// Definitions and usages keyed by normalized phrase.
///
/// Sites are kept sorted by (file, line), so the index does not depend on
/// the order files were read in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepIndex {
    pub definitions: BTreeMap<String, Vec<DefinitionSite>>,
    pub usages: BTreeMap<String, Vec<UsageSite>>,
}

impl StepIndex {
    pub fn build(step_files: &[SourceFile], feature_files: &[SourceFile]) -> Self {
        let mut index = StepIndex::default();

        for site in step_files.iter().flat_map(extract_definitions) {
            index.definitions.entry(normalize_phrase(&site.text)).or_default().push(site);
        }
        for site in feature_files.iter().flat_map(extract_usages) {
            index.usages.entry(normalize_phrase(&site.text)).or_default().push(site);
        }

        index.definitions.values_mut().for_each(|sites| sites.sort());
        index.usages.values_mut().for_each(|sites| sites.sort());
        index
    }

    /// Whether some registration already matches this phrase or expression.
    pub fn is_defined(&self, text: &str) -> bool {
        self.definitions.contains_key(&normalize_phrase(text))
    }

    pub fn is_used(&self, phrase: &str) -> bool {
        self.usages.contains_key(phrase)
    }
}
