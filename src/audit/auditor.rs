use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifact::store::SourceFile;
use crate::audit::step_index::{DefinitionSite, StepIndex, extract_definitions, normalize_phrase, parse_registration};
use crate::gherkin::keyword::Keyword;

/// Step files shorter than this with no registrations are deletion candidates.
pub const NEAR_EMPTY_LINES: usize = 20;

const PENDING_MARKERS: [&str; 2] = ["TODO", "Pendiente de implementación"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseSites {
    pub phrase: String,
    pub sites: Vec<DefinitionSite>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeletionReason {
    /// Every phrase the file defines is unused
    AllPhrasesDead { phrases: usize },

    NearEmpty { lines: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeletionCandidate {
    pub file: String,
    pub reason: DeletionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FileProblem {
    /// `Y(` used as a registration keyword
    LocalizedRegistration { line: usize },

    /// `And(` or `But(` used as a registration keyword
    ContinuationRegistration { line: usize, keyword: Keyword },

    /// Phrase starts with a leftover `Y `
    LocalizedPhrasePrefix { line: usize },

    PendingImplementation { line: usize },
}

impl fmt::Display for FileProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileProblem::LocalizedRegistration { line } => write!(f, "line {line}: registered with Y( instead of Given/When/Then"),
            FileProblem::ContinuationRegistration { line, keyword } => {
                write!(f, "line {line}: registered with {keyword}( instead of Given/When/Then")
            }
            FileProblem::LocalizedPhrasePrefix { line } => write!(f, "line {line}: phrase starts with \"Y \""),
            FileProblem::PendingImplementation { line } => write!(f, "line {line}: pending implementation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProblems {
    pub file: String,
    pub problems: Vec<FileProblem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Phrases with more than one definition site
    pub duplicates: Vec<PhraseSites>,

    /// Defined phrases no feature uses
    pub dead_phrases: Vec<PhraseSites>,

    /// Feature steps with no matching definition
    pub undefined_usages: Vec<String>,

    pub deletion_candidates: Vec<DeletionCandidate>,
    pub file_problems: Vec<FileProblems>,

    pub files_scanned: usize,
    pub features_scanned: usize,
    pub phrases_defined: usize,
    pub phrases_used: usize,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty()
            && self.dead_phrases.is_empty()
            && self.deletion_candidates.is_empty()
            && self.file_problems.is_empty()
    }
}

fn scan_problems(file: &SourceFile) -> Vec<FileProblem> {
    let mut problems = Vec::new();

    for (i, line) in file.content.lines().enumerate() {
        let line_no = i + 1;
        if let Some(reg) = parse_registration(line) {
            match reg.token {
                "Y" => problems.push(FileProblem::LocalizedRegistration { line: line_no }),
                "And" | "But" => problems.push(FileProblem::ContinuationRegistration {
                    line: line_no,
                    keyword: reg.keyword,
                }),
                _ => {}
            }
            if reg.phrase.starts_with("Y ") {
                problems.push(FileProblem::LocalizedPhrasePrefix { line: line_no });
            }
        }
        if PENDING_MARKERS.iter().any(|m| line.contains(m)) {
            problems.push(FileProblem::PendingImplementation { line: line_no });
        }
    }

    problems
}

/// Cross-reference step definitions against feature usages.
///
/// Every collection in the report is sorted, so shuffling either input
/// list yields the same report.
pub fn audit(step_files: &[SourceFile], feature_files: &[SourceFile]) -> AuditReport {
    let index = StepIndex::build(step_files, feature_files);

    let duplicates: Vec<PhraseSites> = index
        .definitions
        .iter()
        .filter(|(_, sites)| sites.len() > 1)
        .map(|(phrase, sites)| PhraseSites {
            phrase: phrase.clone(),
            sites: sites.clone(),
        })
        .collect();

    let dead_phrases: Vec<PhraseSites> = index
        .definitions
        .iter()
        .filter(|(phrase, _)| !index.is_used(phrase))
        .map(|(phrase, sites)| PhraseSites {
            phrase: phrase.clone(),
            sites: sites.clone(),
        })
        .collect();

    let undefined_usages: Vec<String> = index
        .usages
        .keys()
        .filter(|phrase| !index.definitions.contains_key(*phrase))
        .cloned()
        .collect();

    let mut deletion_candidates = BTreeSet::new();
    let mut file_problems = Vec::new();

    for file in step_files {
        let phrases: BTreeSet<String> = extract_definitions(file)
            .iter()
            .map(|d| normalize_phrase(&d.text))
            .collect();

        if !phrases.is_empty() && phrases.iter().all(|p| !index.is_used(p)) {
            deletion_candidates.insert(DeletionCandidate {
                file: file.name.clone(),
                reason: DeletionReason::AllPhrasesDead { phrases: phrases.len() },
            });
        }

        let lines = file.content.lines().count();
        if phrases.is_empty() && lines < NEAR_EMPTY_LINES {
            deletion_candidates.insert(DeletionCandidate {
                file: file.name.clone(),
                reason: DeletionReason::NearEmpty { lines },
            });
        }

        let problems = scan_problems(file);
        if !problems.is_empty() {
            file_problems.push(FileProblems {
                file: file.name.clone(),
                problems,
            });
        }
    }
    file_problems.sort_by(|a, b| a.file.cmp(&b.file));

    let report = AuditReport {
        duplicates,
        dead_phrases,
        undefined_usages,
        deletion_candidates: deletion_candidates.into_iter().collect(),
        file_problems,
        files_scanned: step_files.len(),
        features_scanned: feature_files.len(),
        phrases_defined: index.definitions.len(),
        phrases_used: index.usages.len(),
    };

    info!(
        files = report.files_scanned,
        features = report.features_scanned,
        duplicates = report.duplicates.len(),
        dead = report.dead_phrases.len(),
        candidates = report.deletion_candidates.len(),
        "audit complete"
    );
    report
}

