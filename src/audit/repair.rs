use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifact::store::SourceFile;
use crate::audit::step_index::{normalize_phrase, parse_registration};
use crate::gherkin::classifier::StepClassifier;
use crate::gherkin::keyword::{Keyword, StepKind};

static CUCUMBER_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*import\s*\{)([^}]*)(\}\s*from\s.*)$").expect("valid regex"));

const SECTION_HEADERS: [(&str, &str); 6] = [
    ("Característica:", "Feature:"),
    ("Antecedentes:", "Background:"),
    ("Esquema del escenario:", "Scenario Outline:"),
    ("Escenario:", "Scenario:"),
    ("Ejemplos:", "Examples:"),
    ("Regla:", "Rule:"),
];

/// One edit made (or refused) by a repair pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum RepairChange {
    Rekeyed { file: String, line: usize, from: String, to: Keyword },
    StrippedLocalizedPrefix { file: String, line: usize },
    Requoted { file: String, line: usize },
    ImportFixed { file: String, line: usize },
    CommentedDuplicate { file: String, line: usize, phrase: String, kept: String },
    Whitespace { file: String, lines: usize },
    TranslatedKeyword { file: String, line: usize, from: String, to: String },
    CollapsedKeyword { file: String, line: usize },
    Unrepairable { file: String, line: usize, reason: String },
}

impl RepairChange {
    pub fn is_unrepairable(&self) -> bool {
        matches!(self, RepairChange::Unrepairable { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Every input file with its repaired content, sorted by name
    pub files: Vec<SourceFile>,

    /// Names of files whose content changed
    pub changed: Vec<String>,

    pub changes: Vec<RepairChange>,
}

impl RepairReport {
    pub fn unrepairable(&self) -> impl Iterator<Item = &RepairChange> {
        self.changes.iter().filter(|c| c.is_unrepairable())
    }
}

// ============================================================================
// Whitespace
// ============================================================================

fn normalize_whitespace(line: &str) -> String {
    let tabs = line.len() - line.trim_start_matches('\t').len();
    let mut out = "    ".repeat(tabs);
    out.push_str(line[tabs..].trim_end());
    out
}

fn join_lines(lines: &[String], original: &str) -> String {
    let mut content = lines.join("\n");
    if original.ends_with('\n') && !content.is_empty() {
        content.push('\n');
    }
    content
}

// ============================================================================
// Step-definition files
// ============================================================================

fn fix_import(line: &str) -> Option<String> {
    let caps = CUCUMBER_IMPORT.captures(line)?;
    let names: Vec<&str> = caps[2].split(',').map(str::trim).filter(|n| !n.is_empty()).collect();

    if !names.iter().any(|n| matches!(*n, "And" | "But" | "Y")) {
        return None;
    }

    let mut kept: Vec<&str> = names
        .into_iter()
        .filter(|n| !matches!(*n, "And" | "But" | "Y"))
        .collect();
    for needed in ["Given", "When", "Then"] {
        if !kept.contains(&needed) {
            kept.push(needed);
        }
    }

    Some(format!("{} {} {}", &caps[1], kept.join(", "), &caps[3]))
}

/// Fix keywords, phrases and quoting of each registration in one file.
fn repair_registrations(
    file: &str,
    lines: &mut [String],
    classifier: &StepClassifier,
    changes: &mut Vec<RepairChange>,
) {
    let mut previous: Option<StepKind> = None;

    for (i, line) in lines.iter_mut().enumerate() {
        let line_no = i + 1;

        if let Some(fixed) = fix_import(line) {
            changes.push(RepairChange::ImportFixed {
                file: file.to_string(),
                line: line_no,
            });
            *line = fixed;
            continue;
        }

        let Some(reg) = parse_registration(line) else {
            continue;
        };

        let stripped = reg.phrase.strip_prefix("Y ");
        let phrase = stripped.unwrap_or(reg.phrase);

        let kind = match StepKind::from_keyword(reg.keyword) {
            Some(kind) => kind,
            None => match classifier.keyword_for(phrase).or(previous) {
                Some(kind) => {
                    changes.push(RepairChange::Rekeyed {
                        file: file.to_string(),
                        line: line_no,
                        from: reg.token.to_string(),
                        to: kind.keyword(),
                    });
                    kind
                }
                None => {
                    warn!(file, line = line_no, token = reg.token, "registration keyword cannot be inferred");
                    changes.push(RepairChange::Unrepairable {
                        file: file.to_string(),
                        line: line_no,
                        reason: format!("no Given/When/Then could be inferred for {}(", reg.token),
                    });
                    continue;
                }
            },
        };
        previous = Some(kind);

        if stripped.is_some() {
            changes.push(RepairChange::StrippedLocalizedPrefix {
                file: file.to_string(),
                line: line_no,
            });
        }

        let requote = reg.quote != '"' && !phrase.contains('"') && !phrase.contains("${");
        if requote {
            changes.push(RepairChange::Requoted {
                file: file.to_string(),
                line: line_no,
            });
        }
        let quote = if requote { '"' } else { reg.quote };

        let rebuilt = format!("{}{}{}{quote}{phrase}{quote}{}", reg.indent, kind.keyword(), reg.open, reg.rest);
        if rebuilt != *line {
            *line = rebuilt;
        }
    }
}

/// Net `(` minus `)` on a line, ignoring string contents and `//` comments.
fn paren_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' | '`' => quote = Some(c),
                '/' if chars.peek() == Some(&'/') => break,
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            },
        }
    }

    depth
}

/// Last line (inclusive) of the registration call starting at `start`.
fn block_end(lines: &[String], start: usize) -> usize {
    let mut depth = 0;
    for (i, line) in lines.iter().enumerate().skip(start) {
        depth += paren_delta(line);
        if depth <= 0 {
            return i;
        }
    }
    lines.len().saturating_sub(1)
}

fn comment_out(lines: &mut Vec<String>, start: usize, kept: &str) {
    let end = block_end(lines, start);
    for line in &mut lines[start..=end] {
        let indent_len = line.len() - line.trim_start().len();
        let (indent, code) = line.split_at(indent_len);
        *line = if code.is_empty() {
            format!("{indent}//")
        } else {
            format!("{indent}// {code}")
        };
    }
    let indent: String = lines[start].chars().take_while(|c| c.is_whitespace()).collect();
    lines.insert(start, format!("{indent}// duplicate of {kept}"));
}

/// Repair a set of step-definition files as one unit.
///
/// Files are processed in name order; for each duplicated phrase the
/// registration with the smallest (file, line) stays active and every later
/// one is commented out. Running the repair on its own output changes nothing.
pub fn repair_step_files(files: &[SourceFile], classifier: &StepClassifier) -> RepairReport {
    let mut sorted: Vec<&SourceFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut changes = Vec::new();
    let mut working: Vec<Vec<String>> = Vec::with_capacity(sorted.len());

    for file in &sorted {
        let mut lines: Vec<String> = file.content.lines().map(normalize_whitespace).collect();
        let touched = file
            .content
            .lines()
            .zip(&lines)
            .filter(|(before, after)| before != &after.as_str())
            .count();
        if touched > 0 {
            changes.push(RepairChange::Whitespace {
                file: file.name.clone(),
                lines: touched,
            });
        }

        repair_registrations(&file.name, &mut lines, classifier, &mut changes);
        working.push(lines);
    }

    // first site per phrase, in (file, line) order
    let mut first_sites: BTreeMap<String, String> = BTreeMap::new();
    let mut to_comment: Vec<(usize, usize, String, String)> = Vec::new();
    for (file_idx, lines) in working.iter().enumerate() {
        for (line_idx, line) in lines.iter().enumerate() {
            let Some(reg) = parse_registration(line) else {
                continue;
            };
            if !reg.keyword.is_registrable() {
                continue;
            }
            let phrase = normalize_phrase(reg.phrase);
            match first_sites.get(&phrase) {
                Some(kept) => to_comment.push((file_idx, line_idx, phrase, kept.clone())),
                None => {
                    first_sites.insert(phrase, format!("{}:{}", sorted[file_idx].name, line_idx + 1));
                }
            }
        }
    }

    // bottom-up so inserted marker lines do not shift pending positions
    for (file_idx, line_idx, phrase, kept) in to_comment.into_iter().rev() {
        debug!(file = %sorted[file_idx].name, line = line_idx + 1, %phrase, "commenting out duplicate");
        comment_out(&mut working[file_idx], line_idx, &kept);
        changes.push(RepairChange::CommentedDuplicate {
            file: sorted[file_idx].name.clone(),
            line: line_idx + 1,
            phrase,
            kept,
        });
    }

    let mut report = RepairReport::default();
    for (file, lines) in sorted.iter().zip(&working) {
        let content = join_lines(lines, &file.content);
        if content != file.content {
            report.changed.push(file.name.clone());
        }
        report.files.push(SourceFile::new(file.name.clone(), content));
    }
    report.changes = changes;

    info!(
        files = report.files.len(),
        changed = report.changed.len(),
        changes = report.changes.len(),
        unrepairable = report.unrepairable().count(),
        "step files repaired"
    );
    report
}

// ============================================================================
// Feature files
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRepair {
    pub content: String,
    pub changes: Vec<RepairChange>,
}

fn translate_header(line: &str) -> Option<String> {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, rest) = line.split_at(indent_len);
    SECTION_HEADERS
        .iter()
        .find(|(localized, _)| rest.starts_with(localized))
        .map(|(localized, english)| format!("{indent}{english}{}", &rest[localized.len()..]))
}

fn translate_step(name: &str, line_no: usize, line: &str, changes: &mut Vec<RepairChange>) -> Option<String> {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, body) = line.split_at(indent_len);
    let (token, rest) = body.split_once(' ')?;
    let keyword = Keyword::parse(token)?;

    let mut rest = rest.trim_start();
    while let Some((next, tail)) = rest.split_once(' ') {
        if Keyword::parse(next).is_none() {
            break;
        }
        rest = tail.trim_start();
        changes.push(RepairChange::CollapsedKeyword {
            file: name.to_string(),
            line: line_no,
        });
    }

    if token != keyword.as_str() {
        changes.push(RepairChange::TranslatedKeyword {
            file: name.to_string(),
            line: line_no,
            from: token.to_string(),
            to: keyword.as_str().to_string(),
        });
    }
    Some(format!("{indent}{keyword} {rest}"))
}

/// Translate localized keywords and headers to English, collapse doubled
/// keywords and normalize whitespace. Idempotent.
pub fn repair_feature_text(name: &str, text: &str) -> FeatureRepair {
    let mut changes = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut whitespace = 0;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut line = normalize_whitespace(raw);
        if line != raw {
            whitespace += 1;
        }

        if let Some(translated) = translate_header(&line) {
            changes.push(RepairChange::TranslatedKeyword {
                file: name.to_string(),
                line: line_no,
                from: line.trim().to_string(),
                to: translated.trim().to_string(),
            });
            line = translated;
        }
        if let Some(translated) = translate_step(name, line_no, &line, &mut changes) {
            line = translated;
        }

        let previous_blank = lines.last().is_none_or(|l| l.is_empty());
        if line.is_empty() && previous_blank {
            whitespace += 1;
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
        whitespace += 1;
    }

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    if whitespace > 0 {
        changes.push(RepairChange::Whitespace {
            file: name.to_string(),
            lines: whitespace,
        });
    }

    FeatureRepair { content, changes }
}
