use std::fmt::Write as _;
use std::path::Path;

use crate::audit::auditor::{AuditReport, DeletionReason};
use crate::audit::repair::{RepairChange, RepairReport};
use crate::dom::dom_model::ElementCategory;
use crate::gherkin::classifier::StepBatch;
use crate::gherkin::suite::SuiteOutput;
use crate::locator::locator_model::LocatorMap;
use crate::scan::scan_model::PageScanResult;

// ============================================================================
// Console summaries, one per command
// ============================================================================

const LIST_LIMIT: usize = 10;

/// ```text
/// === Scan: https://example.com (Example) ===
///
///   buttons        3
///   ...
///
/// === 42 elements -> scans/scan_....json ===
/// ```
pub fn format_scan_summary(result: &PageScanResult, artifact: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Scan: {} ({}) ===\n", result.metadata.url, result.metadata.title);

    for (category, count) in result.counts() {
        let _ = writeln!(out, "  {:<14} {}", category.as_str(), count);
    }

    let _ = writeln!(
        out,
        "\n=== {} elements -> {} ===",
        result.metadata.total_elements,
        artifact.display()
    );
    out
}

pub fn format_locator_summary(map: &LocatorMap, artifact: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Locators from {} ===\n", map.metadata.source_file);

    for category in ElementCategory::ALL {
        let entries = map.categories.get(&category).map_or(0, |m| m.len());
        let collisions = map
            .metadata
            .collisions_by_category
            .get(&category)
            .copied()
            .unwrap_or(0);
        if entries == 0 && collisions == 0 {
            continue;
        }
        let _ = writeln!(out, "  {:<14} {:>4} entries  {:>4} collisions", category.as_str(), entries, collisions);
    }

    let _ = writeln!(
        out,
        "\n=== {} entries, {} collisions -> {} ===",
        map.metadata.total_entries,
        map.metadata.collisions,
        artifact.display()
    );
    out
}

pub fn format_classification_summary(batch: &StepBatch) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Step classification ===\n");

    for step in batch.steps() {
        let _ = writeln!(out, "\u{2713} {:<5} [{}] {}", step.kind, step.category, step.text);
    }
    for reject in batch.rejects() {
        let _ = writeln!(out, "\u{2717} {} ({})", reject.input, reject.reason);
    }

    let _ = writeln!(
        out,
        "\n=== Results: {} accepted, {} rejected, {} duplicates ===",
        batch.steps().len(),
        batch.rejects().len() - batch.duplicates(),
        batch.duplicates()
    );
    out
}

pub fn format_generation_summary(suite: &SuiteOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Feature generation ===\n");

    for section in &suite.sections {
        let _ = writeln!(
            out,
            "\u{2713} {} -> {}.feature ({} scenarios, {} new steps, {} already defined)",
            section.section, section.file_stem, section.scenarios, section.new_steps, section.existing_steps
        );
        if let Some(page) = &section.page_object {
            let _ = writeln!(out, "    page object {} ({} elements)", page.file_name, page.elements.len());
        }
    }
    for failure in &suite.failures {
        let _ = writeln!(out, "\u{2717} {}", failure.section);
        let _ = writeln!(out, "    [ERROR] {}", failure.error);
    }

    let _ = writeln!(
        out,
        "\n=== Results: {} sections generated, {} failed ===",
        suite.sections.len(),
        suite.failures.len()
    );
    out
}

pub fn format_audit_report(report: &AuditReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Audit: {} step files, {} features ===",
        report.files_scanned, report.features_scanned
    );

    let _ = writeln!(out, "\nDuplicated steps ({}):", report.duplicates.len());
    for dup in &report.duplicates {
        let _ = writeln!(out, "  \"{}\"", dup.phrase);
        for site in &dup.sites {
            let _ = writeln!(out, "      {}:{} ({})", site.file, site.line, site.keyword);
        }
    }

    let _ = writeln!(out, "\nUnused steps ({}):", report.dead_phrases.len());
    for dead in report.dead_phrases.iter().take(LIST_LIMIT) {
        let files: Vec<&str> = dead.sites.iter().map(|s| s.file.as_str()).collect();
        let _ = writeln!(out, "  \"{}\" in {}", dead.phrase, files.join(", "));
    }
    if report.dead_phrases.len() > LIST_LIMIT {
        let _ = writeln!(out, "  ... and {} more", report.dead_phrases.len() - LIST_LIMIT);
    }

    if !report.undefined_usages.is_empty() {
        let _ = writeln!(out, "\nUndefined steps ({}):", report.undefined_usages.len());
        for phrase in report.undefined_usages.iter().take(LIST_LIMIT) {
            let _ = writeln!(out, "  \"{}\"", phrase);
        }
    }

    let _ = writeln!(out, "\nProblem files ({}):", report.file_problems.len());
    for file in &report.file_problems {
        let _ = writeln!(out, "  {}", file.file);
        for problem in &file.problems {
            let _ = writeln!(out, "      - {}", problem);
        }
    }

    let _ = writeln!(out, "\nSafe to delete ({}):", report.deletion_candidates.len());
    for candidate in &report.deletion_candidates {
        let reason = match &candidate.reason {
            DeletionReason::AllPhrasesDead { phrases } => format!("all {} steps unused", phrases),
            DeletionReason::NearEmpty { lines } => format!("nearly empty ({} lines)", lines),
        };
        let _ = writeln!(out, "  {} - {}", candidate.file, reason);
    }

    let _ = writeln!(
        out,
        "\n=== {} phrases defined, {} used, {} duplicated, {} unused ===",
        report.phrases_defined,
        report.phrases_used,
        report.duplicates.len(),
        report.dead_phrases.len()
    );
    out
}

fn describe_change(change: &RepairChange) -> String {
    match change {
        RepairChange::Rekeyed { file, line, from, to } => format!("{file}:{line} {from}( -> {to}("),
        RepairChange::StrippedLocalizedPrefix { file, line } => format!("{file}:{line} removed leading \"Y \""),
        RepairChange::Requoted { file, line } => format!("{file}:{line} phrase requoted"),
        RepairChange::ImportFixed { file, line } => format!("{file}:{line} import list fixed"),
        RepairChange::CommentedDuplicate { file, line, phrase, kept } => {
            format!("{file}:{line} \"{phrase}\" commented out (kept {kept})")
        }
        RepairChange::Whitespace { file, lines } => format!("{file} whitespace normalized on {lines} lines"),
        RepairChange::TranslatedKeyword { file, line, from, to } => format!("{file}:{line} {from} -> {to}"),
        RepairChange::CollapsedKeyword { file, line } => format!("{file}:{line} doubled keyword collapsed"),
        RepairChange::Unrepairable { file, line, reason } => format!("{file}:{line} NOT REPAIRED: {reason}"),
    }
}

pub fn format_repair_report(report: &RepairReport, features: &[RepairChange], dry_run: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Repair{} ===\n", if dry_run { " (dry run)" } else { "" });

    for change in report.changes.iter().chain(features) {
        let marker = if change.is_unrepairable() { "\u{2717}" } else { "\u{2713}" };
        let _ = writeln!(out, "{} {}", marker, describe_change(change));
    }

    let _ = writeln!(
        out,
        "\n=== {} step files changed, {} edits, {} unrepairable ===",
        report.changed.len(),
        report.changes.len() + features.len(),
        report.unrepairable().count()
    );
    out
}
