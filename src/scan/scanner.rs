use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::artifact::store::{SCHEMA_VERSION, fingerprint, write_json_new, write_json_replace};
use crate::dom::categorizer::{categorize, is_interactive, is_scannable};
use crate::dom::dom_model::{DomElement, ElementCategory};
use crate::dom::selector::synthesize_selectors;
use crate::error::ForgeError;
use crate::scan::scan_model::{ElementAttributes, ElementRecord, PageScanResult, ScanMetadata};
use crate::scan::source::{DomSource, PageSnapshot, ReadinessOptions, wait_until_ready};

/// Visible text kept on a record, in characters.
pub const MAX_RECORD_TEXT: usize = 100;

/// Wait for the page, take a snapshot, and build the element inventory.
pub fn scan_page(source: &mut dyn DomSource, readiness: &ReadinessOptions) -> Result<PageScanResult, ForgeError> {
    wait_until_ready(source, readiness)?;
    let snapshot = source.snapshot()?;
    let result = build_scan(&snapshot);

    if result.is_empty() {
        warn!(url = %snapshot.url, "scan found no visible elements");
    } else {
        info!(url = %snapshot.url, total = result.metadata.total_elements, "scan complete");
    }

    Ok(result)
}

/// Build a scan result from a snapshot. Pure apart from the capture timestamp.
pub fn build_scan(snapshot: &PageSnapshot) -> PageScanResult {
    let records: Vec<ElementRecord> = snapshot
        .elements
        .iter()
        .filter(|el| is_scannable(el))
        .enumerate()
        .map(|(id, el)| to_record(id, el))
        .collect();

    let metadata = ScanMetadata {
        schema_version: SCHEMA_VERSION,
        url: snapshot.url.clone(),
        title: snapshot.title.clone(),
        captured_at: Utc::now(),
        total_elements: records.len(),
    };

    PageScanResult::from_records(metadata, records)
}

fn to_record(id: usize, el: &DomElement) -> ElementRecord {
    let category = categorize(el);

    ElementRecord {
        id,
        tag: el.tag_lower(),
        selectors: synthesize_selectors(el),
        text: truncate_chars(&el.clean_text(), MAX_RECORD_TEXT),
        attributes: attributes_of(el),
        bounding_box: el.rect,
        is_interactive: is_interactive(el, category),
        category,
    }
}

fn attributes_of(el: &DomElement) -> ElementAttributes {
    let owned = |name: &str| el.attr(name).map(str::to_string);

    ElementAttributes {
        id: el.id_attr().map(str::to_string),
        class: el
            .class_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        name: owned("name"),
        input_type: owned("type"),
        role: owned("role"),
        test_id: owned("data-testid")
            .or_else(|| owned("data-cy"))
            .or_else(|| owned("data-test")),
        href: owned("href"),
        src: owned("src"),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Keep only the navigation category of a scan.
pub fn navigation_only(result: &PageScanResult) -> PageScanResult {
    let records = result.category(ElementCategory::Navigation).to_vec();
    PageScanResult::from_records(result.metadata.clone(), records)
}

// ============================================================================
// Persistence
// ============================================================================

/// Persist a scan as a new timestamped artifact. Never overwrites an earlier scan.
pub fn persist_scan(result: &PageScanResult, dir: &Path) -> Result<PathBuf, ForgeError> {
    let digest_input = serde_json::to_vec(result).map_err(|e| ForgeError::json("fingerprinting scan", e))?;
    let digest = fingerprint(&digest_input);
    let stem = format!(
        "scan_{}_{}",
        result.metadata.captured_at.format("%Y%m%dT%H%M%S%3fZ"),
        &digest[..8]
    );
    write_json_new(dir, &stem, result)
}

/// Persist the navigation-only map under a stable name (full replace).
pub fn persist_navigation_map(result: &PageScanResult, path: &Path) -> Result<(), ForgeError> {
    write_json_replace(path, &navigation_only(result))
}
