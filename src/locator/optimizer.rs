use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::Utc;
use tracing::{debug, info};

use crate::artifact::store::SCHEMA_VERSION;
use crate::dom::dom_model::ElementCategory;
use crate::locator::locator_model::{LocatorEntry, LocatorMap, LocatorMetadata};
use crate::scan::scan_model::{ElementRecord, PageScanResult};

/// Texts shorter than this (in characters) may become slugs.
pub const MAX_SLUG_TEXT_LEN: usize = 30;

const ATTRIBUTE_PATTERNS: [&str; 4] = ["[data-testid", "[data-cy", "[data-test", "[name"];
const MAX_ALTERNATIVES: usize = 2;

// ============================================================================
// Slugs
// ============================================================================

/// Lowercase, collapse every non-alphanumeric run into `_`, trim underscores.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Derive the stable key for a record: id, then short text, then first class,
/// then `<tag>_<id>`.
pub fn derive_slug(record: &ElementRecord) -> String {
    if let Some(slug) = record.attributes.id.as_deref().map(sanitize).filter(|s| !s.is_empty()) {
        return slug;
    }

    let text_len = record.text.chars().count();
    if (1..MAX_SLUG_TEXT_LEN).contains(&text_len) {
        let slug = sanitize(&record.text);
        if !slug.is_empty() {
            return slug;
        }
    }

    if let Some(slug) = record
        .attributes
        .class
        .as_deref()
        .and_then(|c| c.split_whitespace().next())
        .map(sanitize)
        .filter(|s| !s.is_empty())
    {
        return slug;
    }

    format!("{}_{}", sanitize(&record.tag), record.id)
}

// ============================================================================
// Selector ranking
// ============================================================================

/// Index of the best candidate: id > notable attribute > plain single class > first.
pub fn best_selector(candidates: &[String]) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }

    candidates
        .iter()
        .position(|s| s.starts_with('#'))
        .or_else(|| {
            candidates
                .iter()
                .position(|s| ATTRIBUTE_PATTERNS.iter().any(|p| s.contains(p)))
        })
        .or_else(|| candidates.iter().position(|s| is_single_class(s)))
        .or(Some(0))
}

fn is_single_class(selector: &str) -> bool {
    selector.starts_with('.')
        && selector.matches('.').count() == 1
        && !selector.contains(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
}

// ============================================================================
// Map building
// ============================================================================

fn to_entry(record: &ElementRecord, key: String) -> Option<LocatorEntry> {
    let best = best_selector(&record.selectors)?;
    let primary = record.selectors[best].clone();
    let alternatives = record
        .selectors
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best)
        .map(|(_, s)| s.clone())
        .take(MAX_ALTERNATIVES)
        .collect();

    let description = if record.text.is_empty() {
        record.tag.clone()
    } else {
        record.text.clone()
    };

    Some(LocatorEntry {
        key,
        primary,
        alternatives,
        description,
        href: record.attributes.href.clone(),
        src: record.attributes.src.clone(),
        is_interactive: record.is_interactive,
    })
}

/// Build the locator map from a scan and an optional navigation-only scan.
///
/// Records are visited in id order, main scan first. Within a category the
/// first record to claim a slug keeps it; later ones are dropped and counted
/// as collisions.
pub fn optimize(scan: &PageScanResult, navigation: Option<&PageScanResult>, source_file: &str) -> LocatorMap {
    let mut categories: BTreeMap<ElementCategory, BTreeMap<String, LocatorEntry>> = BTreeMap::new();
    let mut collisions_by_category: BTreeMap<ElementCategory, usize> = BTreeMap::new();

    let records = scan
        .records()
        .into_iter()
        .chain(navigation.map(|n| n.records()).unwrap_or_default());

    for record in records {
        let key = derive_slug(record);
        let bucket = categories.entry(record.category).or_default();

        match bucket.entry(key) {
            Entry::Occupied(taken) => {
                debug!(key = %taken.key(), record = record.id, category = %record.category, "slug collision");
                *collisions_by_category.entry(record.category).or_default() += 1;
            }
            Entry::Vacant(slot) => {
                if let Some(entry) = to_entry(record, slot.key().clone()) {
                    slot.insert(entry);
                }
            }
        }
    }

    let total_entries = categories.values().map(BTreeMap::len).sum();
    let collisions = collisions_by_category.values().sum();
    info!(total_entries, collisions, "locator map built");

    LocatorMap {
        metadata: LocatorMetadata {
            schema_version: SCHEMA_VERSION,
            source_file: source_file.to_string(),
            generated_at: Utc::now(),
            total_entries,
            collisions,
            collisions_by_category,
        },
        categories,
    }
}
