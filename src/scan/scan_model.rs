use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{BoundingBox, ElementCategory};

// ============================================================================
// Element inventory
// ============================================================================

/// Snapshot of one scanned node. Built once per scan and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Sequential position within the scan (0-based)
    pub id: usize,

    /// Lowercase tag name
    pub tag: String,

    /// Candidate selectors, most specific first
    pub selectors: Vec<String>,

    /// Visible text, whitespace-collapsed and truncated
    pub text: String,

    pub attributes: ElementAttributes,

    pub bounding_box: BoundingBox,

    pub is_interactive: bool,

    pub category: ElementCategory,
}

/// The subset of attributes kept on a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub schema_version: u32,
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub captured_at: DateTime<Utc>,
    pub total_elements: usize,
}

/// Result of one page visit, grouped by category.
///
/// Every category key is present even when empty. Each scan produces a new
/// result; nothing updates one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScanResult {
    pub metadata: ScanMetadata,
    pub elements: BTreeMap<ElementCategory, Vec<ElementRecord>>,
}

impl PageScanResult {
    pub(crate) fn from_records(metadata: ScanMetadata, records: Vec<ElementRecord>) -> Self {
        let mut elements: BTreeMap<ElementCategory, Vec<ElementRecord>> = ElementCategory::ALL
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();

        for record in records {
            elements.entry(record.category).or_default().push(record);
        }

        let total_elements = elements.values().map(Vec::len).sum();
        Self {
            metadata: ScanMetadata {
                total_elements,
                ..metadata
            },
            elements,
        }
    }

    /// All records ordered by id.
    pub fn records(&self) -> Vec<&ElementRecord> {
        let mut all: Vec<&ElementRecord> = self.elements.values().flatten().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    pub fn category(&self, category: ElementCategory) -> &[ElementRecord] {
        self.elements
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Per-category counts, including zeros.
    pub fn counts(&self) -> BTreeMap<ElementCategory, usize> {
        ElementCategory::ALL
            .iter()
            .map(|c| (*c, self.category(*c).len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.total_elements == 0
    }
}
