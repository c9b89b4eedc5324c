use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::ElementCategory;

/// A named, deduplicated selector record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorEntry {
    /// Slug derived from id, text or class
    pub key: String,

    pub primary: String,

    /// At most two fallbacks, in candidate order
    #[serde(default)]
    pub alternatives: Vec<String>,

    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    pub is_interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorMetadata {
    pub schema_version: u32,
    pub source_file: String,
    pub generated_at: DateTime<Utc>,
    pub total_entries: usize,

    /// Records dropped because their slug was already taken in the category
    pub collisions: usize,

    #[serde(default)]
    pub collisions_by_category: BTreeMap<ElementCategory, usize>,
}

/// Category → slug → entry. Regenerated wholesale on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorMap {
    pub metadata: LocatorMetadata,
    pub categories: BTreeMap<ElementCategory, BTreeMap<String, LocatorEntry>>,
}

impl LocatorMap {
    pub fn get(&self, category: ElementCategory, key: &str) -> Option<&LocatorEntry> {
        self.categories.get(&category).and_then(|m| m.get(key))
    }

    pub fn entries(&self) -> impl Iterator<Item = (ElementCategory, &LocatorEntry)> {
        self.categories
            .iter()
            .flat_map(|(c, m)| m.values().map(move |e| (*c, e)))
    }

    /// Find the entry a free-text phrase refers to.
    ///
    /// An entry matches when every `_`-separated token of its slug appears as a
    /// word in the phrase. The longest matching slug wins; ties go to
    /// interactive entries, then to category and key order.
    pub fn lookup(&self, phrase: &str) -> Option<&LocatorEntry> {
        let words: Vec<String> = phrase
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        let mut best: Option<(usize, bool, &LocatorEntry)> = None;
        for (_, entry) in self.entries() {
            let tokens: Vec<&str> = entry.key.split('_').filter(|t| !t.is_empty()).collect();
            if tokens.is_empty() || !tokens.iter().all(|t| words.iter().any(|w| w == t)) {
                continue;
            }

            let score = (entry.key.len(), entry.is_interactive);
            let better = match best {
                None => true,
                Some((len, interactive, _)) => score > (len, interactive),
            };
            if better {
                best = Some((score.0, score.1, entry));
            }
        }

        best.map(|(_, _, entry)| entry)
    }
}
