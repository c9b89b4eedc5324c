use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attributes worth turning into `[attr="value"]` selectors, most stable first.
pub const NOTABLE_ATTRIBUTES: [&str; 6] = ["data-testid", "data-cy", "data-test", "name", "type", "role"];

/// One raw node from a page snapshot, as produced by the scan server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    pub tag: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub class_name: Option<String>,

    /// Every attribute present on the node (lowercase names)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub rect: BoundingBox,

    /// Computed `display` style
    #[serde(default)]
    pub display: Option<String>,

    /// Tag names of ancestors, nearest first
    #[serde(default)]
    pub ancestors: Vec<String>,

    /// Whether an `onclick` handler (attribute or property) is attached
    #[serde(default)]
    pub has_click_handler: bool,
}

impl DomElement {
    /// Lowercase tag name.
    pub fn tag_lower(&self) -> String {
        self.tag.to_ascii_lowercase()
    }

    /// Non-empty, trimmed id.
    pub fn id_attr(&self) -> Option<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Individual class names, in document order.
    pub fn classes(&self) -> Vec<&str> {
        self.class_name
            .as_deref()
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn role(&self) -> Option<String> {
        self.attr("role").map(|r| r.trim().to_ascii_lowercase())
    }

    /// Visible text with whitespace collapsed.
    pub fn clean_text(&self) -> String {
        self.text
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether a class name contains any of the given fragments (case-insensitive).
    pub fn class_contains(&self, fragments: &[&str]) -> bool {
        let classes = self.class_name.as_deref().unwrap_or("").to_lowercase();
        fragments.iter().any(|f| classes.contains(f))
    }
}

/// Rendered position and size of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Bucket assigned to every scanned element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementCategory {
    Navigation,
    Buttons,
    Links,
    Inputs,
    Images,
    Containers,
    Interactive,
    Texts,
    Others,
}

impl ElementCategory {
    pub const ALL: [ElementCategory; 9] = [
        ElementCategory::Navigation,
        ElementCategory::Buttons,
        ElementCategory::Links,
        ElementCategory::Inputs,
        ElementCategory::Images,
        ElementCategory::Containers,
        ElementCategory::Interactive,
        ElementCategory::Texts,
        ElementCategory::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementCategory::Navigation => "navigation",
            ElementCategory::Buttons => "buttons",
            ElementCategory::Links => "links",
            ElementCategory::Inputs => "inputs",
            ElementCategory::Images => "images",
            ElementCategory::Containers => "containers",
            ElementCategory::Interactive => "interactive",
            ElementCategory::Texts => "texts",
            ElementCategory::Others => "others",
        }
    }
}

impl fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
