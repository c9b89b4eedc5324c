use crate::dom::dom_model::{DomElement, NOTABLE_ATTRIBUTES};

/// Text selectors are only emitted for labels shorter than this (in characters).
pub const MAX_TEXT_SELECTOR_LEN: usize = 50;

/// Produce candidate selectors for one element, most specific first.
///
/// Order: `#id`, the full class list, the first class, one attribute selector
/// per notable attribute, text pseudo-selectors (short text only), and the
/// bare tag as a last resort. Nothing is checked against the live DOM, so
/// callers must re-verify uniqueness.
pub fn synthesize_selectors(el: &DomElement) -> Vec<String> {
    let tag = el.tag_lower();
    let mut candidates: Vec<String> = Vec::new();

    if let Some(id) = el.id_attr() {
        candidates.push(format!("#{}", id));
    }

    let classes = el.classes();
    if !classes.is_empty() {
        candidates.push(format!(".{}", classes.join(".")));
        if classes.len() > 1 {
            candidates.push(format!(".{}", classes[0]));
        }
    }

    for attr in NOTABLE_ATTRIBUTES {
        if let Some(value) = el.attr(attr) {
            candidates.push(format!("[{}=\"{}\"]", attr, escape_quotes(value.trim())));
        }
    }

    let text = el.clean_text();
    let text_len = text.chars().count();
    if (1..MAX_TEXT_SELECTOR_LEN).contains(&text_len) {
        let escaped = escape_quotes(&text);
        candidates.push(format!("{}:contains(\"{}\")", tag, escaped));
        candidates.push(format!("{}:text-is(\"{}\")", tag, escaped));
    }

    candidates.push(tag);

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
