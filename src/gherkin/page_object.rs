use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::artifact::store::SourceFile;
use crate::gherkin::classifier::{GeneratedStep, js_string};
use crate::locator::locator_model::LocatorMap;

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:export\s+(?:default\s+)?)?class\s+([A-Za-z_$][\w$]*)").expect("valid regex")
});

/// A generated page-object class for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageObject {
    pub class_name: String,
    pub file_name: String,

    /// Slug → primary selector
    pub elements: BTreeMap<String, String>,

    pub text: String,
}

/// `Login Page` → `LoginPage`, `cart` → `CartPage`.
pub fn page_object_class_name(section: &str) -> String {
    let mut name: String = section
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    if name.chars().next().is_none_or(|c| c.is_numeric()) {
        name.insert_str(0, "Section");
    }
    if !name.ends_with("Page") {
        name.push_str("Page");
    }
    name
}

/// Class names declared in existing page-object files.
pub fn existing_page_objects(files: &[SourceFile]) -> BTreeSet<String> {
    files
        .iter()
        .flat_map(|f| CLASS_DECL.captures_iter(&f.content).map(|c| c[1].to_string()))
        .collect()
}

/// Page object holding the locators the section's steps refer to.
///
/// `None` when no step of the section matches a locator entry.
pub fn render_page_object(section: &str, steps: &[GeneratedStep], locators: &LocatorMap) -> Option<PageObject> {
    let mut elements = BTreeMap::new();
    for step in steps {
        if let Some(entry) = locators.lookup(&step.text) {
            elements.entry(entry.key.clone()).or_insert_with(|| entry.primary.clone());
        }
    }
    if elements.is_empty() {
        return None;
    }

    let class_name = page_object_class_name(section);
    let mut text = String::new();
    let _ = writeln!(text, "/**");
    let _ = writeln!(text, " * Page object for: {section}");
    let _ = writeln!(text, " */");
    let _ = writeln!(text, "class {class_name} {{");
    let _ = writeln!(text, "    elements = {{");
    for (key, selector) in &elements {
        let _ = writeln!(text, "        {}: {},", js_string(key), js_string(selector));
    }
    let _ = writeln!(text, "    }};");
    text.push('\n');
    let _ = writeln!(text, "    get(name) {{");
    let _ = writeln!(text, "        return cy.get(this.elements[name]);");
    let _ = writeln!(text, "    }}");
    let _ = writeln!(text, "}}");
    text.push('\n');
    let _ = writeln!(text, "export default new {class_name}();");

    Some(PageObject {
        file_name: format!("{class_name}.js"),
        class_name,
        elements,
        text,
    })
}
