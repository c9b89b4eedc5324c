use crate::dom::dom_model::{DomElement, ElementCategory};

const SKIPPED_TAGS: [&str; 4] = ["script", "style", "meta", "link"];
const STRUCTURAL_TAGS: [&str; 5] = ["header", "footer", "main", "section", "article"];
const TEXT_TAGS: [&str; 9] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "div"];
const INTERACTIVE_TAGS: [&str; 5] = ["a", "button", "input", "select", "textarea"];
const INTERACTIVE_ROLES: [&str; 9] = [
    "button", "link", "tab", "checkbox", "radio", "menuitem", "option", "switch", "textbox",
];

/// Classify an element into exactly one category. First matching rule wins.
pub fn categorize(el: &DomElement) -> ElementCategory {
    let tag = el.tag_lower();
    let role = el.role();
    let role = role.as_deref();

    if is_navigation(el, &tag, role) {
        return ElementCategory::Navigation;
    }

    let input_type = el.attr("type").map(|t| t.to_ascii_lowercase());
    if tag == "button"
        || matches!(input_type.as_deref(), Some("button") | Some("submit"))
        || role == Some("button")
        || el.class_contains(&["btn", "button"])
    {
        return ElementCategory::Buttons;
    }

    if tag == "a" || role == Some("link") {
        return ElementCategory::Links;
    }

    if matches!(tag.as_str(), "input" | "textarea" | "select")
        || matches!(role, Some("textbox") | Some("combobox"))
    {
        return ElementCategory::Inputs;
    }

    if tag == "img" || role == Some("img") {
        return ElementCategory::Images;
    }

    if STRUCTURAL_TAGS.contains(&tag.as_str())
        || el.class_contains(&["container", "wrapper", "content"])
    {
        return ElementCategory::Containers;
    }

    if has_click_handler(el)
        || matches!(role, Some("tab") | Some("tabpanel"))
        || el.class_contains(&["clickable", "interactive"])
    {
        return ElementCategory::Interactive;
    }

    if TEXT_TAGS.contains(&tag.as_str()) {
        return ElementCategory::Texts;
    }

    ElementCategory::Others
}

fn is_navigation(el: &DomElement, tag: &str, role: Option<&str>) -> bool {
    tag == "nav"
        || el.class_contains(&["nav", "menu"])
        || role == Some("navigation")
        || el.ancestors.iter().any(|a| a.eq_ignore_ascii_case("nav"))
}

fn has_click_handler(el: &DomElement) -> bool {
    el.has_click_handler || el.attributes.contains_key("onclick")
}

/// Only visible, non-metadata elements are handed to the categorizer.
pub fn is_scannable(el: &DomElement) -> bool {
    let tag = el.tag_lower();
    if SKIPPED_TAGS.contains(&tag.as_str()) {
        return false;
    }

    let hidden = el
        .display
        .as_deref()
        .is_some_and(|d| d.trim().eq_ignore_ascii_case("none"));

    !hidden && el.rect.has_area()
}

/// Whether a user can act on the element directly.
pub fn is_interactive(el: &DomElement, category: ElementCategory) -> bool {
    if matches!(
        category,
        ElementCategory::Buttons
            | ElementCategory::Links
            | ElementCategory::Inputs
            | ElementCategory::Interactive
    ) {
        return true;
    }

    let tag = el.tag_lower();
    INTERACTIVE_TAGS.contains(&tag.as_str())
        || el
            .role()
            .is_some_and(|r| INTERACTIVE_ROLES.contains(&r.as_str()))
        || has_click_handler(el)
}
