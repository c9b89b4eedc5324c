#![allow(dead_code)]

use std::collections::BTreeMap;

use bdd_forge::artifact::store::SourceFile;
use bdd_forge::dom::dom_model::{BoundingBox, DomElement};
use bdd_forge::scan::source::PageSnapshot;

// ============================================================================
// DOM builders
// ============================================================================

pub fn visible_rect() -> BoundingBox {
    BoundingBox {
        x: 10.0,
        y: 10.0,
        width: 120.0,
        height: 32.0,
    }
}

/// A visible element with the given tag and nothing else.
pub fn element(tag: &str) -> DomElement {
    DomElement {
        tag: tag.to_string(),
        rect: visible_rect(),
        display: Some("block".to_string()),
        ..DomElement::default()
    }
}

pub fn with_id(mut el: DomElement, id: &str) -> DomElement {
    el.id = Some(id.to_string());
    el
}

pub fn with_class(mut el: DomElement, class: &str) -> DomElement {
    el.class_name = Some(class.to_string());
    el
}

pub fn with_text(mut el: DomElement, text: &str) -> DomElement {
    el.text = Some(text.to_string());
    el
}

pub fn with_attr(mut el: DomElement, name: &str, value: &str) -> DomElement {
    el.attributes.insert(name.to_string(), value.to_string());
    el
}

pub fn inside(mut el: DomElement, ancestors: &[&str]) -> DomElement {
    el.ancestors = ancestors.iter().map(|a| a.to_string()).collect();
    el
}

pub fn hidden(mut el: DomElement) -> DomElement {
    el.display = Some("none".to_string());
    el
}

pub fn snapshot(elements: Vec<DomElement>) -> PageSnapshot {
    PageSnapshot {
        url: "https://shop.example.com/login".to_string(),
        title: "Login".to_string(),
        elements,
    }
}

/// The small login page used across the pipeline tests.
pub fn login_page() -> PageSnapshot {
    snapshot(vec![
        inside(with_text(with_attr(element("a"), "href", "/home"), "Home"), &["li", "ul", "nav"]),
        with_attr(with_attr(with_id(element("input"), "user-name"), "name", "username"), "type", "text"),
        with_attr(with_attr(with_id(element("input"), "password"), "name", "password"), "type", "password"),
        with_text(with_class(with_id(element("button"), "login-button"), "btn btn-primary"), "Login"),
        with_text(element("h1"), "Welcome back"),
        with_attr(with_attr(element("img"), "src", "/logo.png"), "alt", "logo"),
        hidden(with_text(element("div"), "Error banner")),
        element("script"),
    ])
}

// ============================================================================
// Source file builders
// ============================================================================

pub fn source(name: &str, content: &str) -> SourceFile {
    SourceFile::new(name, content)
}

pub fn attributes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
