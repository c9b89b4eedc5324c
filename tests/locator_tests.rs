use bdd_forge::dom::dom_model::ElementCategory;
use bdd_forge::locator::locator_model::LocatorMap;
use bdd_forge::locator::optimizer::{best_selector, derive_slug, optimize, sanitize};
use bdd_forge::scan::scanner::{build_scan, navigation_only};

mod common;
use common::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Slugs
// ============================================================================

#[test]
fn sanitize_collapses_separators() {
    assert_eq!(sanitize("Login-Button"), "login_button");
    assert_eq!(sanitize("  Add to   cart! "), "add_to_cart");
    assert_eq!(sanitize("--"), "");
}

#[test]
fn slug_prefers_id_then_text_then_class_then_tag() {
    let scan = build_scan(&snapshot(vec![
        with_text(with_id(element("button"), "Submit-Order"), "Place order"),
        with_class(with_text(element("span"), "Sale!"), "badge"),
        with_class(with_text(element("div"), &"long text ".repeat(5)), "promo-box big"),
        with_text(element("p"), &"x".repeat(40)),
    ]));
    let records = scan.records();

    assert_eq!(derive_slug(records[0]), "submit_order");
    assert_eq!(derive_slug(records[1]), "sale");
    assert_eq!(derive_slug(records[2]), "promo_box");
    assert_eq!(derive_slug(records[3]), "p_3");
}

// ============================================================================
// Selector ranking
// ============================================================================

#[test]
fn id_selector_ranks_first() {
    let candidates = strings(&[".btn", "[name=\"go\"]", "#go", "button"]);
    assert_eq!(best_selector(&candidates), Some(2));
}

#[test]
fn notable_attribute_beats_class() {
    let candidates = strings(&[".btn.primary", ".btn", "[data-testid=\"go\"]", "button"]);
    assert_eq!(best_selector(&candidates), Some(2));
}

#[test]
fn single_class_beats_compound_class() {
    let candidates = strings(&[".btn.primary", ".btn", "button"]);
    assert_eq!(best_selector(&candidates), Some(1));
}

#[test]
fn first_candidate_is_the_fallback() {
    assert_eq!(best_selector(&strings(&["button:contains(\"Go\")", "button"])), Some(0));
    assert_eq!(best_selector(&[]), None);
}

// ============================================================================
// Map building
// ============================================================================

#[test]
fn login_button_maps_to_its_id() {
    let map = optimize(&build_scan(&login_page()), None, "scan.json");
    let entry = map.get(ElementCategory::Buttons, "login_button").unwrap();

    assert_eq!(entry.primary, "#login-button");
    assert_eq!(entry.alternatives.len(), 2);
    assert_eq!(entry.alternatives[0], ".btn.btn-primary");
    assert_eq!(entry.description, "Login");
    assert!(entry.is_interactive);
}

#[test]
fn first_record_keeps_a_colliding_slug() {
    let scan = build_scan(&snapshot(vec![
        with_id(with_text(element("button"), "Save"), "save"),
        with_class(with_text(element("button"), "Save"), "secondary"),
    ]));
    let map = optimize(&scan, None, "scan.json");

    assert_eq!(map.get(ElementCategory::Buttons, "save").unwrap().primary, "#save");
    assert_eq!(map.metadata.collisions, 1);
    assert_eq!(map.metadata.collisions_by_category[&ElementCategory::Buttons], 1);
    assert_eq!(map.metadata.total_entries, 1);
}

#[test]
fn same_slug_in_different_categories_does_not_collide() {
    let scan = build_scan(&snapshot(vec![
        with_text(element("button"), "Cart"),
        with_text(with_attr(element("a"), "href", "/cart"), "Cart"),
    ]));
    let map = optimize(&scan, None, "scan.json");

    assert!(map.get(ElementCategory::Buttons, "cart").is_some());
    assert_eq!(map.get(ElementCategory::Links, "cart").unwrap().href.as_deref(), Some("/cart"));
    assert_eq!(map.metadata.collisions, 0);
}

#[test]
fn main_scan_wins_over_navigation_scan() {
    let scan = build_scan(&login_page());
    let nav = navigation_only(&scan);
    let map = optimize(&scan, Some(&nav), "scan.json");

    assert_eq!(map.categories[&ElementCategory::Navigation].len(), 1);
    assert_eq!(map.metadata.collisions, 1);
}

#[test]
fn optimizing_twice_gives_the_same_entries() {
    let scan = build_scan(&login_page());
    let first = optimize(&scan, None, "scan.json");
    let second = optimize(&scan, None, "scan.json");
    assert_eq!(first.categories, second.categories);
}

#[test]
fn locator_map_round_trips_through_json() {
    let map = optimize(&build_scan(&login_page()), None, "scan.json");
    let json = serde_json::to_string_pretty(&map).unwrap();
    assert!(json.contains("\"buttons\""));

    let reread: LocatorMap = serde_json::from_str(&json).unwrap();
    assert_eq!(reread, map);
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn lookup_matches_slug_tokens_in_a_phrase() {
    let map = optimize(&build_scan(&login_page()), None, "scan.json");

    assert_eq!(map.lookup("I click the login button").unwrap().primary, "#login-button");
    assert_eq!(map.lookup("I type \"a\" in the password field").unwrap().primary, "#password");
    assert!(map.lookup("I open the checkout").is_none());
}

#[test]
fn lookup_prefers_the_longest_slug() {
    let scan = build_scan(&snapshot(vec![
        with_id(element("button"), "login"),
        with_id(element("button"), "login-button"),
    ]));
    let map = optimize(&scan, None, "scan.json");
    assert_eq!(map.lookup("click the login button").unwrap().key, "login_button");
    assert_eq!(map.lookup("go to login").unwrap().key, "login");
}
