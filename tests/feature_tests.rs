use std::collections::BTreeSet;

use bdd_forge::artifact::store::SourceFile;
use bdd_forge::audit::auditor::audit;
use bdd_forge::audit::step_index::StepIndex;
use bdd_forge::gherkin::classifier::{Rejection, StepClassifier};
use bdd_forge::gherkin::feature::{
    CasesFile, FeatureGenerator, FeatureSettings, GenerationError, IssueKind, TestCase, feature_file_name,
    split_numbered_steps, validate_feature_text,
};
use bdd_forge::gherkin::keyword::Keyword;
use bdd_forge::gherkin::page_object::{existing_page_objects, page_object_class_name, render_page_object};
use bdd_forge::gherkin::step_file::{CUCUMBER_MODULE, append_step_definitions, render_step_definitions};
use bdd_forge::gherkin::suite::generate_suite;
use bdd_forge::locator::optimizer::optimize;
use bdd_forge::scan::scanner::build_scan;

mod common;
use common::*;

fn case(title: &str, steps: &[&str]) -> TestCase {
    TestCase {
        title: title.to_string(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
    }
}

fn generator() -> FeatureGenerator {
    FeatureGenerator::new(StepClassifier::new(), FeatureSettings::default())
}

fn login_case() -> TestCase {
    case(
        "Valid login",
        &["1) Open the browser 2) Type \"standard_user\" in the username field 3) Type \"secret_sauce\" in the password field 4) Click the login button 5) Verify the inventory page loads"],
    )
}

// ============================================================================
// Input parsing
// ============================================================================

#[test]
fn numbered_instructions_are_split() {
    assert_eq!(
        split_numbered_steps("1) Open the site 2) Click login 10) Verify"),
        vec!["Open the site", "Click login", "Verify"]
    );
    assert_eq!(split_numbered_steps("Click the button"), vec!["Click the button"]);
    assert!(split_numbered_steps("   ").is_empty());
}

#[test]
fn cases_file_accepts_spanish_field_names() {
    let json = r#"{
        "Login": [
            {"titulo": "Ingreso válido", "pasos": ["Hago click en el botón Login"]},
            {"title": "No steps yet"}
        ]
    }"#;
    let cases: CasesFile = serde_json::from_str(json).unwrap();
    assert_eq!(cases["Login"][0].title, "Ingreso válido");
    assert_eq!(cases["Login"][0].steps.len(), 1);
    assert!(cases["Login"][1].steps.is_empty());
}

#[test]
fn file_names_are_snake_case() {
    assert_eq!(feature_file_name("Login Page"), "login_page");
    assert_eq!(feature_file_name("Carrito de compras!"), "carrito_de_compras");
    assert_eq!(feature_file_name("***"), "section");
}

// ============================================================================
// Feature generation
// ============================================================================

#[test]
fn generated_feature_has_background_tags_and_keywords() {
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    let text = document.render();

    assert!(text.starts_with("Feature: Login Page - Automated Tests\n"));
    assert!(text.contains("    Background:\n        Given I open the site\n        And I wait for the page to load\n"));
    assert!(text.contains("    @login_page @case_1\n    Scenario Outline: Valid login\n"));
    assert!(text.contains(
        "        When Type \"standard_user\" in the username field\n\
         \x20       And Type \"secret_sauce\" in the password field\n\
         \x20       And Click the login button\n\
         \x20       Then Verify the inventory page loads\n"
    ));
    assert!(text.contains("            | user          | pass         |\n"));
    assert!(text.contains("            | standard_user | secret_sauce |\n"));
}

#[test]
fn skip_phrases_drop_browser_setup() {
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    let steps = &document.scenarios[0].steps;
    assert_eq!(steps.len(), 4);
    assert!(steps.iter().all(|s| !s.text.to_lowercase().contains("browser")));
}

#[test]
fn every_rendered_step_has_an_english_keyword() {
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    assert!(validate_feature_text(&document.render()).is_empty());

    for scenario in &document.scenarios {
        for line in &scenario.steps {
            assert!(Keyword::ALL.contains(&line.keyword));
        }
    }
}

#[test]
fn case_without_remaining_steps_is_omitted() {
    let cases = vec![case("Setup only", &["Open the browser"]), login_case()];
    let document = generator().generate("Login Page", &cases).unwrap();

    assert_eq!(document.scenarios.len(), 1);
    assert_eq!(document.scenarios[0].tags, vec!["@login_page", "@case_2"]);
}

#[test]
fn rejected_instruction_fails_generation() {
    let cases = vec![case("Bad case", &["visit https://x.com"])];
    let err = generator().generate("Login Page", &cases).unwrap_err();

    match err {
        GenerationError::RejectedStep {
            section,
            case,
            step,
            reason,
        } => {
            assert_eq!(section, "Login Page");
            assert_eq!(case, "Bad case");
            assert_eq!(step, "visit https://x.com");
            assert_eq!(reason, Rejection::ContainsUrl);
        }
        other => panic!("Expected RejectedStep, got {:?}", other),
    }
}

#[test]
fn unclassifiable_instruction_is_never_emitted_as_and() {
    let cases = vec![case("Odd case", &["the weather is nice today"])];
    let err = generator().generate("Login Page", &cases).unwrap_err();
    assert!(matches!(
        err,
        GenerationError::RejectedStep {
            reason: Rejection::Unclassified,
            ..
        }
    ));
}

#[test]
fn background_line_without_keyword_is_an_error() {
    let settings = FeatureSettings {
        background: vec!["I open the site".to_string()],
        ..FeatureSettings::default()
    };
    let generator = FeatureGenerator::new(StepClassifier::new(), settings);
    assert!(matches!(
        generator.generate("Login", &[login_case()]),
        Err(GenerationError::InvalidBackground { .. })
    ));
}

#[test]
fn empty_examples_header_gives_plain_scenarios() {
    let settings = FeatureSettings {
        examples_header: Vec::new(),
        background: Vec::new(),
        ..FeatureSettings::default()
    };
    let document = FeatureGenerator::new(StepClassifier::new(), settings)
        .generate("Login", &[login_case()])
        .unwrap();
    let text = document.render();

    assert!(text.contains("    Scenario: Valid login\n"));
    assert!(!text.contains("Examples:"));
    assert!(!text.contains("Background:"));
}

#[test]
fn generated_steps_are_distinct() {
    let cases = vec![login_case(), case("Again", &["Click the login button"])];
    let document = generator().generate("Login Page", &cases).unwrap();

    // two background steps plus four from the first case
    assert_eq!(document.generated.len(), 6);
}

#[test]
fn literal_variants_share_one_definition() {
    let cases = vec![case(
        "Fill",
        &["Type \"a\" in the username field", "Type \"b\" in the username field"],
    )];
    let document = generator().generate("Login", &cases).unwrap();
    let text = document.render();

    assert!(text.contains("        When Type \"a\" in the username field\n        And Type \"b\" in the username field\n"));
    assert_eq!(document.generated.len(), 3);

    let source = render_step_definitions("Login", &document.generated, None);
    assert_eq!(source.matches("When(\"Type {string} in the username field\"").count(), 1);
    assert!(audit(&[SourceFile::new("login_steps.js", source)], &[]).duplicates.is_empty());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn validator_flags_missing_and_localized_keywords() {
    let text = "Feature: Shop\n\n  Scenario: Buy\n    Given I open the site\n    Cuando hago click\n    click the button\n    Then\n";
    let issues = validate_feature_text(text);

    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0].line, 5);
    assert_eq!(
        issues[0].kind,
        IssueKind::LocalizedKeyword {
            keyword: "Cuando".into()
        }
    );
    assert_eq!(issues[1].kind, IssueKind::MissingKeyword);
    assert_eq!(issues[2].kind, IssueKind::EmptyStep);
}

#[test]
fn validator_accepts_descriptions_tables_and_doc_strings() {
    let text = "\
@smoke
Feature: Shop
  Free text describing the feature.

  Scenario Outline: Login as <user>
    Given I am on the login page
    When I log in with:
      | user  |
      | alice |
    Then I see:
      \"\"\"
      anything goes here
      \"\"\"

    Scenarios:
      | user  |
      | alice |
";
    assert!(validate_feature_text(text).is_empty());
}

#[test]
fn table_row_outside_a_step_is_stray() {
    let text = "Feature: Shop\n  Scenario: Buy\n    | a | b |\n";
    let issues = validate_feature_text(text);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::StrayTableRow);
}

// ============================================================================
// Step definitions
// ============================================================================

#[test]
fn step_definitions_import_only_registrable_keywords() {
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    let source = render_step_definitions("Login Page", &document.generated, None);

    assert!(source.starts_with(&format!("import {{ Given, When, Then }} from \"{}\";\n", CUCUMBER_MODULE)));
    assert!(source.contains("// Step definitions for: Login Page"));
    assert!(source.contains("When(\"Type {string} in the username field\", (arg0) => {"));
    assert!(source.contains("Given(\"I open the site\", () => {\n    cy.visit(\"/\");\n});"));
    assert!(!source.contains("And("));
    assert!(!source.contains("But("));
}

#[test]
fn step_definitions_are_grouped_by_category() {
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    let source = render_step_definitions("Login Page", &document.generated, None);

    let navigation = source.find("// NAVIGATION").unwrap();
    let interaction = source.find("// INTERACTION").unwrap();
    let input = source.find("// INPUT").unwrap();
    let verification = source.find("// VERIFICATION").unwrap();
    assert!(navigation < interaction && interaction < input && input < verification);
}

#[test]
fn locator_map_binds_step_bodies() {
    let map = optimize(&build_scan(&login_page()), None, "scan.json");
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    let source = render_step_definitions("Login Page", &document.generated, Some(&map));

    assert!(source.contains("When(\"Click the login button\", () => {\n    cy.get(\"#login-button\").click();\n});"));
    assert!(source.contains("cy.get(\"#password\").clear().type(arg0);"));
}

// ============================================================================
// Suites
// ============================================================================

#[test]
fn suite_skips_phrases_that_are_already_defined() {
    let mut cases = CasesFile::new();
    cases.insert("Login Page".to_string(), vec![login_case()]);

    let existing = StepIndex::build(
        &[SourceFile::new(
            "common_steps.js",
            "When(\"click the login button\", () => {\n  cy.get(\"#login-button\").click();\n});\n",
        )],
        &[],
    );

    let output = generate_suite(&generator(), &cases, &existing, &BTreeSet::new(), None);
    let section = &output.sections[0];

    assert_eq!(section.file_stem, "login_page");
    assert_eq!(section.existing_steps, 1);
    assert_eq!(section.new_steps, 5);
    assert!(!section.step_text.as_deref().unwrap().contains("Click the login button"));
}

#[test]
fn suite_emits_each_phrase_once_per_run() {
    let mut cases = CasesFile::new();
    cases.insert("Cart".to_string(), vec![case("Add", &["Click the login button"])]);
    cases.insert("Login".to_string(), vec![login_case()]);

    let output = generate_suite(&generator(), &cases, &StepIndex::default(), &BTreeSet::new(), None);
    let cart = &output.sections[0];
    let login = &output.sections[1];

    assert_eq!(cart.new_steps, 3);
    assert_eq!(login.new_steps, 3);
    assert_eq!(login.existing_steps, 3);
}

#[test]
fn failing_section_does_not_stop_the_others() {
    let mut cases = CasesFile::new();
    cases.insert("Broken".to_string(), vec![case("Bad", &["visit https://x.com"])]);
    cases.insert("Login".to_string(), vec![login_case()]);

    let output = generate_suite(&generator(), &cases, &StepIndex::default(), &BTreeSet::new(), None);

    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].section, "Broken");
    assert!(output.failures[0].error.contains("contains a raw URL"));
    assert_eq!(output.sections.len(), 1);
    assert_eq!(output.sections[0].section, "Login");
}

#[test]
fn suite_keeps_section_definitions_for_appending() {
    let mut cases = CasesFile::new();
    cases.insert("Login".to_string(), vec![case("Logout", &["Click the logout button"])]);
    let existing_file = render_step_definitions(
        "Login",
        &generator().generate("Login", &[case("Login", &["Click the login button"])]).unwrap().generated,
        None,
    );
    let existing = StepIndex::build(&[SourceFile::new("login_steps.js", existing_file.clone())], &[]);

    let output = generate_suite(&generator(), &cases, &existing, &BTreeSet::new(), None);
    let section = &output.sections[0];
    assert_eq!(section.definitions.len(), 1);

    let merged = section.step_text_over(Some(&existing_file), None).unwrap();
    assert!(merged.starts_with(&existing_file.trim_end().to_string()));
    assert!(merged.contains("When(\"Click the login button\""));
    assert!(merged.contains("When(\"Click the logout button\""));
    assert_eq!(merged.matches("import {").count(), 1);
    assert_eq!(section.step_text_over(None, None), section.step_text);
}

#[test]
fn appended_definitions_follow_existing_content() {
    let existing = "When(\"I pay\", () => {\n    cy.pay();\n});\n\n\n";
    let document = generator().generate("Cart", &[case("Check", &["Verify the total is shown"])]).unwrap();
    let step = document.generated.last().unwrap().clone();

    let merged = append_step_definitions(existing, &[step], None);
    assert!(merged.starts_with("When(\"I pay\", () => {\n    cy.pay();\n});\n\n// ----"));
    assert!(merged.contains("Then(\"Verify the total is shown\", () => {"));
}

// ============================================================================
// Page objects
// ============================================================================

#[test]
fn page_object_class_names_are_pascal_case() {
    assert_eq!(page_object_class_name("Login Page"), "LoginPage");
    assert_eq!(page_object_class_name("my account - orders"), "MyAccountOrdersPage");
    assert_eq!(page_object_class_name("cart"), "CartPage");
    assert_eq!(page_object_class_name("2fa"), "Section2faPage");
    assert_eq!(page_object_class_name("!!"), "SectionPage");
}

#[test]
fn existing_classes_are_found_in_page_files() {
    let files = vec![
        SourceFile::new("LoginPage.js", "class LoginPage {\n}\nexport default new LoginPage();\n"),
        SourceFile::new("cart.js", "export default class CartPage {}\n// class NotAPage\n"),
    ];
    let classes = existing_page_objects(&files);
    assert_eq!(classes.into_iter().collect::<Vec<_>>(), vec!["CartPage", "LoginPage"]);
}

#[test]
fn page_object_lists_the_locators_its_steps_use() {
    let map = optimize(&build_scan(&login_page()), None, "scan.json");
    let document = generator().generate("Login Page", &[login_case()]).unwrap();

    let page = render_page_object("Login Page", &document.generated, &map).unwrap();
    assert_eq!(page.class_name, "LoginPage");
    assert_eq!(page.file_name, "LoginPage.js");
    assert_eq!(page.elements["login_button"], "#login-button");
    assert_eq!(page.elements["password"], "#password");
    assert!(page.text.starts_with("/**\n * Page object for: Login Page\n */\nclass LoginPage {\n    elements = {\n"));
    assert!(page.text.contains("        \"login_button\": \"#login-button\",\n"));
    assert!(page.text.ends_with("export default new LoginPage();\n"));
    assert!(existing_page_objects(&[SourceFile::new("LoginPage.js", page.text.clone())]).contains("LoginPage"));
}

#[test]
fn page_object_needs_a_matching_locator() {
    let empty = optimize(&build_scan(&snapshot(Vec::new())), None, "scan.json");
    let document = generator().generate("Login Page", &[login_case()]).unwrap();
    assert!(render_page_object("Login Page", &document.generated, &empty).is_none());
}

#[test]
fn suite_skips_existing_and_repeated_page_objects() {
    let map = optimize(&build_scan(&login_page()), None, "scan.json");
    let mut cases = CasesFile::new();
    cases.insert("Login Page".to_string(), vec![login_case()]);
    cases.insert("login page".to_string(), vec![case("Again", &["Click the login button"])]);

    let output = generate_suite(&generator(), &cases, &StepIndex::default(), &BTreeSet::new(), Some(&map));
    assert!(output.sections[0].page_object.is_some());
    assert!(output.sections[1].page_object.is_none());

    let existing = BTreeSet::from(["LoginPage".to_string()]);
    let output = generate_suite(&generator(), &cases, &StepIndex::default(), &existing, Some(&map));
    assert!(output.sections.iter().all(|s| s.page_object.is_none()));

    let output = generate_suite(&generator(), &cases, &StepIndex::default(), &BTreeSet::new(), None);
    assert!(output.sections.iter().all(|s| s.page_object.is_none()));
}
