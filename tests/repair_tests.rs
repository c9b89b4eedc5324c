use bdd_forge::artifact::store::SourceFile;
use bdd_forge::audit::auditor::audit;
use bdd_forge::audit::repair::{RepairChange, repair_feature_text, repair_step_files};
use bdd_forge::gherkin::classifier::StepClassifier;
use bdd_forge::gherkin::keyword::Keyword;

mod common;
use common::*;

fn content_of<'a>(files: &'a [SourceFile], name: &str) -> &'a str {
    &files.iter().find(|f| f.name == name).unwrap().content
}

// ============================================================================
// Step-definition files
// ============================================================================

#[test]
fn localized_and_continuation_registrations_are_rekeyed() {
    let legacy = source(
        "legacy_steps.js",
        "import { Given, When, Then, And } from \"@badeball/cypress-cucumber-preprocessor\";\n\
         \n\
         Y(\"Y hago click en guardar\", () => {\n\
         \x20 cy.contains(\"Guardar\").click();\n\
         });\n\
         \n\
         And('I should see the total', () => {\n\
         \x20 cy.get(\"#total\").should(\"be.visible\");\n\
         });\n",
    );

    let report = repair_step_files(&[legacy], &StepClassifier::new());

    assert_eq!(
        report.files[0].content,
        "import { Given, When, Then } from \"@badeball/cypress-cucumber-preprocessor\";\n\
         \n\
         When(\"hago click en guardar\", () => {\n\
         \x20 cy.contains(\"Guardar\").click();\n\
         });\n\
         \n\
         Then(\"I should see the total\", () => {\n\
         \x20 cy.get(\"#total\").should(\"be.visible\");\n\
         });\n"
    );
    assert_eq!(report.changed, vec!["legacy_steps.js"]);
    assert!(report.changes.contains(&RepairChange::ImportFixed {
        file: "legacy_steps.js".into(),
        line: 1
    }));
    assert!(report.changes.contains(&RepairChange::Rekeyed {
        file: "legacy_steps.js".into(),
        line: 3,
        from: "Y".into(),
        to: Keyword::When
    }));
    assert!(report.changes.contains(&RepairChange::StrippedLocalizedPrefix {
        file: "legacy_steps.js".into(),
        line: 3
    }));
    assert!(report.changes.contains(&RepairChange::Requoted {
        file: "legacy_steps.js".into(),
        line: 7
    }));
}

#[test]
fn uncued_continuation_takes_the_previous_kind() {
    let file = source(
        "flow_steps.js",
        "Given(\"I open the site\", () => {});\nAnd(\"the banner is closed\", () => {});\n",
    );
    let report = repair_step_files(&[file], &StepClassifier::new());

    assert!(report.files[0].content.contains("Given(\"the banner is closed\""));
    assert_eq!(report.unrepairable().count(), 0);
}

#[test]
fn uninferable_keyword_is_left_alone_and_reported() {
    let original = "And(\"the weather is nice today\", () => {});\n";
    let report = repair_step_files(&[source("odd_steps.js", original)], &StepClassifier::new());

    assert_eq!(report.files[0].content, original);
    assert!(report.changed.is_empty());
    let unrepairable: Vec<&RepairChange> = report.unrepairable().collect();
    assert_eq!(unrepairable.len(), 1);
    assert!(matches!(unrepairable[0], RepairChange::Unrepairable { line: 1, .. }));
}

#[test]
fn unrepairable_line_reports_no_prefix_strip() {
    let original = "And(\"Y llueve mucho hoy\", () => {});\n";
    let report = repair_step_files(&[source("rain_steps.js", original)], &StepClassifier::new());

    assert_eq!(report.files[0].content, original);
    assert_eq!(report.changes.len(), 1);
    assert!(matches!(report.changes[0], RepairChange::Unrepairable { line: 1, .. }));
}

#[test]
fn template_literals_with_interpolation_keep_their_quotes() {
    let original = "When(`I pick ${item}`, () => {});\nWhen('I say \"hi\"', () => {});\n";
    let report = repair_step_files(&[source("quotes_steps.js", original)], &StepClassifier::new());
    assert_eq!(report.files[0].content, original);
}

#[test]
fn tabs_and_trailing_spaces_are_normalized() {
    let file = source("ws_steps.js", "Given(\"I open the site\", () => {\n\tcy.visit(\"/\");   \n});\n");
    let report = repair_step_files(&[file], &StepClassifier::new());

    assert_eq!(report.files[0].content, "Given(\"I open the site\", () => {\n    cy.visit(\"/\");\n});\n");
    assert!(report.changes.contains(&RepairChange::Whitespace {
        file: "ws_steps.js".into(),
        lines: 1
    }));
}

#[test]
fn later_duplicates_are_commented_out() {
    let a = source("a_steps.js", "When(\"I click {string}\", (label) => {\n  cy.contains(label).click();\n});\n");
    let b = source(
        "b_steps.js",
        "When('I click \"Save\"', () => {\n  cy.contains(\"Save\").click();\n});\n\nThen(\"I see it\", () => {});\n",
    );

    // input order does not decide which copy survives
    let report = repair_step_files(&[b.clone(), a.clone()], &StepClassifier::new());

    assert_eq!(content_of(&report.files, "a_steps.js"), a.content);
    assert_eq!(
        content_of(&report.files, "b_steps.js"),
        "// duplicate of a_steps.js:1\n\
         // When('I click \"Save\"', () => {\n\
         \x20 // cy.contains(\"Save\").click();\n\
         // });\n\
         \n\
         Then(\"I see it\", () => {});\n"
    );
    assert!(report.changes.contains(&RepairChange::CommentedDuplicate {
        file: "b_steps.js".into(),
        line: 1,
        phrase: "i click param".into(),
        kept: "a_steps.js:1".into(),
    }));

    let after = audit(&report.files, &[]);
    assert!(after.duplicates.is_empty());
}

#[test]
fn repairing_repaired_files_changes_nothing() {
    let files = vec![
        source(
            "a_steps.js",
            "import { Given, When, Then, Y } from \"@badeball/cypress-cucumber-preprocessor\";\n\tY('hago click en guardar', () => {});\nWhen(\"I pay\", () => {\n  cy.pay();\n});\n",
        ),
        source("b_steps.js", "When(\"I pay\", () => {\n\n  cy.pay();\n});\nAnd(\"it rains\", () => {});"),
    ];
    let classifier = StepClassifier::new();

    let first = repair_step_files(&files, &classifier);
    assert!(!first.changed.is_empty());

    let second = repair_step_files(&first.files, &classifier);
    assert_eq!(second.files, first.files);
    assert!(second.changed.is_empty());
}

// ============================================================================
// Feature files
// ============================================================================

const SPANISH_FEATURE: &str = "Característica: Tienda\n\nEscenario: Comprar\n  Dado que navego al sitio\n  Cuando When hago click en comprar\n  Y veo el total   \n\n\n";

#[test]
fn spanish_feature_is_translated() {
    let repaired = repair_feature_text("tienda.feature", SPANISH_FEATURE);

    assert_eq!(
        repaired.content,
        "Feature: Tienda\n\nScenario: Comprar\n  Given que navego al sitio\n  When hago click en comprar\n  And veo el total\n"
    );

    let translated = repaired
        .changes
        .iter()
        .filter(|c| matches!(c, RepairChange::TranslatedKeyword { .. }))
        .count();
    assert_eq!(translated, 5);
    assert!(repaired.changes.contains(&RepairChange::CollapsedKeyword {
        file: "tienda.feature".into(),
        line: 5
    }));
    assert!(
        repaired
            .changes
            .iter()
            .any(|c| matches!(c, RepairChange::Whitespace { .. }))
    );
}

#[test]
fn feature_repair_is_idempotent() {
    let once = repair_feature_text("tienda.feature", SPANISH_FEATURE);
    let twice = repair_feature_text("tienda.feature", &once.content);

    assert_eq!(twice.content, once.content);
    assert!(twice.changes.is_empty());
}

#[test]
fn english_feature_is_untouched() {
    let text = "Feature: Shop\n\n  Scenario: Buy\n    Given I open the site\n    And I wait\n";
    let repaired = repair_feature_text("shop.feature", text);
    assert_eq!(repaired.content, text);
    assert!(repaired.changes.is_empty());
}
