use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::gherkin::classifier::{GeneratedStep, ParamKind, StepCategory, js_string};
use crate::locator::locator_model::{LocatorEntry, LocatorMap};

/// Module the generated definitions import their keywords from.
pub const CUCUMBER_MODULE: &str = "@badeball/cypress-cucumber-preprocessor";

const RULE: &str = "// ----------------------------------------";

/// Step-definition source for one section.
///
/// Only Given, When and Then are imported and registered. Steps are grouped
/// by category; within a group they keep their input order.
pub fn render_step_definitions(section: &str, steps: &[GeneratedStep], locators: Option<&LocatorMap>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "import {{ Given, When, Then }} from \"{CUCUMBER_MODULE}\";");
    out.push('\n');
    let _ = writeln!(out, "// Step definitions for: {section}");
    out.push_str(&render_step_blocks(steps, locators));
    out
}

/// Append new registrations to an existing step file, keeping everything it
/// already defines.
pub fn append_step_definitions(existing: &str, steps: &[GeneratedStep], locators: Option<&LocatorMap>) -> String {
    let mut out = existing.trim_end().to_string();
    out.push('\n');
    out.push_str(&render_step_blocks(steps, locators));
    out
}

/// Category banners and registrations, each block preceded by a blank line.
fn render_step_blocks(steps: &[GeneratedStep], locators: Option<&LocatorMap>) -> String {
    let mut groups: BTreeMap<StepCategory, Vec<&GeneratedStep>> = BTreeMap::new();
    for step in steps {
        groups.entry(step.category).or_default().push(step);
    }

    let mut out = String::new();
    for (category, group) in &groups {
        out.push('\n');
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "// {}", category.as_str().to_uppercase());
        let _ = writeln!(out, "{RULE}");

        for step in group {
            let body = resolve_body(step, locators);
            out.push('\n');
            let _ = writeln!(
                out,
                "{}({}, ({}) => {{",
                step.kind,
                js_string(&step.expression),
                param_names(&step.params)
            );
            for line in body.lines() {
                let _ = writeln!(out, "    {line}");
            }
            let _ = writeln!(out, "}});");
        }
    }

    out
}

fn param_names(params: &[ParamKind]) -> String {
    (0..params.len())
        .map(|i| format!("arg{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_string_arg(params: &[ParamKind]) -> Option<String> {
    params
        .iter()
        .position(|p| *p == ParamKind::String)
        .map(|i| format!("arg{i}"))
}

/// Body for a step: locator-backed when a map entry matches the step text,
/// otherwise the classifier's default.
pub fn resolve_body(step: &GeneratedStep, locators: Option<&LocatorMap>) -> String {
    let Some(entry) = locators.and_then(|m| m.lookup(&step.text)) else {
        return step.body.clone();
    };

    match locator_body(step, entry) {
        Some(body) => {
            debug!(step = %step.text, key = %entry.key, "step bound to locator");
            body
        }
        None => step.body.clone(),
    }
}

fn locator_body(step: &GeneratedStep, entry: &LocatorEntry) -> Option<String> {
    let target = format!("cy.get({})", js_string(&entry.primary));
    let arg = first_string_arg(&step.params);

    match step.category {
        StepCategory::Interaction => Some(format!("{target}.click();")),
        StepCategory::Input => arg.map(|a| format!("{target}.clear().type({a});")),
        StepCategory::Verification => Some(format!("{target}.should(\"be.visible\");")),
        StepCategory::Navigation => match (&entry.href, arg) {
            (_, Some(a)) => Some(format!("cy.visit({a});")),
            (Some(href), None) => Some(format!("cy.visit({});", js_string(href))),
            (None, None) => Some(format!("{target}.click();")),
        },
        StepCategory::Wait | StepCategory::General => None,
    }
}
