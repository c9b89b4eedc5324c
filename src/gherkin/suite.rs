use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::audit::step_index::StepIndex;
use crate::gherkin::classifier::{GeneratedStep, StepBatch};
use crate::gherkin::feature::{CasesFile, FeatureGenerator, feature_file_name};
use crate::gherkin::page_object::{PageObject, page_object_class_name, render_page_object};
use crate::gherkin::step_file::{append_step_definitions, render_step_definitions};
use crate::locator::locator_model::LocatorMap;

/// Generated text for one section, ready to be written.
#[derive(Debug, Clone, Serialize)]
pub struct SectionOutput {
    pub section: String,
    pub file_stem: String,
    pub feature_text: String,

    /// `None` when every step of the section already has a definition
    pub step_text: Option<String>,

    /// Steps that still need a definition, in the order they were planned
    pub definitions: Vec<GeneratedStep>,

    /// `None` without a locator map, when no step matches a locator, or when
    /// the class already exists
    pub page_object: Option<PageObject>,

    pub scenarios: usize,
    pub new_steps: usize,
    pub existing_steps: usize,
}

impl SectionOutput {
    /// Step file contents to write given the file currently on disk.
    ///
    /// An existing file keeps its registrations and gets the new ones
    /// appended; `None` means there is nothing to write.
    pub fn step_text_over(&self, existing: Option<&str>, locators: Option<&LocatorMap>) -> Option<String> {
        if self.definitions.is_empty() {
            return None;
        }
        match existing {
            Some(current) => Some(append_step_definitions(current, &self.definitions, locators)),
            None => self.step_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionFailure {
    pub section: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteOutput {
    pub sections: Vec<SectionOutput>,
    pub failures: Vec<SectionFailure>,
}

/// Generate every section of a cases file.
///
/// A section that fails is reported and skipped; the others still produce
/// output. Step definitions are emitted once per run: phrases already in
/// `existing`, or emitted for an earlier section, are left out. Page objects
/// are never generated for a class in `existing_pages` or twice in one run.
pub fn generate_suite(
    generator: &FeatureGenerator,
    cases: &CasesFile,
    existing: &StepIndex,
    existing_pages: &BTreeSet<String>,
    locators: Option<&LocatorMap>,
) -> SuiteOutput {
    let mut output = SuiteOutput::default();
    let mut batch = StepBatch::new();
    let mut pages = existing_pages.clone();

    for (section, section_cases) in cases {
        let document = match generator.generate(section, section_cases) {
            Ok(document) => document,
            Err(e) => {
                warn!(section = %section, error = %e, "section skipped");
                output.failures.push(SectionFailure {
                    section: section.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let mut fresh = Vec::new();
        let mut existing_steps = 0;
        for step in &document.generated {
            if existing.is_defined(&step.expression) {
                existing_steps += 1;
                continue;
            }
            if batch.push_step(&step.text, step.clone()) {
                fresh.push(step.clone());
            } else {
                existing_steps += 1;
            }
        }
        debug!(section = %section, new = fresh.len(), existing = existing_steps, "step definitions planned");

        let page_object = match locators {
            Some(map) if !pages.contains(&page_object_class_name(section)) => {
                render_page_object(section, &document.generated, map)
            }
            Some(_) => {
                debug!(section = %section, "page object already exists, skipped");
                None
            }
            None => None,
        };
        if let Some(page) = &page_object {
            pages.insert(page.class_name.clone());
        }

        let step_text = (!fresh.is_empty()).then(|| render_step_definitions(section, &fresh, locators));
        output.sections.push(SectionOutput {
            section: section.clone(),
            file_stem: feature_file_name(section),
            feature_text: document.render(),
            step_text,
            new_steps: fresh.len(),
            definitions: fresh,
            page_object,
            scenarios: document.scenarios.len(),
            existing_steps,
        });
    }

    output
}
