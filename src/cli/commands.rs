use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tracing::{debug, info};

use crate::artifact::store::{read_dir_sources, read_json, write_json_replace, write_text, write_text_with_backup};
use crate::audit::auditor::audit;
use crate::audit::repair::{repair_feature_text, repair_step_files};
use crate::audit::step_index::StepIndex;
use crate::browser::session::BrowserSession;
use crate::cli::config::AppConfig;
use crate::gherkin::classifier::StepBatch;
use crate::gherkin::feature::{CasesFile, FeatureGenerator, split_numbered_steps};
use crate::gherkin::page_object::existing_page_objects;
use crate::gherkin::suite::generate_suite;
use crate::locator::locator_model::LocatorMap;
use crate::locator::optimizer::optimize;
use crate::report::console::{
    format_audit_report, format_classification_summary, format_generation_summary, format_locator_summary,
    format_repair_report, format_scan_summary,
};
use crate::scan::scan_model::PageScanResult;
use crate::scan::scanner::{persist_navigation_map, persist_scan, scan_page};
use crate::scan::source::{DomSource, SnapshotFile};

pub const STEP_FILE_EXTENSION: &str = "js";
pub const FEATURE_FILE_EXTENSION: &str = "feature";

// ============================================================================
// scan subcommand
// ============================================================================

pub fn cmd_scan(
    config: &AppConfig,
    url: Option<&str>,
    snapshot: Option<&Path>,
    output_dir: Option<&Path>,
    ready_selector: Option<&str>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<PathBuf> {
    let mut readiness = config.scan.readiness();
    if let Some(ms) = timeout_ms {
        readiness.timeout = std::time::Duration::from_millis(ms);
    }

    let result = match (url, snapshot) {
        (_, Some(path)) => {
            let mut source = SnapshotFile::new(path);
            scan_page(&mut source, &readiness)
                .with_context(|| format!("scanning snapshot {}", path.display()))?
        }
        (Some(url), None) => {
            let selector = ready_selector.unwrap_or(&config.scan.ready_selector);
            let mut session =
                BrowserSession::launch(&config.scan.server_script)?.with_ready_selector(selector);
            session.navigate(url).with_context(|| format!("navigating to {}", url))?;
            let result = scan_page(&mut session as &mut dyn DomSource, &readiness)
                .with_context(|| format!("scanning {}", url))?;
            session.quit()?;
            result
        }
        (None, None) => bail!("either --url or --snapshot is required"),
    };

    let dir = output_dir.unwrap_or(&config.paths.scans_dir);
    let artifact = persist_scan(&result, dir)?;
    persist_navigation_map(&result, &config.paths.navigation_map)?;

    print!("{}", format_scan_summary(&result, &artifact));
    Ok(artifact)
}

// ============================================================================
// optimize subcommand
// ============================================================================

/// Newest `scan_*.json` in `dir`. Scan names sort by capture time.
pub fn latest_scan(dir: &Path) -> anyhow::Result<PathBuf> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading scans directory {}", dir.display()))?;

    let mut scans: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("scan_"))
        })
        .collect();
    scans.sort();

    match scans.pop() {
        Some(path) => Ok(path),
        None => bail!("no scan artifacts in {}; run `bdd-forge scan` first", dir.display()),
    }
}

pub fn cmd_optimize(
    config: &AppConfig,
    scan: Option<&Path>,
    navigation: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<LocatorMap> {
    let scan_path = match scan {
        Some(path) => path.to_path_buf(),
        None => latest_scan(&config.paths.scans_dir)?,
    };
    let scan_result: PageScanResult = read_json(&scan_path)?;

    let navigation_result: Option<PageScanResult> = match navigation {
        Some(path) => Some(read_json(path)?),
        None if config.paths.navigation_map.is_file() => Some(read_json(&config.paths.navigation_map)?),
        None => {
            debug!("no navigation map, using the main scan only");
            None
        }
    };

    let source_name = scan_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let map = optimize(&scan_result, navigation_result.as_ref(), &source_name);

    let output = output.unwrap_or(&config.paths.locators);
    write_json_replace(output, &map)?;

    print!("{}", format_locator_summary(&map, output));
    Ok(map)
}

// ============================================================================
// classify subcommand
// ============================================================================

pub fn cmd_classify(
    config: &AppConfig,
    instructions: &[String],
    file: Option<&Path>,
    vars: &[(String, String)],
) -> anyhow::Result<StepBatch> {
    let classifier = config.classifier.build()?;

    let mut all_vars: HashMap<String, String> = config.classifier.vars.clone();
    all_vars.extend(vars.iter().cloned());

    let mut inputs: Vec<String> = instructions.iter().flat_map(|i| split_numbered_steps(i)).collect();
    if let Some(path) = file {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading instructions from {}", path.display()))?;
        inputs.extend(content.lines().flat_map(split_numbered_steps));
    }
    if inputs.is_empty() {
        bail!("no instructions given");
    }

    let mut batch = StepBatch::new();
    for input in &inputs {
        batch.push(&classifier, input, &all_vars);
    }

    print!("{}", format_classification_summary(&batch));
    Ok(batch)
}

// ============================================================================
// generate subcommand
// ============================================================================

fn load_locators(config: &AppConfig, explicit: Option<&Path>) -> anyhow::Result<Option<LocatorMap>> {
    match explicit {
        Some(path) => Ok(Some(read_json(path)?)),
        None if config.paths.locators.is_file() => Ok(Some(read_json(&config.paths.locators)?)),
        None => {
            info!("no locator map found, step bodies stay generic");
            Ok(None)
        }
    }
}

pub fn cmd_generate(
    config: &AppConfig,
    cases: Option<&Path>,
    features_dir: Option<&Path>,
    steps_dir: Option<&Path>,
    locators: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let cases_path = cases.unwrap_or(&config.paths.cases);
    let features_dir = features_dir.unwrap_or(&config.paths.features_dir);
    let steps_dir = steps_dir.unwrap_or(&config.paths.steps_dir);

    let cases: CasesFile = read_json(cases_path)?;
    let existing_steps = read_dir_sources(steps_dir, STEP_FILE_EXTENSION)?;
    let index = StepIndex::build(&existing_steps, &[]);
    let pages = existing_page_objects(&read_dir_sources(&config.paths.pages_dir, STEP_FILE_EXTENSION)?);
    let locator_map = load_locators(config, locators)?;

    let generator = FeatureGenerator::new(config.classifier.build()?, config.feature.clone())
        .with_vars(config.classifier.vars.clone());
    let suite = generate_suite(&generator, &cases, &index, &pages, locator_map.as_ref());

    for section in &suite.sections {
        let feature_path = features_dir.join(format!("{}.{}", section.file_stem, FEATURE_FILE_EXTENSION));
        let steps_name = format!("{}_steps.{}", section.file_stem, STEP_FILE_EXTENSION);
        let steps_path = steps_dir.join(&steps_name);

        let current_steps = existing_steps
            .iter()
            .find(|f| f.name == steps_name)
            .map(|f| f.content.as_str());
        let step_text = section.step_text_over(current_steps, locator_map.as_ref());
        let page = section
            .page_object
            .as_ref()
            .map(|p| (config.paths.pages_dir.join(&p.file_name), &p.text));

        if dry_run {
            println!("--- {} ---\n{}", feature_path.display(), section.feature_text);
            if let Some(text) = &step_text {
                println!("--- {} ---\n{}", steps_path.display(), text);
            }
            if let Some((path, text)) = &page {
                println!("--- {} ---\n{}", path.display(), text);
            }
            continue;
        }

        write_text_with_backup(&feature_path, &section.feature_text)?;
        if let Some(text) = &step_text {
            write_text_with_backup(&steps_path, text)?;
        }
        if let Some((path, text)) = &page {
            write_text_with_backup(path, text)?;
        }
    }

    print!("{}", format_generation_summary(&suite));

    if !suite.failures.is_empty() {
        bail!("{} of {} sections failed to generate", suite.failures.len(), cases.len());
    }
    Ok(())
}

// ============================================================================
// audit subcommand
// ============================================================================

pub fn cmd_audit(
    config: &AppConfig,
    steps_dir: Option<&Path>,
    features_dir: Option<&Path>,
    json: Option<&Path>,
) -> anyhow::Result<()> {
    let steps = read_dir_sources(steps_dir.unwrap_or(&config.paths.steps_dir), STEP_FILE_EXTENSION)?;
    let features = read_dir_sources(features_dir.unwrap_or(&config.paths.features_dir), FEATURE_FILE_EXTENSION)?;

    let report = audit(&steps, &features);
    print!("{}", format_audit_report(&report));

    if let Some(path) = json {
        write_json_replace(path, &report)?;
    }
    Ok(())
}

// ============================================================================
// repair subcommand
// ============================================================================

pub fn cmd_repair(
    config: &AppConfig,
    steps_dir: Option<&Path>,
    features_dir: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let steps_dir = steps_dir.unwrap_or(&config.paths.steps_dir);
    let features_dir = features_dir.unwrap_or(&config.paths.features_dir);
    let classifier = config.classifier.build()?;

    let steps = read_dir_sources(steps_dir, STEP_FILE_EXTENSION)?;
    let report = repair_step_files(&steps, &classifier);

    let mut feature_changes = Vec::new();
    let mut feature_writes = Vec::new();
    for feature in read_dir_sources(features_dir, FEATURE_FILE_EXTENSION)? {
        let repaired = repair_feature_text(&feature.name, &feature.content);
        if repaired.content != feature.content {
            feature_writes.push((features_dir.join(&feature.name), repaired.content));
        }
        feature_changes.extend(repaired.changes);
    }

    if !dry_run {
        for file in report.files.iter().filter(|f| report.changed.contains(&f.name)) {
            write_text(&steps_dir.join(&file.name), &file.content)?;
        }
        for (path, content) in &feature_writes {
            write_text(path, content)?;
        }
    }

    print!("{}", format_repair_report(&report, &feature_changes, dry_run));
    Ok(())
}
