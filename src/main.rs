use clap::Parser;
use tracing_subscriber::EnvFilter;

use bdd_forge::cli::commands::{cmd_audit, cmd_classify, cmd_generate, cmd_optimize, cmd_repair, cmd_scan};
use bdd_forge::cli::config::{AppConfig, Cli, Commands, load_config};
use bdd_forge::trace::logger::RunLog;
use bdd_forge::trace::trace::RunEvent;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one subcommand, returning a short detail line for the run log.
fn run(command: &Commands, config: &AppConfig) -> anyhow::Result<String> {
    match command {
        Commands::Scan {
            url,
            snapshot,
            output_dir,
            ready_selector,
            timeout_ms,
        } => {
            let artifact = cmd_scan(
                config,
                url.as_deref(),
                snapshot.as_deref(),
                output_dir.as_deref(),
                ready_selector.as_deref(),
                *timeout_ms,
            )?;
            Ok(format!("wrote {}", artifact.display()))
        }
        Commands::Optimize {
            scan,
            navigation,
            output,
        } => {
            let map = cmd_optimize(config, scan.as_deref(), navigation.as_deref(), output.as_deref())?;
            Ok(format!(
                "{} entries, {} collisions",
                map.metadata.total_entries, map.metadata.collisions
            ))
        }
        Commands::Classify {
            instructions,
            file,
            vars,
        } => {
            let batch = cmd_classify(config, instructions, file.as_deref(), vars)?;
            Ok(format!("{} accepted, {} rejected", batch.steps().len(), batch.rejects().len()))
        }
        Commands::Generate {
            cases,
            features_dir,
            steps_dir,
            locators,
            dry_run,
        } => {
            cmd_generate(
                config,
                cases.as_deref(),
                features_dir.as_deref(),
                steps_dir.as_deref(),
                locators.as_deref(),
                *dry_run,
            )?;
            Ok("generated".to_string())
        }
        Commands::Audit {
            steps_dir,
            features_dir,
            json,
        } => {
            cmd_audit(config, steps_dir.as_deref(), features_dir.as_deref(), json.as_deref())?;
            Ok("audited".to_string())
        }
        Commands::Repair {
            steps_dir,
            features_dir,
            dry_run,
        } => {
            cmd_repair(config, steps_dir.as_deref(), features_dir.as_deref(), *dry_run)?;
            Ok(if *dry_run { "dry run" } else { "repaired" }.to_string())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let run_log = RunLog::new(&config.paths.run_log);
    let name = cli.command.name();

    match run(&cli.command, &config) {
        Ok(detail) => {
            run_log.log(&RunEvent::success(name).with_detail(detail));
        }
        Err(e) => {
            tracing::error!("{} failed: {:#}", name, e);
            run_log.log(&RunEvent::failure(name, &e));
            std::process::exit(1);
        }
    }
}
