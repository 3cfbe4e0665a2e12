//! phyloflow command-line entry point.
//!
//! Loads settings and a workload manifest, then runs every requested
//! pipeline through the local executor. Exits non-zero if any dataset
//! failed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use phyloflow::logging::init_logging;
use phyloflow::run::OutcomeStatus;
use phyloflow::{LocalExecutor, Orchestrator, RunLayout, RunMode, Settings, TaskExecutor};

#[derive(Parser, Debug)]
#[command(name = "phyloflow")]
#[command(about = "Run phylogenetic network pipelines over a workload of datasets")]
#[command(version)]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long, default_value = "phyloflow.toml")]
    settings: PathBuf,

    /// Workload manifest, overriding `general.workload`
    #[arg(short, long)]
    workload: Option<PathBuf>,

    /// Directory holding per-run logs and reports
    #[arg(short, long, default_value = "runinfo")]
    runinfo: PathBuf,

    /// Stop after data preparation
    #[arg(long)]
    prepare_only: bool,

    /// Plot every finished network at the end of the run
    #[arg(long)]
    plot: bool,

    /// Print commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut settings = Settings::load(&args.settings)
        .with_context(|| format!("Failed to load settings from {}", args.settings.display()))?;
    settings.plot.enabled |= args.plot;

    let run_id = ulid::Ulid::new().to_string();
    let layout = RunLayout::new(&args.runinfo, &run_id);
    layout.prepare().context("Failed to create run directory")?;

    let _log_guard = init_logging(Some(layout.log_file().as_path()), args.verbose)
        .context("Failed to initialize logging")?;

    tracing::info!(
        run_id = %run_id,
        workflow = %settings.general.workflow_name,
        run_dir = %layout.run_dir().display(),
        "phyloflow starting"
    );

    let executor: Arc<dyn TaskExecutor> = Arc::new(
        LocalExecutor::new()
            .with_log_dir(layout.task_logs_dir())
            .with_worker_init(settings.general.worker_init.clone())
            .dry_run(args.dry_run),
    );

    let manifest = args.workload.unwrap_or_else(|| settings.workload_path());
    let mode = if args.prepare_only {
        RunMode::PrepareOnly
    } else {
        RunMode::Full
    };

    let orchestrator = Orchestrator::new(settings, executor)
        .context("Invalid settings")?
        .with_run_layout(run_id, layout);
    let report = orchestrator
        .run_manifest(&manifest, mode)
        .await
        .context("Run aborted")?;

    for failure in report.failures() {
        if let OutcomeStatus::Failed { stage, error } = &failure.status {
            eprintln!(
                "FAILED {} [{}|{}] at {}: {}",
                failure.directory.display(),
                failure.tree_method,
                failure.network_method,
                stage,
                error
            );
        }
    }

    if let Some(OutcomeStatus::Failed { error, .. }) = &report.plot {
        eprintln!("FAILED network plot: {}", error);
    }

    if report.is_success() {
        println!(
            "{} variant(s) finished, {} task(s) submitted",
            report.outcomes.len(),
            report.tasks_submitted
        );
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
