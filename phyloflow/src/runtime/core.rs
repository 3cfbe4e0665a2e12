//! Top-level entry point for running a workload.

use crate::executor::TaskExecutor;
use crate::graph::{FsInputCatalog, GraphBuilder, InputCatalog};
use crate::phase::PhaseExecutor;
use crate::run::{RunContext, RunMode, RunReport, get_execution_plan};
use crate::runtime::layout::RunLayout;
use crate::runtime::options::Settings;
use crate::template::TemplateCatalog;
use crate::workload::{ManifestRecord, load_manifest};
use chrono::Utc;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Orchestrator drives one run of a workload through a task executor.
///
/// Each call to [`run`](Self::run) builds a fresh task graph, so an
/// orchestrator can be reused for several workloads. Lane pools and the
/// task memo are per run.
pub struct Orchestrator {
    settings: Arc<Settings>,
    executor: Arc<dyn TaskExecutor>,
    inputs: Arc<dyn InputCatalog>,
    catalog: TemplateCatalog,
    run_id: String,
    layout: Option<RunLayout>,
}

impl Orchestrator {
    /// Create an orchestrator over validated settings.
    ///
    /// # Errors
    ///
    /// Returns a config error if the settings cannot drive a run (empty
    /// partitions, no hmax values, bad MrBayes parameters).
    pub fn new(settings: Settings, executor: Arc<dyn TaskExecutor>) -> PhyloflowResult<Self> {
        settings.sanitize()?;

        Ok(Self {
            settings: Arc::new(settings),
            executor,
            inputs: Arc::new(FsInputCatalog),
            catalog: TemplateCatalog::builtin(),
            run_id: ulid::Ulid::new().to_string(),
            layout: None,
        })
    }

    /// Replace the filesystem input listing.
    pub fn with_inputs(mut self, inputs: Arc<dyn InputCatalog>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Attach a run directory. Settings snapshot and report are written there.
    pub fn with_run_layout(mut self, run_id: impl Into<String>, layout: RunLayout) -> Self {
        self.run_id = run_id.into();
        self.layout = Some(layout);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the workload named by a manifest file.
    pub async fn run_manifest(&self, manifest: &Path, mode: RunMode) -> PhyloflowResult<RunReport> {
        let records = load_manifest(manifest)?;
        tracing::info!(
            manifest = %manifest.display(),
            records = records.len(),
            "Loaded manifest"
        );
        self.run(records, mode).await
    }

    /// Register, merge, and execute a workload.
    ///
    /// Failures of individual datasets are reported in the returned
    /// [`RunReport`]. An `Err` means the run as a whole could not proceed:
    /// an empty workload, an unsupported method combination, or a storage
    /// failure in the run directory.
    pub async fn run(
        &self,
        records: Vec<ManifestRecord>,
        mode: RunMode,
    ) -> PhyloflowResult<RunReport> {
        let started_at = Utc::now();
        tracing::info!(run_id = %self.run_id, ?mode, "Starting run");

        if let Some(layout) = &self.layout {
            layout.prepare()?;
        }

        let graph = Arc::new(GraphBuilder::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.executor),
            Arc::clone(&self.inputs),
        ));

        let ctx = RunContext {
            run_id: self.run_id.clone(),
            mode,
            settings: Arc::clone(&self.settings),
            catalog: self.catalog,
            executor: Arc::clone(&self.executor),
            graph: Arc::clone(&graph),
            layout: self.layout.clone(),
            records,
            registry: None,
            merge_plan: None,
            submitted: Vec::new(),
            outcomes: Vec::new(),
            plot: None,
        };
        let ctx = Arc::new(Mutex::new(ctx));

        let plan = get_execution_plan(mode);
        let phases = PhaseExecutor::execute(plan, Arc::clone(&ctx))
            .await
            .inspect_err(|e| tracing::error!(run_id = %self.run_id, error = %e, "Run aborted"))?;

        let (outcomes, plot) = {
            let mut ctx = ctx.lock().await;
            (std::mem::take(&mut ctx.outcomes), ctx.plot.take())
        };
        let report = RunReport {
            run_id: self.run_id.clone(),
            mode,
            started_at,
            finished_at: Utc::now(),
            tasks_submitted: graph.tasks().len(),
            outcomes,
            plot,
            phases,
        };

        tracing::info!(
            run_id = %self.run_id,
            tasks = report.tasks_submitted,
            variants = report.outcomes.len(),
            failed = report.failures().count(),
            elapsed_ms = report.phases.total_duration_ms as u64,
            "Run finished"
        );

        if let Some(layout) = &self.layout {
            write_report(layout, &report).await?;
        }
        Ok(report)
    }
}

async fn write_report(layout: &RunLayout, report: &RunReport) -> PhyloflowResult<()> {
    let path = layout.report_path();
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| PhyloflowError::Internal(format!("cannot serialize report: {}", e)))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| PhyloflowError::Storage(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::LocalExecutor;

    #[test]
    fn test_new_rejects_empty_hmax() {
        let mut settings = Settings::default();
        settings.general.hmax.clear();
        let executor: Arc<dyn TaskExecutor> = Arc::new(LocalExecutor::new().dry_run(true));
        assert!(matches!(
            Orchestrator::new(settings, executor),
            Err(PhyloflowError::Config(_))
        ));
    }

    #[test]
    fn test_run_layout_overrides_run_id() {
        let executor: Arc<dyn TaskExecutor> = Arc::new(LocalExecutor::new().dry_run(true));
        let orchestrator = Orchestrator::new(Settings::default(), executor)
            .unwrap()
            .with_run_layout("run-1", RunLayout::new(Path::new("/tmp/runinfo"), "run-1"));
        assert_eq!(orchestrator.run_id(), "run-1");
    }

    #[tokio::test]
    async fn test_empty_workload_is_rejected() {
        let executor: Arc<dyn TaskExecutor> = Arc::new(LocalExecutor::new().dry_run(true));
        let orchestrator = Orchestrator::new(Settings::default(), executor).unwrap();
        let err = orchestrator.run(Vec::new(), RunMode::Full).await.unwrap_err();
        assert!(matches!(err, PhyloflowError::Manifest(_)));
    }
}
