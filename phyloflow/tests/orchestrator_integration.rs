//! Integration tests for a full run through the orchestrator.
//!
//! These tests verify the run end to end against a scripted executor:
//! - Data preparation is submitted once per directory
//! - Method requests for one directory merge into a single variant
//! - Unsupported combinations abort before any task is submitted
//! - Failures stay scoped to the dataset that produced them
//! - Prepare-only runs stop after data preparation
//! - The report is written to the run directory
//! - Network plotting covers only the variants that finished

use parking_lot::Mutex;
use phyloflow::executor::{Dependencies, FailureKind, TaskUnit};
use phyloflow::graph::InputCatalog;
use phyloflow::run::OutcomeStatus;
use phyloflow::template::InputSet;
use phyloflow::workload::ManifestRecord;
use phyloflow::{
    NetworkMethod, Orchestrator, PhyloflowError, PhyloflowResult, RunLayout, RunMode, Settings,
    StageKind, TaskExecutor, TaskFuture, TreeMethod,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Completes tasks after their dependencies, failing chosen (directory, stage) pairs.
#[derive(Default)]
struct ScriptedExecutor {
    submitted: Mutex<Vec<TaskUnit>>,
    failing: HashSet<(PathBuf, StageKind)>,
}

impl ScriptedExecutor {
    fn failing(directory: &str, stage: StageKind) -> Self {
        Self {
            failing: HashSet::from([(PathBuf::from(directory), stage)]),
            ..Default::default()
        }
    }

    fn count(&self, stage: StageKind) -> usize {
        self.submitted.lock().iter().filter(|u| u.stage == stage).count()
    }

    fn count_for(&self, directory: &str, stage: StageKind) -> usize {
        self.submitted
            .lock()
            .iter()
            .filter(|u| u.stage == stage && u.directory == Path::new(directory))
            .count()
    }

    fn total(&self) -> usize {
        self.submitted.lock().len()
    }
}

impl TaskExecutor for ScriptedExecutor {
    fn submit(&self, unit: TaskUnit, dependencies: Dependencies) -> TaskFuture {
        let (promise, future) = TaskFuture::pending(&unit);
        let fail = self
            .failing
            .contains(&(unit.directory.clone(), unit.stage));
        self.submitted.lock().push(unit);
        tokio::spawn(async move {
            match dependencies.wait().await {
                Err(failure) => promise.fail(failure.poison()),
                Ok(()) if fail => promise.fail(FailureKind::Exited(1)),
                Ok(()) => promise.succeed(0, 0),
            }
        });
        future
    }
}

/// Lists a fixed number of inputs per directory; unknown directories get the default.
struct StaticInputs {
    default: usize,
    per_directory: HashMap<PathBuf, usize>,
}

impl StaticInputs {
    fn uniform(count: usize) -> Self {
        Self {
            default: count,
            per_directory: HashMap::new(),
        }
    }

    fn with(mut self, directory: &str, count: usize) -> Self {
        self.per_directory.insert(PathBuf::from(directory), count);
        self
    }
}

impl InputCatalog for StaticInputs {
    fn list(&self, directory: &Path, set: InputSet) -> PhyloflowResult<Vec<PathBuf>> {
        let count = self
            .per_directory
            .get(directory)
            .copied()
            .unwrap_or(self.default);
        Ok((0..count)
            .map(|i| {
                directory
                    .join(set.subdirectory())
                    .join(format!("gene{}.{}", i, set.extension()))
            })
            .collect())
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.general.hmax = vec![1, 2];
    settings
}

fn record(directory: &str, tree: TreeMethod, network: NetworkMethod) -> ManifestRecord {
    ManifestRecord::new(directory).with_methods(tree, network)
}

fn orchestrator(executor: Arc<ScriptedExecutor>, inputs: StaticInputs) -> Orchestrator {
    Orchestrator::new(settings(), executor)
        .unwrap()
        .with_inputs(Arc::new(inputs))
}

fn plotting_orchestrator(executor: Arc<ScriptedExecutor>, inputs: StaticInputs) -> Orchestrator {
    let mut settings = settings();
    settings.plot.enabled = true;
    Orchestrator::new(settings, executor)
        .unwrap()
        .with_inputs(Arc::new(inputs))
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_one_data_prep_per_directory() {
    let executor = Arc::new(ScriptedExecutor::default());
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(3));

    let records = vec![
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d2", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d1", TreeMethod::Iqtree, NetworkMethod::Mpl),
        record("/data/d3", TreeMethod::Iqtree, NetworkMethod::Mp),
    ];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    assert!(report.is_success());
    assert_eq!(executor.count(StageKind::DataPrep), 3);
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.tasks_submitted, executor.total());
    assert_eq!(executor.count(StageKind::NetworkPlot), 0);
    assert_eq!(report.plot, None);
}

#[tokio::test]
async fn test_mpl_and_mp_requests_merge_into_both() {
    let executor = Arc::new(ScriptedExecutor::default());
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(4));

    let records = vec![
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mp),
    ];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let outcome = report.outcome(Path::new("/data/d1"), TreeMethod::Raxml).unwrap();
    assert_eq!(outcome.network_method, NetworkMethod::Both);
    assert_eq!(outcome.status, OutcomeStatus::Succeeded);

    // One shared tree prefix feeding both network branches.
    assert_eq!(executor.count(StageKind::TreeInference), 4);
    assert_eq!(executor.count(StageKind::TreeConsolidation), 1);
    assert_eq!(executor.count(StageKind::NetworkInferenceMPL), 2);
    assert_eq!(executor.count(StageKind::NetworkInferenceMP), 2);
}

#[tokio::test]
async fn test_unsupported_pair_aborts_before_submission() {
    let executor = Arc::new(ScriptedExecutor::default());
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(2));

    let records = vec![
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d2", TreeMethod::Mrbayes, NetworkMethod::Mp),
    ];
    let err = orchestrator.run(records, RunMode::Full).await.unwrap_err();

    assert!(matches!(err, PhyloflowError::Config(_)));
    assert_eq!(executor.total(), 0);
}

#[tokio::test]
async fn test_missing_inputs_fail_only_that_dataset() {
    let executor = Arc::new(ScriptedExecutor::default());
    let inputs = StaticInputs::uniform(2).with("/data/empty", 0);
    let orchestrator = orchestrator(executor.clone(), inputs);

    let records = vec![
        record("/data/empty", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d2", TreeMethod::Raxml, NetworkMethod::Mpl),
    ];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    assert!(!report.is_success());
    let failed = report.outcome(Path::new("/data/empty"), TreeMethod::Raxml).unwrap();
    match &failed.status {
        OutcomeStatus::Failed { stage, .. } => assert_eq!(stage, "TreeInference"),
        other => panic!("expected failure, got {:?}", other),
    }
    let ok = report.outcome(Path::new("/data/d2"), TreeMethod::Raxml).unwrap();
    assert_eq!(ok.status, OutcomeStatus::Succeeded);
    assert_eq!(executor.count_for("/data/d2", StageKind::NetworkInferenceMPL), 2);
    assert_eq!(executor.count_for("/data/empty", StageKind::TreeInference), 0);
}

#[tokio::test]
async fn test_task_failure_reported_with_origin_stage() {
    let executor = Arc::new(ScriptedExecutor::failing(
        "/data/d1",
        StageKind::SpeciesTreeEstimation,
    ));
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(2));

    let records = vec![
        record("/data/d1", TreeMethod::Iqtree, NetworkMethod::Both),
        record("/data/d2", TreeMethod::Iqtree, NetworkMethod::Both),
    ];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].directory, PathBuf::from("/data/d1"));
    match &failures[0].status {
        OutcomeStatus::Failed { stage, error } => {
            assert_eq!(stage, "SpeciesTreeEstimation");
            assert!(error.contains("/data/d1"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    // The MP branch of d1 does not depend on the species tree and still ran.
    assert_eq!(executor.count_for("/data/d1", StageKind::NetworkInferenceMP), 2);
}

#[tokio::test]
async fn test_data_prep_failure_skips_pipeline() {
    let executor = Arc::new(ScriptedExecutor::failing("/data/d1", StageKind::DataPrep));
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(2));

    let records = vec![
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d2", TreeMethod::Raxml, NetworkMethod::Mpl),
    ];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    let failed = report.outcome(Path::new("/data/d1"), TreeMethod::Raxml).unwrap();
    assert!(failed.is_failed());
    assert_eq!(executor.count_for("/data/d1", StageKind::TreeInference), 0);
    assert_eq!(executor.count_for("/data/d2", StageKind::TreeInference), 2);
}

#[tokio::test]
async fn test_prepare_only_stops_after_data_prep() {
    let executor = Arc::new(ScriptedExecutor::default());
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(2));

    let records = vec![
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d2", TreeMethod::Mrbayes, NetworkMethod::Mpl),
    ];
    let report = orchestrator.run(records, RunMode::PrepareOnly).await.unwrap();

    assert_eq!(executor.total(), 2);
    assert_eq!(executor.count(StageKind::DataPrep), 2);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.status == OutcomeStatus::Prepared));
    assert_eq!(report.phases.phase_names(), vec!["register", "merge", "prepare"]);
}

#[tokio::test]
async fn test_report_and_settings_written_to_run_dir() {
    let tmp = TempDir::new().unwrap();
    let executor = Arc::new(ScriptedExecutor::default());
    let layout = RunLayout::new(tmp.path(), "run-1");
    let orchestrator = orchestrator(executor, StaticInputs::uniform(1))
        .with_run_layout("run-1", layout.clone());

    let records = vec![record("/data/d1", TreeMethod::Iqtree, NetworkMethod::Mp)];
    orchestrator.run(records, RunMode::Full).await.unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(layout.report_path()).unwrap()).unwrap();
    assert_eq!(report["run_id"], "run-1");
    assert_eq!(report["mode"], "full");
    assert_eq!(report["outcomes"][0]["status"], "succeeded");
    assert_eq!(report["outcomes"][0]["tree_method"], "IQTREE");
    assert!(layout.settings_snapshot().is_file());
}

#[tokio::test]
async fn test_run_manifest_file() {
    let tmp = TempDir::new().unwrap();
    let manifest = tmp.path().join("workload.txt");
    std::fs::write(
        &manifest,
        "# directory|tree|network|outgroup|mapping\nd1|RAXML|MPL|Z|\nd2|||Z|\n",
    )
    .unwrap();

    let executor = Arc::new(ScriptedExecutor::default());
    let orchestrator = orchestrator(executor.clone(), StaticInputs::uniform(1));
    let report = orchestrator
        .run_manifest(&manifest, RunMode::PrepareOnly)
        .await
        .unwrap();

    let directories: HashSet<_> = report.outcomes.iter().map(|o| o.directory.clone()).collect();
    assert!(directories.contains(&tmp.path().join("d1")));
    assert!(directories.contains(&tmp.path().join("d2")));
}

#[tokio::test]
async fn test_plot_covers_only_finished_variants() {
    let executor = Arc::new(ScriptedExecutor::failing(
        "/data/d1",
        StageKind::SpeciesTreeEstimation,
    ));
    let orchestrator = plotting_orchestrator(executor.clone(), StaticInputs::uniform(2));

    let records = vec![
        record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl),
        record("/data/d2", TreeMethod::Iqtree, NetworkMethod::Both),
    ];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.plot, Some(OutcomeStatus::Succeeded));
    assert_eq!(report.phases.phase_names().last(), Some(&"plot"));
    assert_eq!(report.tasks_submitted, executor.total());

    let plots: Vec<TaskUnit> = executor
        .submitted
        .lock()
        .iter()
        .filter(|u| u.stage == StageKind::NetworkPlot)
        .cloned()
        .collect();
    assert_eq!(plots.len(), 1);
    let command = &plots[0].command;
    assert!(command.starts_with("julia scripts/plot_networks.jl "));
    for network in [
        "/data/d2/snaq/d2_IQTREE_MPL_1.out",
        "/data/d2/snaq/d2_IQTREE_MPL_2.out",
        "/data/d2/phylonet/d2_IQTREE_MP_1.nex",
        "/data/d2/phylonet/d2_IQTREE_MP_2.nex",
    ] {
        assert!(command.contains(network), "{network} missing from {command}");
    }
    assert!(!command.contains("/data/d1"));
}

#[tokio::test]
async fn test_failed_plot_fails_the_run() {
    let executor = Arc::new(ScriptedExecutor::failing("", StageKind::NetworkPlot));
    let orchestrator = plotting_orchestrator(executor.clone(), StaticInputs::uniform(1));

    let records = vec![record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mp)];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    assert_eq!(report.failures().count(), 0);
    assert!(!report.is_success());
    match &report.plot {
        Some(OutcomeStatus::Failed { stage, .. }) => assert_eq!(stage, "NetworkPlot"),
        other => panic!("expected plot failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plot_skipped_when_nothing_finished() {
    let executor = Arc::new(ScriptedExecutor::failing("/data/d1", StageKind::DataPrep));
    let orchestrator = plotting_orchestrator(executor.clone(), StaticInputs::uniform(1));

    let records = vec![record("/data/d1", TreeMethod::Raxml, NetworkMethod::Mpl)];
    let report = orchestrator.run(records, RunMode::Full).await.unwrap();

    assert_eq!(executor.count(StageKind::NetworkPlot), 0);
    assert_eq!(report.plot, None);
}
