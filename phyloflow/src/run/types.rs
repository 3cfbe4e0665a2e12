//! Run context and report types.

use crate::executor::TaskExecutor;
use crate::graph::{BuiltPipeline, GraphBuilder};
use crate::phase::PlanMetrics;
use crate::runtime::layout::RunLayout;
use crate::runtime::options::Settings;
use crate::template::TemplateCatalog;
use crate::workload::{
    ManifestRecord, MergePlan, NetworkMethod, TreeMethod, WorkItem, WorkItemRegistry,
};
use chrono::{DateTime, Utc};
use phyloflow_shared::errors::PhyloflowError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Register, merge, prepare, submit every pipeline, wait for all of it.
    Full,
    /// Stop after data preparation.
    PrepareOnly,
}

/// Final state of one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    /// Data preparation finished; pipelines were not submitted.
    Prepared,
    Failed { stage: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantOutcome {
    pub directory: PathBuf,
    pub tree_method: TreeMethod,
    pub network_method: NetworkMethod,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl VariantOutcome {
    pub fn new(item: &WorkItem, status: OutcomeStatus) -> Self {
        Self {
            directory: item.directory.clone(),
            tree_method: item.tree_method,
            network_method: item.network_method,
            status,
        }
    }

    pub fn failed(item: &WorkItem, error: &PhyloflowError) -> Self {
        let stage = error.stage().unwrap_or("unknown").to_string();
        Self::new(
            item,
            OutcomeStatus::Failed {
                stage,
                error: error.to_string(),
            },
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Summary written to `report.json` at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks_submitted: usize,
    pub outcomes: Vec<VariantOutcome>,
    /// Network plot result; absent when plotting is off or had nothing to plot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<OutcomeStatus>,
    pub phases: PlanMetrics,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(VariantOutcome::is_failed)
            && !matches!(self.plot, Some(OutcomeStatus::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &VariantOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn outcome(&self, directory: &Path, tree: TreeMethod) -> Option<&VariantOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.directory == directory && o.tree_method == tree)
    }
}

/// Shared state threaded through the run phases.
pub struct RunContext {
    pub run_id: String,
    pub mode: RunMode,
    pub settings: Arc<Settings>,
    pub catalog: TemplateCatalog,
    pub executor: Arc<dyn TaskExecutor>,
    pub graph: Arc<GraphBuilder>,
    pub layout: Option<RunLayout>,

    /// Manifest records, consumed by registration.
    pub records: Vec<ManifestRecord>,
    pub registry: Option<WorkItemRegistry>,
    pub merge_plan: Option<MergePlan>,
    /// Variants whose pipelines are submitted and still running.
    pub submitted: Vec<(WorkItem, BuiltPipeline)>,
    pub outcomes: Vec<VariantOutcome>,
    pub plot: Option<OutcomeStatus>,
}

impl RunContext {
    /// Record an outcome for a variant unless it already has one.
    pub fn record(&mut self, outcome: VariantOutcome) {
        let exists = self.outcomes.iter().any(|o| {
            o.directory == outcome.directory && o.tree_method == outcome.tree_method
        });
        if !exists {
            self.outcomes.push(outcome);
        }
    }

    pub fn has_outcome(&self, item: &WorkItem) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.directory == item.directory && o.tree_method == item.tree_method)
    }
}
