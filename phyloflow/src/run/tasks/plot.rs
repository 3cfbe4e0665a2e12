//! Task: plot the networks of every variant that finished.

use super::{RunCtx, log_task_error, task_start};
use crate::barrier::Barrier;
use crate::phase::PhaseTask;
use crate::run::types::OutcomeStatus;
use crate::runtime::layout::DatasetLayout;
use crate::workload::{NetworkMethod, WorkItem};
use async_trait::async_trait;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::path::PathBuf;

pub struct PlotNetworksTask;

#[async_trait]
impl PhaseTask<RunCtx> for PlotNetworksTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (graph, networks) = {
            let ctx = ctx.lock().await;
            if !ctx.settings.plot.enabled {
                return Ok(());
            }
            let plan = ctx.merge_plan.as_ref().ok_or_else(|| {
                PhyloflowError::Internal("merge_variants must run first".into())
            })?;
            let networks: Vec<PathBuf> = plan
                .variants
                .iter()
                .filter(|variant| {
                    ctx.outcomes.iter().any(|o| {
                        o.directory == variant.directory
                            && o.tree_method == variant.tree_method
                            && o.status == OutcomeStatus::Succeeded
                    })
                })
                .flat_map(network_files)
                .collect();
            (ctx.graph.clone(), networks)
        };

        if networks.is_empty() {
            tracing::info!(run_id = %run_id, "No finished variants, skipping network plot");
            return Ok(());
        }

        let task = match graph.ensure_plot(&networks) {
            Ok(task) => task,
            Err(e) => {
                log_task_error(&run_id, task_name, &e);
                return Err(e);
            }
        };
        let mut barrier = Barrier::new("plot");
        barrier.add(task.future);

        let status = match barrier.wait().await {
            Ok(_) => OutcomeStatus::Succeeded,
            Err(failure) => {
                let err = PhyloflowError::from(failure);
                tracing::error!(run_id = %run_id, error = %err, "Network plot failed");
                OutcomeStatus::Failed {
                    stage: err.stage().unwrap_or("NetworkPlot").to_string(),
                    error: err.to_string(),
                }
            }
        };
        ctx.lock().await.plot = Some(status);
        Ok(())
    }

    fn name(&self) -> &str {
        "plot_networks"
    }
}

/// Network files a finished variant leaves behind, one per hmax and branch.
fn network_files(variant: &WorkItem) -> Vec<PathBuf> {
    let layout = DatasetLayout::new(&variant.directory);
    let tree = variant.tree_method;
    let mut files = Vec::new();
    for &hmax in &variant.hmax_values {
        if matches!(variant.network_method, NetworkMethod::Mpl | NetworkMethod::Both) {
            files.push(layout.snaq_network(tree, hmax));
        }
        if matches!(variant.network_method, NetworkMethod::Mp | NetworkMethod::Both) {
            files.push(layout.phylonet_network(tree, hmax));
        }
    }
    files
}
