//! Task: submit data preparation for every directory and wait for it.

use super::{RunCtx, log_task_error, task_start};
use crate::barrier::Barrier;
use crate::phase::PhaseTask;
use crate::run::types::{OutcomeStatus, RunMode, VariantOutcome};
use async_trait::async_trait;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::collections::HashMap;
use std::path::PathBuf;

pub struct PrepareTask;

#[async_trait]
impl PhaseTask<RunCtx> for PrepareTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (graph, items) = {
            let ctx = ctx.lock().await;
            let registry = ctx.registry.as_ref().ok_or_else(|| {
                PhyloflowError::Internal("register_workload must run first".into())
            })?;
            (ctx.graph.clone(), registry.items().to_vec())
        };

        let mut failed: HashMap<PathBuf, PhyloflowError> = HashMap::new();
        let mut barrier = Barrier::new("data-prep");
        for item in &items {
            match graph.ensure_data_prep(item) {
                Ok(task) => barrier.add(task.future),
                Err(e) if e.is_item_scoped() => {
                    tracing::warn!(directory = %item.directory.display(), error = %e, "Cannot prepare dataset");
                    failed.insert(item.directory.clone(), e);
                }
                Err(e) => {
                    log_task_error(&run_id, task_name, &e);
                    return Err(e);
                }
            }
        }

        for failure in barrier.wait_collect().await {
            failed.insert(failure.directory.clone(), failure.into());
        }

        let mut ctx = ctx.lock().await;
        let variants = ctx
            .merge_plan
            .as_ref()
            .map(|plan| plan.variants.clone())
            .ok_or_else(|| PhyloflowError::Internal("merge_variants must run first".into()))?;

        for variant in &variants {
            if let Some(err) = failed.get(&variant.directory) {
                ctx.record(VariantOutcome::failed(variant, err));
            } else if ctx.mode == RunMode::PrepareOnly {
                ctx.record(VariantOutcome::new(variant, OutcomeStatus::Prepared));
            }
        }

        tracing::info!(
            directories = items.len(),
            failed = failed.len(),
            "Data preparation finished"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "prepare_datasets"
    }
}
