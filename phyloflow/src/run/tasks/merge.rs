//! Task: fold per-directory requests into pipeline variants.

use super::{RunCtx, log_task_error, task_start};
use crate::phase::PhaseTask;
use crate::workload::PipelineMerger;
use async_trait::async_trait;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};

pub struct MergeTask;

#[async_trait]
impl PhaseTask<RunCtx> for MergeTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let registry = ctx
            .registry
            .as_ref()
            .ok_or_else(|| PhyloflowError::Internal("register_workload must run first".into()))?;

        let merger = PipelineMerger::new(&ctx.catalog, ctx.settings.general.nodes);
        let plan = merger
            .merge(registry)
            .inspect_err(|e| log_task_error(&run_id, task_name, e))?;

        ctx.executor.apply_load_hint(&plan.load_hint);
        ctx.merge_plan = Some(plan);
        Ok(())
    }

    fn name(&self) -> &str {
        "merge_variants"
    }
}
