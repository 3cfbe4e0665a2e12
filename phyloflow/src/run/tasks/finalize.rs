//! Task: end-of-run barrier over every submitted pipeline.

use super::{RunCtx, task_start};
use crate::barrier::{Barrier, wait_for_all};
use crate::phase::PhaseTask;
use crate::run::types::{OutcomeStatus, VariantOutcome};
use async_trait::async_trait;
use futures::future::join_all;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};

pub struct FinalBarrierTask;

#[async_trait]
impl PhaseTask<RunCtx> for FinalBarrierTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        task_start(&ctx, task_name).await;

        let (graph, submitted) = {
            let mut ctx = ctx.lock().await;
            (ctx.graph.clone(), std::mem::take(&mut ctx.submitted))
        };

        let waits = submitted.iter().map(|(variant, built)| async move {
            (variant, wait_for_all(&built.leaves).await)
        });
        let results = join_all(waits).await;

        // Tasks of aborted builds may still be running.
        let mut everything = Barrier::new("final");
        everything.extend(graph.tasks().into_iter().map(|task| task.future));
        everything.wait_collect().await;

        let mut ctx = ctx.lock().await;
        for (variant, result) in results {
            let outcome = match result {
                Ok(_) => VariantOutcome::new(variant, OutcomeStatus::Succeeded),
                Err(failure) => {
                    let err = PhyloflowError::from(failure);
                    tracing::error!(item = %variant.label(), error = %err, "Pipeline failed");
                    VariantOutcome::failed(variant, &err)
                }
            };
            ctx.record(outcome);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "final_barrier"
    }
}
