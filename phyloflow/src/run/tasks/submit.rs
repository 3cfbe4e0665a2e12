//! Task: build and submit the pipeline of every surviving variant.

use super::{RunCtx, log_task_error, task_start};
use crate::phase::PhaseTask;
use crate::run::types::VariantOutcome;
use async_trait::async_trait;
use futures::future::join_all;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};

pub struct SubmitPipelinesTask;

#[async_trait]
impl PhaseTask<RunCtx> for SubmitPipelinesTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (graph, catalog, variants) = {
            let ctx = ctx.lock().await;
            let plan = ctx.merge_plan.as_ref().ok_or_else(|| {
                PhyloflowError::Internal("merge_variants must run first".into())
            })?;
            let variants: Vec<_> = plan
                .variants
                .iter()
                .filter(|variant| !ctx.has_outcome(variant))
                .cloned()
                .collect();
            (ctx.graph.clone(), ctx.catalog, variants)
        };

        // Builds interleave at their barrier stages, so lanes are shared
        // across datasets in submission order.
        let builds = variants.into_iter().map(|variant| {
            let graph = graph.clone();
            async move {
                let result = match catalog.resolve(variant.tree_method, variant.network_method) {
                    Ok(template) => graph.build(&variant, template).await,
                    Err(e) => Err(e),
                };
                (variant, result)
            }
        });
        let results = join_all(builds).await;

        let mut ctx = ctx.lock().await;
        for (variant, result) in results {
            match result {
                Ok(built) => ctx.submitted.push((variant, built)),
                Err(e) if e.is_item_scoped() => {
                    tracing::warn!(item = %variant.label(), error = %e, "Pipeline aborted");
                    ctx.record(VariantOutcome::failed(&variant, &e));
                }
                Err(e) => {
                    log_task_error(&run_id, task_name, &e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "submit_pipelines"
    }
}
