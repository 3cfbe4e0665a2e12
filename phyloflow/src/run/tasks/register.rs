//! Task: build the work item registry from the manifest records.

use super::{RunCtx, log_task_error, task_start};
use crate::phase::PhaseTask;
use crate::workload::{WorkItemRegistry, WorkloadDefaults};
use async_trait::async_trait;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};

pub struct RegisterWorkloadTask;

#[async_trait]
impl PhaseTask<RunCtx> for RegisterWorkloadTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let records = std::mem::take(&mut ctx.records);
        let submitted = records.len();

        let mut registry = WorkItemRegistry::new(WorkloadDefaults::from_settings(&ctx.settings));
        registry.register_all(records);

        if registry.is_empty() {
            let err = PhyloflowError::Manifest("workload has no dataset directories".into());
            log_task_error(&run_id, task_name, &err);
            return Err(err);
        }

        tracing::info!(
            records = submitted,
            directories = registry.len(),
            "Registered workload"
        );
        ctx.registry = Some(registry);
        Ok(())
    }

    fn name(&self) -> &str {
        "register_workload"
    }
}
