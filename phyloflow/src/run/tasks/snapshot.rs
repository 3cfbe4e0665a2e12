//! Task: save the resolved settings next to the run's logs.

use super::{RunCtx, log_task_error, task_start};
use crate::phase::PhaseTask;
use async_trait::async_trait;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};

pub struct SnapshotSettingsTask;

#[async_trait]
impl PhaseTask<RunCtx> for SnapshotSettingsTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> PhyloflowResult<()> {
        let task_name = self.name();
        let run_id = task_start(&ctx, task_name).await;

        let (settings, layout) = {
            let ctx = ctx.lock().await;
            (ctx.settings.clone(), ctx.layout.clone())
        };
        let Some(layout) = layout else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(settings.as_ref())
            .map_err(|e| PhyloflowError::Internal(format!("cannot serialize settings: {}", e)))
            .inspect_err(|e| log_task_error(&run_id, task_name, e))?;
        tokio::fs::write(layout.settings_snapshot(), json)
            .await
            .map_err(|e| {
                PhyloflowError::Storage(format!(
                    "cannot write {}: {}",
                    layout.settings_snapshot().display(),
                    e
                ))
            })
            .inspect_err(|e| log_task_error(&run_id, task_name, e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "snapshot_settings"
    }
}
