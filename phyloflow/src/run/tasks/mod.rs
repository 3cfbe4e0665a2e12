//! Phase tasks of a run.

mod finalize;
mod merge;
mod plot;
mod prepare;
mod register;
mod snapshot;
mod submit;

pub use finalize::FinalBarrierTask;
pub use merge::MergeTask;
pub use plot::PlotNetworksTask;
pub use prepare::PrepareTask;
pub use register::RegisterWorkloadTask;
pub use snapshot::SnapshotSettingsTask;
pub use submit::SubmitPipelinesTask;

use super::types::RunContext;
use phyloflow_shared::errors::PhyloflowError;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type RunCtx = Arc<Mutex<RunContext>>;

/// Log the start of a task and return the run id for later log lines.
pub(crate) async fn task_start(ctx: &RunCtx, task_name: &str) -> String {
    let run_id = ctx.lock().await.run_id.clone();
    tracing::debug!(run_id = %run_id, task = task_name, "Task started");
    run_id
}

pub(crate) fn log_task_error(run_id: &str, task_name: &str, err: &PhyloflowError) {
    tracing::error!(run_id = %run_id, task = task_name, error = %err, "Task failed");
}
