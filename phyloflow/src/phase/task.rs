//! Unit of work executed inside a phase.

use async_trait::async_trait;
use phyloflow_shared::errors::PhyloflowResult;

/// A task run by the [`PhaseExecutor`](super::PhaseExecutor).
///
/// Tasks consume themselves and receive a clone of the shared context.
#[async_trait]
pub trait PhaseTask<Ctx>: Send + Sync {
    async fn run(self: Box<Self>, ctx: Ctx) -> PhyloflowResult<()>;

    /// Name used in logs and metrics.
    fn name(&self) -> &str;
}

pub type BoxedPhaseTask<Ctx> = Box<dyn PhaseTask<Ctx>>;
