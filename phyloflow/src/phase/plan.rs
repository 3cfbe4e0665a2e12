//! Phase plan and its executor.

use super::metrics::{PhaseMetrics, PlanMetrics, TaskMetrics};
use super::stage::{ExecutionMode, Phase};
use super::task::BoxedPhaseTask;
use futures::future::join_all;
use phyloflow_shared::errors::PhyloflowResult;
use std::time::Instant;

pub struct PhasePlan<Ctx> {
    phases: Vec<Phase<BoxedPhaseTask<Ctx>>>,
}

impl<Ctx> PhasePlan<Ctx> {
    pub fn new(phases: Vec<Phase<BoxedPhaseTask<Ctx>>>) -> Self {
        Self { phases }
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|phase| phase.name).collect()
    }

    pub fn into_phases(self) -> Vec<Phase<BoxedPhaseTask<Ctx>>> {
        self.phases
    }
}

/// Drives a [`PhasePlan`] to completion.
pub struct PhaseExecutor;

impl PhaseExecutor {
    /// Run every phase in order, stopping after the first phase with a
    /// failing task.
    ///
    /// Tasks of a parallel phase all run to completion before the phase
    /// reports; the first failure in declaration order is returned. `Ctx`
    /// is cloned into each task; use interior mutability for writes.
    pub async fn execute<Ctx>(plan: PhasePlan<Ctx>, ctx: Ctx) -> PhyloflowResult<PlanMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut phases = Vec::new();

        for phase in plan.into_phases() {
            let (name, execution) = (phase.name, phase.execution);
            let phase_start = Instant::now();
            tracing::debug!(phase = name, mode = ?execution, tasks = phase.tasks.len(), "Starting phase");

            let tasks = match execution {
                ExecutionMode::Parallel => {
                    let runs = phase.tasks.into_iter().map(|task| timed(name, task, ctx.clone()));
                    join_all(runs).await.into_iter().collect::<PhyloflowResult<Vec<_>>>()?
                }
                ExecutionMode::Sequential => {
                    let mut tasks = Vec::new();
                    for task in phase.tasks {
                        tasks.push(timed(name, task, ctx.clone()).await?);
                    }
                    tasks
                }
            };

            let duration_ms = phase_start.elapsed().as_millis();
            tracing::debug!(phase = name, duration_ms = duration_ms as u64, "Phase complete");
            phases.push(PhaseMetrics {
                name: name.to_string(),
                execution,
                duration_ms,
                tasks,
            });
        }

        Ok(PlanMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            phases,
        })
    }
}

/// Run one task, logging a failure against its phase.
async fn timed<Ctx>(
    phase: &'static str,
    task: BoxedPhaseTask<Ctx>,
    ctx: Ctx,
) -> PhyloflowResult<TaskMetrics> {
    let name = task.name().to_string();
    let started = Instant::now();
    match task.run(ctx).await {
        Ok(()) => Ok(TaskMetrics {
            name,
            duration_ms: started.elapsed().as_millis(),
        }),
        Err(e) => {
            tracing::error!(phase, task = %name, error = %e, "Phase failed");
            Err(e)
        }
    }
}
