//! Run orchestration.
//!
//! ## Architecture
//!
//! A run is table-driven, with the plan chosen by [`RunMode`]:
//!
//! ```text
//! Full:
//!   1. RegisterWorkload ─┬─  (manifest records → registry)
//!      SnapshotSettings ─┘   (settings.json in the run directory)
//!   2. MergeVariants          (per-tree variants, load hint)
//!   3. PrepareDatasets        (DataPrep per directory, wait)
//!   4. SubmitPipelines        (build every variant's graph)
//!   5. FinalBarrier           (wait for everything, record outcomes)
//!   6. PlotNetworks           (one plot job over finished variants, if enabled)
//!
//! PrepareOnly:
//!   1-3 as above
//! ```
//!
//! Failures scoped to one dataset are recorded as outcomes and never stop
//! the plan. Anything else aborts the run.

mod tasks;
mod types;

pub use tasks::RunCtx;
pub use types::{OutcomeStatus, RunContext, RunMode, RunReport, VariantOutcome};

use crate::phase::{BoxedPhaseTask, Phase, PhasePlan};
use tasks::{
    FinalBarrierTask, MergeTask, PlotNetworksTask, PrepareTask, RegisterWorkloadTask,
    SnapshotSettingsTask, SubmitPipelinesTask,
};

/// Get the execution plan for a run mode.
pub fn get_execution_plan(mode: RunMode) -> PhasePlan<RunCtx> {
    let mut phases: Vec<Phase<BoxedPhaseTask<RunCtx>>> = vec![
        Phase::parallel(
            "register",
            vec![Box::new(RegisterWorkloadTask), Box::new(SnapshotSettingsTask)],
        ),
        Phase::sequential("merge", vec![Box::new(MergeTask)]),
        Phase::sequential("prepare", vec![Box::new(PrepareTask)]),
    ];

    match mode {
        RunMode::Full => {
            phases.push(Phase::sequential("submit", vec![Box::new(SubmitPipelinesTask)]));
            phases.push(Phase::sequential("finalize", vec![Box::new(FinalBarrierTask)]));
            phases.push(Phase::sequential("plot", vec![Box::new(PlotNetworksTask)]));
        }
        RunMode::PrepareOnly => {}
    }

    PhasePlan::new(phases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_plan_phases() {
        let plan = get_execution_plan(RunMode::Full);
        assert_eq!(
            plan.phase_names(),
            vec!["register", "merge", "prepare", "submit", "finalize", "plot"]
        );
    }

    #[test]
    fn test_prepare_only_stops_after_prepare() {
        let plan = get_execution_plan(RunMode::PrepareOnly);
        assert_eq!(plan.phase_names(), vec!["register", "merge", "prepare"]);
    }
}
