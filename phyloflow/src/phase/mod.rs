//! Table-driven phase execution for a run.
//!
//! A run is a [`PhasePlan`]: an ordered list of [`Phase`]s, each holding
//! tasks that execute either in parallel or one after another against a
//! shared context.
//!
//! ```text
//! PhasePlan → Phase → PhaseTask
//! ```
//!
//! ```ignore
//! let plan = PhasePlan::new(vec![
//!     Phase::parallel("register", vec![Box::new(RegisterWorkloadTask), Box::new(SnapshotSettingsTask)]),
//!     Phase::sequential("merge", vec![Box::new(MergeTask)]),
//! ]);
//! let metrics = PhaseExecutor::execute(plan, ctx).await?;
//! ```

mod metrics;
mod plan;
mod stage;
mod task;

pub use metrics::{PhaseMetrics, PlanMetrics, TaskMetrics};
pub use plan::{PhaseExecutor, PhasePlan};
pub use stage::{ExecutionMode, Phase};
pub use task::{BoxedPhaseTask, PhaseTask};
