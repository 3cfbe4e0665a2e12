//! Task executor contract and the local reference executor.
//!
//! The orchestration core never runs tools itself. It describes each
//! invocation as a [`TaskUnit`], submits it with the futures it must wait
//! for, and gets a [`TaskFuture`] back.

mod future;
mod local;
mod unit;

pub use future::{
    FailureKind, TaskFailure, TaskFuture, TaskId, TaskOutput, TaskPromise, TaskResult,
};
pub use local::LocalExecutor;
pub use unit::TaskUnit;

/// Coarse distribution hint derived from the workload size.
///
/// Executors backed by a cluster use `workers_per_node` to size their worker
/// pools; executors without that notion may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadHint {
    pub item_count: usize,
    pub nodes_per_block: u32,
    pub workers_per_node: usize,
}

impl LoadHint {
    pub fn new(item_count: usize, nodes_per_block: u32) -> Self {
        let nodes = nodes_per_block.max(1);
        Self {
            item_count,
            nodes_per_block: nodes,
            workers_per_node: item_count.div_ceil(nodes as usize),
        }
    }
}

/// Futures a task waits for before it may start.
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    /// Producers of the task's inputs. A failure here poisons the task.
    pub data: Vec<TaskFuture>,
    /// Previous occupant of the task's lane. Awaited for ordering only.
    pub lane: Option<TaskFuture>,
}

impl Dependencies {
    pub fn data(data: Vec<TaskFuture>) -> Self {
        Self { data, lane: None }
    }

    pub fn with_lane(mut self, lane: Option<TaskFuture>) -> Self {
        self.lane = lane;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len() + usize::from(self.lane.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every dependency, lane included.
    ///
    /// Returns the first data failure in order; lane failures are ignored.
    pub async fn wait(&self) -> Result<(), TaskFailure> {
        let data = crate::barrier::wait_for_all(&self.data).await;
        if let Some(lane) = &self.lane {
            let _ = lane.result().await;
        }
        data.map(|_| ())
    }
}

/// Backend that runs submitted tasks.
///
/// `submit` must not block: it registers the task and returns immediately.
/// The task starts only after every dependency completes. If a data
/// dependency failed, the task must complete with [`FailureKind::Upstream`]
/// instead of running; a failed lane predecessor does not affect it.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, unit: TaskUnit, dependencies: Dependencies) -> TaskFuture;

    fn apply_load_hint(&self, _hint: &LoadHint) {}
}
