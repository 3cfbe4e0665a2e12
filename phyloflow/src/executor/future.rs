//! Completion handles for submitted tasks.
//!
//! A [`TaskFuture`] is a cheap, cloneable view of one task's outcome, backed
//! by a `watch` channel. The executor keeps the matching [`TaskPromise`] and
//! publishes exactly one result through it.

use super::unit::TaskUnit;
use crate::template::StageKind;
use phyloflow_shared::errors::PhyloflowError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Run-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Successful completion of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub task: TaskId,
    pub exit_code: i32,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("exited with status {0}")]
    Exited(i32),

    #[error("terminated by signal")]
    Signaled,

    #[error("failed to start: {0}")]
    Spawn(String),

    /// A dependency failed, so the task never ran.
    #[error("upstream {stage} task {task} failed")]
    Upstream { task: TaskId, stage: StageKind },

    #[error("abandoned before completion")]
    Abandoned,
}

/// Failed completion of a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} task {task} for {}: {kind}", .directory.display())]
pub struct TaskFailure {
    pub task: TaskId,
    pub stage: StageKind,
    pub directory: PathBuf,
    pub kind: FailureKind,
}

impl TaskFailure {
    /// The task and stage where the failure originated.
    pub fn origin(&self) -> (TaskId, StageKind) {
        match self.kind {
            FailureKind::Upstream { task, stage } => (task, stage),
            _ => (self.task, self.stage),
        }
    }

    /// Failure kind recorded on a dependent that never ran because of `self`.
    pub fn poison(&self) -> FailureKind {
        let (task, stage) = self.origin();
        FailureKind::Upstream { task, stage }
    }
}

impl From<TaskFailure> for PhyloflowError {
    fn from(failure: TaskFailure) -> Self {
        let (origin_task, origin_stage) = failure.origin();
        PhyloflowError::TaskFailed {
            directory: failure.directory.display().to_string(),
            stage: origin_stage.to_string(),
            task: origin_task.to_string(),
            reason: failure.kind.to_string(),
        }
    }
}

pub type TaskResult = Result<TaskOutput, TaskFailure>;

#[derive(Debug)]
struct TaskMeta {
    id: TaskId,
    stage: StageKind,
    directory: PathBuf,
}

impl TaskMeta {
    fn failure(&self, kind: FailureKind) -> TaskFailure {
        TaskFailure {
            task: self.id,
            stage: self.stage,
            directory: self.directory.clone(),
            kind,
        }
    }
}

/// Handle to the eventual result of a submitted task.
#[derive(Debug, Clone)]
pub struct TaskFuture {
    meta: Arc<TaskMeta>,
    rx: watch::Receiver<Option<TaskResult>>,
}

impl TaskFuture {
    /// Create an unresolved future and the promise that completes it.
    pub fn pending(unit: &TaskUnit) -> (TaskPromise, TaskFuture) {
        Self::pending_for(unit.id, unit.stage, &unit.directory)
    }

    pub fn pending_for(id: TaskId, stage: StageKind, directory: &Path) -> (TaskPromise, TaskFuture) {
        let meta = Arc::new(TaskMeta {
            id,
            stage,
            directory: directory.to_path_buf(),
        });
        let (tx, rx) = watch::channel(None);
        (
            TaskPromise {
                meta: Arc::clone(&meta),
                tx,
            },
            TaskFuture { meta, rx },
        )
    }

    pub fn id(&self) -> TaskId {
        self.meta.id
    }

    pub fn stage(&self) -> StageKind {
        self.meta.stage
    }

    pub fn directory(&self) -> &Path {
        &self.meta.directory
    }

    /// True once a result has been published or the promise was dropped.
    pub fn done(&self) -> bool {
        self.rx.borrow().is_some() || self.rx.has_changed().is_err()
    }

    /// Non-blocking peek at the result.
    pub fn try_result(&self) -> Option<TaskResult> {
        self.rx.borrow().clone()
    }

    /// Wait for the task to complete and return its result.
    pub async fn result(&self) -> TaskResult {
        let mut rx = self.rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(value) => value
                .clone()
                .unwrap_or_else(|| Err(self.meta.failure(FailureKind::Abandoned))),
            Err(_) => Err(self.meta.failure(FailureKind::Abandoned)),
        }
    }
}

/// Write side of a [`TaskFuture`]. Dropping it unresolved abandons the task.
#[derive(Debug)]
pub struct TaskPromise {
    meta: Arc<TaskMeta>,
    tx: watch::Sender<Option<TaskResult>>,
}

impl TaskPromise {
    pub fn id(&self) -> TaskId {
        self.meta.id
    }

    pub fn succeed(self, exit_code: i32, duration_ms: u128) {
        let output = TaskOutput {
            task: self.meta.id,
            exit_code,
            duration_ms,
        };
        self.tx.send_replace(Some(Ok(output)));
    }

    pub fn fail(self, kind: FailureKind) {
        let failure = self.meta.failure(kind);
        self.tx.send_replace(Some(Err(failure)));
    }
}
