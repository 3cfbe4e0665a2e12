//! Task nodes of the execution graph.

use crate::executor::{TaskFuture, TaskId};
use crate::template::StageKind;
use crate::workload::TreeMethod;
use std::path::PathBuf;

/// Identity of a task within one run.
///
/// `lineage` is the tree method for every stage after data preparation and
/// `None` for data preparation itself, so preparation is shared by all
/// variants of a directory while nothing else crosses tree methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub directory: PathBuf,
    pub stage: StageKind,
    pub lineage: Option<TreeMethod>,
    pub instance: usize,
}

/// What a single stage instance works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageInstance {
    Single,
    /// One discovered input file.
    Input(PathBuf),
    /// One maximum hybridization count.
    Hmax(u32),
}

/// A submitted task. Immutable apart from its future's completion state.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub key: TaskKey,
    pub label: String,
    pub data_dependencies: Vec<TaskId>,
    /// Previous occupant of the lane this task was placed on.
    pub lane_dependency: Option<TaskId>,
    pub future: TaskFuture,
}

impl Task {
    pub fn stage(&self) -> StageKind {
        self.key.stage
    }
}
