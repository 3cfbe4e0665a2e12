//! Description of one tool invocation handed to an executor.

use super::future::TaskId;
use crate::template::{ResourceClass, StageKind};
use std::path::PathBuf;

/// Everything an executor needs to run a task.
///
/// The command is an opaque shell line; the orchestration core only looks
/// at whether it completed.
#[derive(Debug, Clone)]
pub struct TaskUnit {
    pub id: TaskId,
    pub stage: StageKind,
    pub directory: PathBuf,
    pub partition: ResourceClass,
    pub threads: u32,
    pub command: String,
    /// Human-readable label, e.g. `TreeInference[3] /data/d1 (RAXML)`.
    pub label: String,
}
