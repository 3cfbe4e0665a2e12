//! Phase definition.

use serde::Serialize;

/// How the tasks of a phase are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// All tasks are polled together and all run to completion.
    Parallel,
    /// Tasks run in declaration order.
    Sequential,
}

/// A named group of tasks plus its execution mode.
#[derive(Debug, Clone)]
pub struct Phase<T> {
    pub name: &'static str,
    pub tasks: Vec<T>,
    pub execution: ExecutionMode,
}

impl<T> Phase<T> {
    pub fn parallel(name: &'static str, tasks: Vec<T>) -> Self {
        Self {
            name,
            tasks,
            execution: ExecutionMode::Parallel,
        }
    }

    pub fn sequential(name: &'static str, tasks: Vec<T>) -> Self {
        Self {
            name,
            tasks,
            execution: ExecutionMode::Sequential,
        }
    }
}
