//! Execution graph construction.
//!
//! [`GraphBuilder`] walks a [`PipelineTemplate`](crate::template::PipelineTemplate)
//! for one work item, creates a [`Task`] per stage instance, wires data and
//! lane dependencies and submits each task to the executor.

mod builder;
mod inputs;
mod task;

pub use builder::{BuiltPipeline, GraphBuilder};
pub use inputs::{FsInputCatalog, InputCatalog};
pub use task::{StageInstance, Task, TaskKey};
