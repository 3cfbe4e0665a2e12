//! phyloflow: orchestration core for phylogenetic network pipelines.
//!
//! The crate turns a workload manifest (dataset directories plus the tree and
//! network inference methods requested for each) into a dependency graph of
//! opaque tool invocations, and hands that graph to a task executor.
//!
//! ## Architecture
//!
//! ```text
//! manifest ─→ WorkItemRegistry ─→ PipelineMerger ─→ TemplateCatalog
//!                                                        │
//!                    LanePoolAllocator ←── GraphBuilder ←┘
//!                                              │
//!                                        TaskExecutor ─→ Barrier
//! ```
//!
//! - [`workload`]: manifest parsing, per-directory registry, variant merging
//! - [`template`]: stage kinds and the static (tree, network) template table
//! - [`lane`]: lane pools bounding concurrency with false data dependencies
//! - [`graph`]: expands templates into memoized, lane-wired tasks
//! - [`executor`]: the executor contract, task futures, a local executor
//! - [`barrier`]: waits on task sets and surfaces failures
//! - [`run`]: the table-driven run phases driven by [`Orchestrator`]

pub mod barrier;
pub mod executor;
pub mod graph;
pub mod lane;
pub mod logging;
pub mod phase;
pub mod run;
pub mod runtime;
pub mod template;
pub mod tools;
pub mod workload;

pub use executor::{LocalExecutor, TaskExecutor, TaskFuture};
pub use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
pub use run::{RunMode, RunReport};
pub use runtime::layout::{DatasetLayout, RunLayout};
pub use runtime::options::Settings;
pub use runtime::Orchestrator;
pub use template::{PipelineTemplate, ResourceClass, StageKind, TemplateCatalog};
pub use workload::{NetworkMethod, TreeMethod, WorkItem};
