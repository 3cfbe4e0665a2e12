//! Workload ingestion: manifest records, the per-directory registry and the
//! merger that turns requests into pipeline variants.

mod item;
pub mod manifest;
mod merge;
mod registry;

pub use item::{MethodPair, NetworkMethod, TreeMethod, WorkItem};
pub use manifest::{ManifestRecord, load_manifest, parse_manifest};
pub use merge::{MergePlan, PipelineMerger};
pub use registry::{WorkItemRegistry, WorkloadDefaults};
