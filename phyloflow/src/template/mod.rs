//! Pipeline templates: which stages run for a method pair, and how they connect.

mod catalog;
mod stage;

pub use catalog::{PipelineTemplate, TemplateCatalog};
pub use stage::{EdgeShape, InputSet, Multiplicity, ResourceClass, StageKind, StageSpec};
