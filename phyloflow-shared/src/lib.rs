//! Types shared between the phyloflow library and its binaries.

pub mod errors;

pub use errors::{PhyloflowError, PhyloflowResult};
