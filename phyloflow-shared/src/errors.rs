//! Error taxonomy for phyloflow.
//!
//! Three kinds matter to the orchestration core:
//! - [`PhyloflowError::Config`]: an invalid configuration or method pair,
//!   raised before any task is built.
//! - [`PhyloflowError::Build`]: the graph builder could not construct a task.
//!   Aborts only the affected work item's subgraph.
//! - [`PhyloflowError::TaskFailed`]: an external tool exited abnormally.
//!   Surfaces when the task's future is awaited.
//!
//! The remaining variants cover ingestion and infrastructure failures.

use thiserror::Error;

/// Result alias used across the workspace.
pub type PhyloflowResult<T> = Result<T, PhyloflowError>;

#[derive(Debug, Error)]
pub enum PhyloflowError {
    /// Invalid settings or an unsupported (tree_method, network_method) pair.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed workload manifest.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A task could not be constructed for a work item.
    #[error("cannot build {stage} for {directory}: {reason}")]
    Build {
        directory: String,
        stage: String,
        reason: String,
    },

    /// A submitted task completed with a failure.
    #[error("{stage} task {task} failed for {directory}: {reason}")]
    TaskFailed {
        directory: String,
        stage: String,
        task: String,
        reason: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Filesystem layout or log file failures.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("settings parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PhyloflowError {
    /// True for errors that only invalidate a single work item.
    ///
    /// The orchestrator records these in the run report and keeps going;
    /// everything else aborts the run.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            PhyloflowError::Build { .. } | PhyloflowError::TaskFailed { .. }
        )
    }

    /// Stage name carried by build and task errors.
    pub fn stage(&self) -> Option<&str> {
        match self {
            PhyloflowError::Build { stage, .. } | PhyloflowError::TaskFailed { stage, .. } => {
                Some(stage)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_scoped_errors() {
        let build = PhyloflowError::Build {
            directory: "/data/d1".into(),
            stage: "TreeInference".into(),
            reason: "no input files".into(),
        };
        assert!(build.is_item_scoped());
        assert_eq!(build.stage(), Some("TreeInference"));

        let config = PhyloflowError::Config("MRBAYES+MP".into());
        assert!(!config.is_item_scoped());
        assert_eq!(config.stage(), None);
    }

    #[test]
    fn test_display_names_directory_and_stage() {
        let err = PhyloflowError::TaskFailed {
            directory: "/data/d2".into(),
            stage: "NetworkInferenceMP".into(),
            task: "t-17".into(),
            reason: "exit status 1".into(),
        };
        let text = err.to_string();
        assert!(text.contains("/data/d2"));
        assert!(text.contains("NetworkInferenceMP"));
        assert!(text.contains("exit status 1"));
    }
}
