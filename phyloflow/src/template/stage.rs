//! Stage kinds and the resource classes they run in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Executor partition a stage is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    SingleThread,
    TreeAndStatistics,
    PhylogeneticNetwork,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 3] = [
        ResourceClass::SingleThread,
        ResourceClass::TreeAndStatistics,
        ResourceClass::PhylogeneticNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::SingleThread => "single_thread",
            ResourceClass::TreeAndStatistics => "tree_and_statistics",
            ResourceClass::PhylogeneticNetwork => "phylogenetic_network",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One kind of tool invocation in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageKind {
    DataPrep,
    TreeInference,
    TreeConsolidation,
    SpeciesTreeEstimation,
    BayesianSampling,
    TreeSummarization,
    ConcordanceBuild,
    QuartetPartition,
    NetworkInferenceMPL,
    NetworkInferenceMP,
    /// Run-wide plot over every network file; never part of a template.
    NetworkPlot,
}

impl StageKind {
    pub const ALL: [StageKind; 11] = [
        StageKind::DataPrep,
        StageKind::TreeInference,
        StageKind::TreeConsolidation,
        StageKind::SpeciesTreeEstimation,
        StageKind::BayesianSampling,
        StageKind::TreeSummarization,
        StageKind::ConcordanceBuild,
        StageKind::QuartetPartition,
        StageKind::NetworkInferenceMPL,
        StageKind::NetworkInferenceMP,
        StageKind::NetworkPlot,
    ];

    pub fn resource_class(&self) -> ResourceClass {
        match self {
            StageKind::TreeInference => ResourceClass::TreeAndStatistics,
            StageKind::NetworkInferenceMPL | StageKind::NetworkInferenceMP => {
                ResourceClass::PhylogeneticNetwork
            }
            StageKind::DataPrep
            | StageKind::TreeConsolidation
            | StageKind::SpeciesTreeEstimation
            | StageKind::BayesianSampling
            | StageKind::TreeSummarization
            | StageKind::ConcordanceBuild
            | StageKind::QuartetPartition
            | StageKind::NetworkPlot => ResourceClass::SingleThread,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::DataPrep => "DataPrep",
            StageKind::TreeInference => "TreeInference",
            StageKind::TreeConsolidation => "TreeConsolidation",
            StageKind::SpeciesTreeEstimation => "SpeciesTreeEstimation",
            StageKind::BayesianSampling => "BayesianSampling",
            StageKind::TreeSummarization => "TreeSummarization",
            StageKind::ConcordanceBuild => "ConcordanceBuild",
            StageKind::QuartetPartition => "QuartetPartition",
            StageKind::NetworkInferenceMPL => "NetworkInferenceMPL",
            StageKind::NetworkInferenceMP => "NetworkInferenceMP",
            StageKind::NetworkPlot => "NetworkPlot",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input file family enumerated for per-input stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSet {
    /// `input/phylip/*.phy`
    Phylip,
    /// `input/nexus/*.nex`
    Nexus,
}

impl InputSet {
    pub fn subdirectory(&self) -> &'static str {
        match self {
            InputSet::Phylip => "input/phylip",
            InputSet::Nexus => "input/nexus",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            InputSet::Phylip => "phy",
            InputSet::Nexus => "nex",
        }
    }
}

/// How many task instances a stage expands into for one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Once,
    /// One instance per discovered input file.
    PerInput(InputSet),
    /// One instance per hmax value of the work item.
    PerHmax,
}

/// Dependency shape between a stage and one upstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeShape {
    /// Every instance depends on every upstream instance.
    All,
    /// Instance i depends on upstream instance i.
    Paired,
}

/// One row of a pipeline template.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    pub kind: StageKind,
    pub multiplicity: Multiplicity,
    pub after: &'static [(StageKind, EdgeShape)],
    /// Await every upstream future before expanding the stage.
    pub barrier: bool,
}

impl StageSpec {
    pub const fn once(kind: StageKind, after: &'static [(StageKind, EdgeShape)]) -> Self {
        Self {
            kind,
            multiplicity: Multiplicity::Once,
            after,
            barrier: false,
        }
    }

    pub const fn per_input(
        kind: StageKind,
        inputs: InputSet,
        after: &'static [(StageKind, EdgeShape)],
    ) -> Self {
        Self {
            kind,
            multiplicity: Multiplicity::PerInput(inputs),
            after,
            barrier: true,
        }
    }

    pub const fn per_hmax(kind: StageKind, after: &'static [(StageKind, EdgeShape)]) -> Self {
        Self {
            kind,
            multiplicity: Multiplicity::PerHmax,
            after,
            barrier: false,
        }
    }

    pub fn depends_on(&self, upstream: StageKind) -> bool {
        self.after.iter().any(|(stage, _)| *stage == upstream)
    }
}
