//! Static pipeline templates keyed by (tree method, network method).

use super::stage::{EdgeShape, InputSet, StageKind, StageSpec};
use crate::workload::{NetworkMethod, TreeMethod};
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};

use EdgeShape::{All, Paired};
use StageKind::*;

/// Ordered stage list for one method pair.
///
/// Rows are listed so every stage follows the stages it depends on.
#[derive(Debug)]
pub struct PipelineTemplate {
    pub tree: TreeMethod,
    pub network: NetworkMethod,
    pub stages: &'static [StageSpec],
}

impl PipelineTemplate {
    pub fn stage(&self, kind: StageKind) -> Option<&StageSpec> {
        self.stages.iter().find(|spec| spec.kind == kind)
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.stage(kind).is_some()
    }

    /// Stages no other stage depends on.
    pub fn leaves(&self) -> Vec<StageKind> {
        self.stages
            .iter()
            .filter(|spec| !self.stages.iter().any(|other| other.depends_on(spec.kind)))
            .map(|spec| spec.kind)
            .collect()
    }
}

// ============================================================================
// TEMPLATE ROWS
// ============================================================================

const DATA_PREP: StageSpec = StageSpec::once(DataPrep, &[]);
const ML_TREES: StageSpec =
    StageSpec::per_input(TreeInference, InputSet::Phylip, &[(DataPrep, All)]);
const CONSOLIDATION: StageSpec = StageSpec::once(TreeConsolidation, &[(TreeInference, All)]);
const SPECIES_TREE: StageSpec =
    StageSpec::once(SpeciesTreeEstimation, &[(TreeConsolidation, All)]);
const ML_SNAQ: StageSpec = StageSpec::per_hmax(NetworkInferenceMPL, &[(SpeciesTreeEstimation, All)]);
const ML_PHYLONET: StageSpec = StageSpec::per_hmax(NetworkInferenceMP, &[(TreeConsolidation, All)]);

const ML_MPL: &[StageSpec] = &[DATA_PREP, ML_TREES, CONSOLIDATION, SPECIES_TREE, ML_SNAQ];
const ML_MP: &[StageSpec] = &[DATA_PREP, ML_TREES, CONSOLIDATION, ML_PHYLONET];
const ML_BOTH: &[StageSpec] = &[
    DATA_PREP,
    ML_TREES,
    CONSOLIDATION,
    SPECIES_TREE,
    ML_SNAQ,
    ML_PHYLONET,
];

const MRBAYES_MPL: &[StageSpec] = &[
    DATA_PREP,
    StageSpec::per_input(BayesianSampling, InputSet::Nexus, &[(DataPrep, All)]),
    StageSpec::per_input(TreeSummarization, InputSet::Nexus, &[(BayesianSampling, Paired)]),
    StageSpec::once(ConcordanceBuild, &[(TreeSummarization, All)]),
    StageSpec::once(QuartetPartition, &[(ConcordanceBuild, All)]),
    StageSpec::per_hmax(NetworkInferenceMPL, &[(QuartetPartition, All)]),
];

static BUILTIN: &[PipelineTemplate] = &[
    PipelineTemplate { tree: TreeMethod::Raxml, network: NetworkMethod::Mpl, stages: ML_MPL },
    PipelineTemplate { tree: TreeMethod::Raxml, network: NetworkMethod::Mp, stages: ML_MP },
    PipelineTemplate { tree: TreeMethod::Raxml, network: NetworkMethod::Both, stages: ML_BOTH },
    PipelineTemplate { tree: TreeMethod::Iqtree, network: NetworkMethod::Mpl, stages: ML_MPL },
    PipelineTemplate { tree: TreeMethod::Iqtree, network: NetworkMethod::Mp, stages: ML_MP },
    PipelineTemplate { tree: TreeMethod::Iqtree, network: NetworkMethod::Both, stages: ML_BOTH },
    PipelineTemplate { tree: TreeMethod::Mrbayes, network: NetworkMethod::Mpl, stages: MRBAYES_MPL },
];

/// Lookup table of supported pipelines.
#[derive(Debug, Clone, Copy)]
pub struct TemplateCatalog {
    rows: &'static [PipelineTemplate],
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        Self { rows: BUILTIN }
    }

    pub fn with_rows(rows: &'static [PipelineTemplate]) -> Self {
        Self { rows }
    }

    /// Template for a method pair, or a configuration error if no row exists.
    pub fn resolve(
        &self,
        tree: TreeMethod,
        network: NetworkMethod,
    ) -> PhyloflowResult<&'static PipelineTemplate> {
        self.rows
            .iter()
            .find(|row| row.tree == tree && row.network == network)
            .ok_or_else(|| {
                PhyloflowError::Config(format!(
                    "unsupported method combination {}|{}",
                    tree, network
                ))
            })
    }

    pub fn supports(&self, tree: TreeMethod, network: NetworkMethod) -> bool {
        self.resolve(tree, network).is_ok()
    }

    pub fn rows(&self) -> &'static [PipelineTemplate] {
        self.rows
    }
}
