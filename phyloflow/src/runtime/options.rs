//! Run settings loaded from a TOML file.
//!
//! Every section and field has a built-in default, so an empty file is a
//! valid configuration for a single-node run.

use crate::template::{ResourceClass, StageKind};
use crate::workload::{NetworkMethod, TreeMethod};
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Complete settings for one run. Shared as `Arc<Settings>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub partitions: PartitionSettings,
    pub raxml: RaxmlSettings,
    pub iqtree: IqtreeSettings,
    pub astral: AstralSettings,
    pub snaq: SnaqSettings,
    pub phylonet: PhylonetSettings,
    pub mrbayes: MrBayesSettings,
    pub mbsum: MbsumSettings,
    pub helpers: HelperSettings,
    pub plot: PlotSettings,

    /// Directory relative paths resolve against (the settings file's parent).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub workflow_name: String,
    /// Manifest path, relative to the settings file.
    pub workload: PathBuf,
    pub tree_method: TreeMethod,
    pub network_method: NetworkMethod,
    pub script_dir: PathBuf,
    pub bootstrap: u32,
    pub hmax: Vec<u32>,
    /// Nodes per block, used for the load hint.
    pub nodes: u32,
    /// Shell snippet executed before every task.
    pub worker_init: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            workflow_name: "phyloflow".to_string(),
            workload: PathBuf::from("workload.txt"),
            tree_method: TreeMethod::Raxml,
            network_method: NetworkMethod::Mpl,
            script_dir: PathBuf::from("scripts"),
            bootstrap: 100,
            hmax: vec![1, 2, 3],
            nodes: 1,
            worker_init: String::new(),
        }
    }
}

/// Core budget of one executor partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Partition {
    pub cores_per_node: u32,
    pub nodes: u32,
}

impl Default for Partition {
    fn default() -> Self {
        Self {
            cores_per_node: 24,
            nodes: 1,
        }
    }
}

impl Partition {
    pub fn budget(&self) -> u32 {
        self.cores_per_node.saturating_mul(self.nodes)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    pub single_thread: Partition,
    pub tree_and_statistics: Partition,
    pub phylogenetic_network: Partition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaxmlSettings {
    pub executable: String,
    pub model: String,
    pub threads: u32,
}

impl Default for RaxmlSettings {
    fn default() -> Self {
        Self {
            executable: "raxmlHPC-PTHREADS".to_string(),
            model: "GTRGAMMA".to_string(),
            threads: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IqtreeSettings {
    pub executable: String,
    pub model: String,
    /// Upper bound passed as `-ntmax`.
    pub threads: u32,
}

impl Default for IqtreeSettings {
    fn default() -> Self {
        Self {
            executable: "iqtree2".to_string(),
            model: "MFP".to_string(),
            threads: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AstralSettings {
    pub executable: String,
}

impl Default for AstralSettings {
    fn default() -> Self {
        Self {
            executable: "java -jar astral.5.7.4.jar".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnaqSettings {
    /// Julia script, relative to `general.script_dir`.
    pub script: String,
    pub threads: u32,
    pub runs: u32,
}

impl Default for SnaqSettings {
    fn default() -> Self {
        Self {
            script: "snaq.jl".to_string(),
            threads: 2,
            runs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhylonetSettings {
    pub executable: String,
    pub threads: u32,
    /// Input file name written by tree consolidation, prefixed per hmax.
    pub input: String,
}

impl Default for PhylonetSettings {
    fn default() -> Self {
        Self {
            executable: "java -jar PhyloNet.jar".to_string(),
            threads: 2,
            input: "phylonet_input.nex".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MrBayesSettings {
    pub executable: String,
    /// `mcmcp` line, e.g. `ngen=100000 nruns=2 samplefreq=100 burninfrac=.25`.
    pub parameters: String,
    pub threads: u32,
}

impl Default for MrBayesSettings {
    fn default() -> Self {
        Self {
            executable: "mb".to_string(),
            parameters: "ngen=100000 nruns=2 printfreq=1000 samplefreq=100 nchains=3 burninfrac=.25"
                .to_string(),
            threads: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MbsumSettings {
    pub executable: String,
}

impl Default for MbsumSettings {
    fn default() -> Self {
        Self {
            executable: "mbsum".to_string(),
        }
    }
}

/// Helper programs for the filesystem staging stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperSettings {
    pub data_prep: String,
    pub tree_consolidation: String,
    pub concordance: String,
    pub quartet_partition: String,
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self {
            data_prep: "phyloflow-prepare".to_string(),
            tree_consolidation: "phyloflow-consolidate".to_string(),
            concordance: "phyloflow-concordance".to_string(),
            quartet_partition: "phyloflow-quartets".to_string(),
        }
    }
}

/// End-of-run network plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    pub enabled: bool,
    /// Julia script, relative to `general.script_dir`.
    pub script: String,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            script: "plot_networks.jl".to_string(),
        }
    }
}

/// Parsed MrBayes `mcmcp` parameters relevant to summarization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McmcParameters {
    pub ngen: f64,
    pub samplefreq: f64,
    pub nruns: f64,
    pub burninfrac: f64,
}

impl McmcParameters {
    /// Number of leading samples mbsum discards per run.
    pub fn trim(&self) -> u64 {
        (((self.ngen / self.samplefreq) * self.nruns * self.burninfrac) / self.nruns + 1.0) as u64
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> PhyloflowResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PhyloflowError::Config(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&text)?;
        settings.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> PhyloflowResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reject settings that would produce an unusable run.
    pub fn sanitize(&self) -> PhyloflowResult<()> {
        for class in ResourceClass::ALL {
            let partition = self.partition(class);
            if partition.cores_per_node == 0 || partition.nodes == 0 {
                return Err(PhyloflowError::Config(format!(
                    "partition {} needs at least one core and one node",
                    class
                )));
            }
        }
        if self.general.hmax.is_empty() {
            return Err(PhyloflowError::Config(
                "general.hmax must list at least one value".into(),
            ));
        }
        if self.general.nodes == 0 {
            return Err(PhyloflowError::Config("general.nodes must be positive".into()));
        }
        self.mcmc_parameters()?;
        Ok(())
    }

    pub fn partition(&self, class: ResourceClass) -> Partition {
        match class {
            ResourceClass::SingleThread => self.partitions.single_thread,
            ResourceClass::TreeAndStatistics => self.partitions.tree_and_statistics,
            ResourceClass::PhylogeneticNetwork => self.partitions.phylogenetic_network,
        }
    }

    /// Threads one task of `stage` needs under `tree`.
    pub fn threads_for(&self, stage: StageKind, tree: TreeMethod) -> u32 {
        let threads = match stage {
            StageKind::TreeInference => match tree {
                TreeMethod::Iqtree => self.iqtree.threads,
                _ => self.raxml.threads,
            },
            StageKind::BayesianSampling => self.mrbayes.threads,
            StageKind::NetworkInferenceMPL => self.snaq.threads,
            StageKind::NetworkInferenceMP => self.phylonet.threads,
            _ => 1,
        };
        threads.max(1)
    }

    /// Widest thread requirement among the stages mapped to `class`.
    pub fn class_threads(&self, class: ResourceClass) -> u32 {
        StageKind::ALL
            .iter()
            .filter(|stage| stage.resource_class() == class)
            .flat_map(|stage| TreeMethod::ALL.iter().map(|tree| self.threads_for(*stage, *tree)))
            .max()
            .unwrap_or(1)
    }

    pub fn mcmc_parameters(&self) -> PhyloflowResult<McmcParameters> {
        let mut values: HashMap<&str, f64> = HashMap::new();
        for token in self.mrbayes.parameters.split_whitespace() {
            if token.eq_ignore_ascii_case("mcmcp") {
                continue;
            }
            let Some((key, value)) = token.trim_end_matches(';').split_once('=') else {
                return Err(PhyloflowError::Config(format!(
                    "mrbayes.parameters: expected key=value, got '{}'",
                    token
                )));
            };
            let value: f64 = value.parse().map_err(|_| {
                PhyloflowError::Config(format!(
                    "mrbayes.parameters: '{}' is not a number",
                    token
                ))
            })?;
            values.insert(key, value);
        }

        let get = |key: &str| {
            values.get(key).copied().ok_or_else(|| {
                PhyloflowError::Config(format!("mrbayes.parameters: missing {}", key))
            })
        };
        let params = McmcParameters {
            ngen: get("ngen")?,
            samplefreq: get("samplefreq")?,
            nruns: get("nruns")?,
            burninfrac: get("burninfrac")?,
        };
        if params.samplefreq <= 0.0 || params.nruns <= 0.0 {
            return Err(PhyloflowError::Config(
                "mrbayes.parameters: samplefreq and nruns must be positive".into(),
            ));
        }
        Ok(params)
    }

    pub fn mrbayes_trim(&self) -> PhyloflowResult<u64> {
        Ok(self.mcmc_parameters()?.trim())
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    pub fn workload_path(&self) -> PathBuf {
        self.resolve_path(&self.general.workload)
    }

    pub fn script_dir(&self) -> PathBuf {
        self.resolve_path(&self.general.script_dir)
    }

    pub fn plot_script(&self) -> PathBuf {
        self.script_dir().join(&self.plot.script)
    }
}
