//! Work item model: one dataset directory plus its analysis methods.

use phyloflow_shared::errors::PhyloflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Gene-tree inference method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TreeMethod {
    /// Maximum likelihood with RAxML.
    Raxml,
    /// Maximum likelihood with IQ-TREE.
    Iqtree,
    /// Bayesian inference with MrBayes.
    Mrbayes,
}

impl TreeMethod {
    pub const ALL: [TreeMethod; 3] = [TreeMethod::Raxml, TreeMethod::Iqtree, TreeMethod::Mrbayes];

    pub fn as_str(&self) -> &'static str {
        match self {
            TreeMethod::Raxml => "RAXML",
            TreeMethod::Iqtree => "IQTREE",
            TreeMethod::Mrbayes => "MRBAYES",
        }
    }
}

impl fmt::Display for TreeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeMethod {
    type Err = PhyloflowError;

    /// Accepts the short names and the older `ML_`/`BI_` prefixed spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RAXML" | "ML_RAXML" => Ok(TreeMethod::Raxml),
            "IQTREE" | "ML_IQTREE" => Ok(TreeMethod::Iqtree),
            "MRBAYES" | "BI_MRBAYES" => Ok(TreeMethod::Mrbayes),
            other => Err(PhyloflowError::InvalidArgument(format!(
                "unknown tree method '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for TreeMethod {
    type Error = PhyloflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TreeMethod> for String {
    fn from(value: TreeMethod) -> Self {
        value.as_str().to_string()
    }
}

/// Phylogenetic network inference method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkMethod {
    /// Maximum pseudo-likelihood (SNaQ).
    Mpl,
    /// Maximum parsimony (PhyloNet).
    Mp,
    /// Both branches, sharing the tree inference prefix.
    Both,
}

impl NetworkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMethod::Mpl => "MPL",
            NetworkMethod::Mp => "MP",
            NetworkMethod::Both => "BOTH",
        }
    }
}

impl fmt::Display for NetworkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMethod {
    type Err = PhyloflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MPL" => Ok(NetworkMethod::Mpl),
            "MP" => Ok(NetworkMethod::Mp),
            "BOTH" => Ok(NetworkMethod::Both),
            other => Err(PhyloflowError::InvalidArgument(format!(
                "unknown network method '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for NetworkMethod {
    type Error = PhyloflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkMethod> for String {
    fn from(value: NetworkMethod) -> Self {
        value.as_str().to_string()
    }
}

/// A requested (tree_method, network_method) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MethodPair {
    pub tree: TreeMethod,
    pub network: NetworkMethod,
}

impl MethodPair {
    pub fn new(tree: TreeMethod, network: NetworkMethod) -> Self {
        Self { tree, network }
    }
}

impl fmt::Display for MethodPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.tree, self.network)
    }
}

/// One dataset directory and the analysis it should receive.
///
/// The directory is the dedup and merge key: the registry holds at most one
/// item per directory, and the merger derives per-method variants from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub directory: PathBuf,
    pub tree_method: TreeMethod,
    pub network_method: NetworkMethod,
    pub outgroup: String,
    pub taxon_mapping: Option<String>,
    pub bootstrap_count: u32,
    pub hmax_values: Vec<u32>,
}

impl WorkItem {
    pub fn methods(&self) -> MethodPair {
        MethodPair::new(self.tree_method, self.network_method)
    }

    /// Copy of this item with the method fields replaced.
    pub fn with_methods(&self, pair: MethodPair) -> Self {
        Self {
            tree_method: pair.tree,
            network_method: pair.network,
            ..self.clone()
        }
    }

    /// `directory [TREE|NETWORK]`, used in logs and reports.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.directory.display(), self.methods())
    }
}
