//! Deterministic filesystem layouts.
//!
//! [`DatasetLayout`] names every path a stage reads or writes inside a
//! dataset directory, so downstream stages find upstream output without the
//! core inspecting any file. [`RunLayout`] is the per-run bookkeeping tree
//! under the runinfo directory.

use crate::template::InputSet;
use crate::workload::TreeMethod;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::path::{Path, PathBuf};

const TREES_FILE: &str = "besttrees.tre";
const BOOTSTRAP_LIST: &str = "BSlistfiles";
const ASTRAL_OUTPUT: &str = "astral.tre";
const MAPPING_FILE: &str = "mapping.dat";

/// Paths inside one dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path component, used to name per-dataset tables.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string())
    }

    pub fn input_dir(&self, set: InputSet) -> PathBuf {
        self.root.join(set.subdirectory())
    }

    /// Output directory of the gene-tree tool.
    pub fn tree_dir(&self, tree: TreeMethod) -> PathBuf {
        match tree {
            TreeMethod::Raxml => self.root.join("raxml"),
            TreeMethod::Iqtree => self.root.join("iqtree"),
            TreeMethod::Mrbayes => self.mrbayes_dir(),
        }
    }

    /// Consolidated best gene trees, one per line.
    pub fn gene_trees(&self, tree: TreeMethod) -> PathBuf {
        self.tree_dir(tree).join(TREES_FILE)
    }

    pub fn bootstrap_dir(&self, tree: TreeMethod) -> PathBuf {
        self.tree_dir(tree).join("bootstrap")
    }

    pub fn astral_dir(&self, tree: TreeMethod) -> PathBuf {
        self.root
            .join("astral")
            .join(tree.as_str().to_ascii_lowercase())
    }

    pub fn bootstrap_list(&self, tree: TreeMethod) -> PathBuf {
        self.astral_dir(tree).join(BOOTSTRAP_LIST)
    }

    pub fn species_tree(&self, tree: TreeMethod) -> PathBuf {
        self.astral_dir(tree).join(ASTRAL_OUTPUT)
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.root.join("astral").join(MAPPING_FILE)
    }

    pub fn mrbayes_dir(&self) -> PathBuf {
        self.root.join("mrbayes")
    }

    pub fn mbsum_dir(&self) -> PathBuf {
        self.root.join("mbsum")
    }

    pub fn bucky_dir(&self) -> PathBuf {
        self.root.join("bucky")
    }

    /// Concordance factor table produced from the summarized samples.
    pub fn concordance_table(&self) -> PathBuf {
        self.bucky_dir().join(format!("{}.csv", self.name()))
    }

    pub fn quartet_dir(&self) -> PathBuf {
        self.root.join("qmc")
    }

    pub fn quartet_tree(&self) -> PathBuf {
        self.quartet_dir().join(format!("{}.tre", self.name()))
    }

    pub fn snaq_dir(&self) -> PathBuf {
        self.root.join("snaq")
    }

    pub fn phylonet_dir(&self) -> PathBuf {
        self.root.join("phylonet")
    }

    /// Network written by SNaQ for one hmax value.
    pub fn snaq_network(&self, tree: TreeMethod, hmax: u32) -> PathBuf {
        self.snaq_dir()
            .join(format!("{}_{}_MPL_{}.out", self.name(), tree, hmax))
    }

    /// Network written by PhyloNet for one hmax value.
    pub fn phylonet_network(&self, tree: TreeMethod, hmax: u32) -> PathBuf {
        self.phylonet_dir()
            .join(format!("{}_{}_MP_{}.nex", self.name(), tree, hmax))
    }

    /// Every output directory the data preparation stage (re)creates.
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.tree_dir(TreeMethod::Raxml),
            self.tree_dir(TreeMethod::Iqtree),
            self.bootstrap_dir(TreeMethod::Raxml),
            self.bootstrap_dir(TreeMethod::Iqtree),
        ];
        dirs.extend(TreeMethod::ALL.iter().map(|tree| self.astral_dir(*tree)));
        dirs.extend([
            self.mrbayes_dir(),
            self.mbsum_dir(),
            self.bucky_dir(),
            self.quartet_dir(),
            self.snaq_dir(),
            self.phylonet_dir(),
        ]);
        dirs
    }
}

/// Bookkeeping directory for one run: `<runinfo>/<run_id>/`.
#[derive(Debug, Clone)]
pub struct RunLayout {
    run_dir: PathBuf,
}

impl RunLayout {
    pub fn new(runinfo: &Path, run_id: &str) -> Self {
        Self {
            run_dir: runinfo.join(run_id),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn log_file(&self) -> PathBuf {
        self.run_dir.join("phyloflow.log")
    }

    pub fn task_logs_dir(&self) -> PathBuf {
        self.run_dir.join("task_logs")
    }

    pub fn report_path(&self) -> PathBuf {
        self.run_dir.join("report.json")
    }

    /// Resolved settings as the run saw them.
    pub fn settings_snapshot(&self) -> PathBuf {
        self.run_dir.join("settings.json")
    }

    /// Create the run directory tree.
    pub fn prepare(&self) -> PhyloflowResult<()> {
        std::fs::create_dir_all(self.task_logs_dir()).map_err(|e| {
            PhyloflowError::Storage(format!(
                "cannot create run directory {}: {}",
                self.run_dir.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dataset_paths() {
        let layout = DatasetLayout::new("/data/d1");
        assert_eq!(layout.name(), "d1");
        assert_eq!(
            layout.gene_trees(TreeMethod::Iqtree),
            PathBuf::from("/data/d1/iqtree/besttrees.tre")
        );
        assert_eq!(
            layout.species_tree(TreeMethod::Raxml),
            PathBuf::from("/data/d1/astral/raxml/astral.tre")
        );
        assert_eq!(layout.concordance_table(), PathBuf::from("/data/d1/bucky/d1.csv"));
        assert_eq!(layout.quartet_tree(), PathBuf::from("/data/d1/qmc/d1.tre"));
        assert_eq!(
            layout.snaq_network(TreeMethod::Mrbayes, 2),
            PathBuf::from("/data/d1/snaq/d1_MRBAYES_MPL_2.out")
        );
        assert_eq!(
            layout.phylonet_network(TreeMethod::Raxml, 1),
            PathBuf::from("/data/d1/phylonet/d1_RAXML_MP_1.nex")
        );
        assert_eq!(
            layout.input_dir(InputSet::Nexus),
            PathBuf::from("/data/d1/input/nexus")
        );
    }

    #[test]
    fn test_output_dirs_are_unique_and_inside_root() {
        let layout = DatasetLayout::new("/data/d1");
        let dirs = layout.output_dirs();
        let mut unique = dirs.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), dirs.len());
        assert!(dirs.iter().all(|d| d.starts_with("/data/d1")));
    }

    #[test]
    fn test_run_layout_prepare() {
        let tmp = TempDir::new().unwrap();
        let layout = RunLayout::new(tmp.path(), "01TESTRUN");
        layout.prepare().unwrap();

        assert!(layout.task_logs_dir().is_dir());
        assert_eq!(layout.report_path(), tmp.path().join("01TESTRUN/report.json"));
        assert_eq!(layout.log_file(), tmp.path().join("01TESTRUN/phyloflow.log"));
    }

    #[test]
    fn test_run_layout_prepare_reports_storage_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("runinfo");
        std::fs::write(&blocker, "").unwrap();

        let layout = RunLayout::new(&blocker, "01TESTRUN");
        match layout.prepare() {
            Err(PhyloflowError::Storage(message)) => assert!(message.contains("01TESTRUN")),
            other => panic!("expected storage error, got {other:?}"),
        }
    }
}
