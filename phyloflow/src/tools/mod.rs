//! Command lines for the external tools behind each stage.
//!
//! Every command is a single shell line. Inputs and outputs are the
//! deterministic paths of [`DatasetLayout`], so a stage finds what its
//! predecessors wrote without the core passing data around.

use crate::graph::StageInstance;
use crate::runtime::layout::DatasetLayout;
use crate::runtime::options::Settings;
use crate::template::StageKind;
use crate::workload::{TreeMethod, WorkItem};
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Builds stage command lines from run settings.
pub struct CommandBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Command for one instance of `stage` on `item`.
    pub fn command(
        &self,
        item: &WorkItem,
        stage: StageKind,
        instance: &StageInstance,
    ) -> PhyloflowResult<String> {
        let layout = DatasetLayout::new(&item.directory);
        let mismatch = || PhyloflowError::Build {
            directory: item.directory.display().to_string(),
            stage: stage.to_string(),
            reason: format!("unexpected instance {:?}", instance),
        };

        match (stage, instance) {
            (StageKind::DataPrep, StageInstance::Single) => Ok(self.data_prep(item, &layout)),
            (StageKind::TreeInference, StageInstance::Input(input)) => match item.tree_method {
                TreeMethod::Raxml => Ok(self.raxml(item, &layout, input)),
                TreeMethod::Iqtree => Ok(self.iqtree(item, &layout, input)),
                TreeMethod::Mrbayes => Err(mismatch()),
            },
            (StageKind::TreeConsolidation, StageInstance::Single) => Ok(format!(
                "{} {} {}",
                self.settings.helpers.tree_consolidation,
                quote(layout.root()),
                item.tree_method
            )),
            (StageKind::SpeciesTreeEstimation, StageInstance::Single) => {
                Ok(self.astral(item, &layout))
            }
            (StageKind::BayesianSampling, StageInstance::Input(input)) => {
                Ok(self.mrbayes(&layout, input))
            }
            (StageKind::TreeSummarization, StageInstance::Input(input)) => {
                self.mbsum(item, &layout, input)
            }
            (StageKind::ConcordanceBuild, StageInstance::Single) => Ok(format!(
                "{} {}",
                self.settings.helpers.concordance,
                quote(layout.root())
            )),
            (StageKind::QuartetPartition, StageInstance::Single) => Ok(format!(
                "{} {}",
                self.settings.helpers.quartet_partition,
                quote(layout.root())
            )),
            (StageKind::NetworkInferenceMPL, StageInstance::Hmax(hmax)) => {
                Ok(self.snaq(item, &layout, *hmax))
            }
            (StageKind::NetworkInferenceMP, StageInstance::Hmax(hmax)) => Ok(format!(
                "cd {}; {} {}_{}_{}",
                quote(&layout.phylonet_dir()),
                self.settings.phylonet.executable,
                item.tree_method,
                hmax,
                self.settings.phylonet.input
            )),
            _ => Err(mismatch()),
        }
    }

    fn data_prep(&self, item: &WorkItem, layout: &DatasetLayout) -> String {
        // Outputs of an earlier run are removed first; RAxML refuses to
        // overwrite an existing run name.
        let dirs = layout
            .output_dirs()
            .iter()
            .map(|d| quote(d))
            .collect::<Vec<_>>()
            .join(" ");
        let mut line = format!(
            "rm -rf {dirs}; mkdir -p {dirs}; {} {}",
            self.settings.helpers.data_prep,
            quote(layout.root())
        );
        if let Some(mapping) = &item.taxon_mapping {
            line.push_str(&format!(" --mapping {}", quote_str(mapping)));
        }
        line
    }

    fn raxml(&self, item: &WorkItem, layout: &DatasetLayout, input: &Path) -> String {
        let raxml = &self.settings.raxml;
        let mut rng = rand::rng();
        let p: u32 = rng.random_range(1..=10000);
        let x: u32 = rng.random_range(1..=10000);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        format!(
            "cd {}; {} -T {} -p {} -x {} -f a -m {} -N {}{} -s {} -n {}",
            quote(&layout.tree_dir(TreeMethod::Raxml)),
            raxml.executable,
            raxml.threads.max(1),
            p,
            x,
            raxml.model,
            item.bootstrap_count,
            outgroup_flag(item),
            quote(input),
            stem
        )
    }

    fn iqtree(&self, item: &WorkItem, layout: &DatasetLayout, input: &Path) -> String {
        let iqtree = &self.settings.iqtree;
        format!(
            "cd {}; {} -nt AUTO -ntmax {} -b {} -m {} -s {}{} --keep-ident -redo",
            quote(&layout.tree_dir(TreeMethod::Iqtree)),
            iqtree.executable,
            iqtree.threads.max(1),
            item.bootstrap_count,
            iqtree.model,
            quote(input),
            outgroup_flag(item)
        )
    }

    fn astral(&self, item: &WorkItem, layout: &DatasetLayout) -> String {
        let tree = item.tree_method;
        let mut line = format!(
            "{} -i {} -b {} -r {}",
            self.settings.astral.executable,
            quote(&layout.gene_trees(tree)),
            quote(&layout.bootstrap_list(tree)),
            item.bootstrap_count
        );
        if item.taxon_mapping.is_some() {
            line.push_str(&format!(" -a {}", quote(&layout.mapping_file())));
        }
        line.push_str(&format!(" -o {}", quote(&layout.species_tree(tree))));
        line
    }

    fn mrbayes(&self, layout: &DatasetLayout, input: &Path) -> String {
        let gene = file_name(input);
        let parameters = self.settings.mrbayes.parameters.trim();
        let mcmcp = if parameters.starts_with("mcmcp") {
            parameters.to_string()
        } else {
            format!("mcmcp {}", parameters)
        };
        let mcmcp = format!("{};", mcmcp.trim_end_matches(';'));
        let block = [
            "begin mrbayes;",
            "set nowarnings=yes;",
            "set autoclose=yes;",
            "lset nst=2;",
            mcmcp.as_str(),
            "mcmc;",
            "sumt;",
            "end;",
        ]
        .iter()
        .map(|l| format!("'{}'", l))
        .collect::<Vec<_>>()
        .join(" ");

        format!(
            "cd {dir}; cp {input} {gene}; printf '%s\\n' {block} >> {gene}; {mb} {gene}",
            dir = quote(&layout.mrbayes_dir()),
            input = quote(input),
            gene = gene,
            block = block,
            mb = self.settings.mrbayes.executable,
        )
    }

    fn mbsum(
        &self,
        item: &WorkItem,
        layout: &DatasetLayout,
        input: &Path,
    ) -> PhyloflowResult<String> {
        let trim = self.settings.mrbayes_trim().map_err(|e| PhyloflowError::Build {
            directory: item.directory.display().to_string(),
            stage: StageKind::TreeSummarization.to_string(),
            reason: e.to_string(),
        })?;
        let gene = file_name(input);
        Ok(format!(
            "{} {}/{}*.t -n {} -o {}",
            self.settings.mbsum.executable,
            quote(&layout.mrbayes_dir()),
            gene,
            trim,
            quote(&layout.mbsum_dir().join(format!("{}.sum", gene)))
        ))
    }

    fn snaq(&self, item: &WorkItem, layout: &DatasetLayout, hmax: u32) -> String {
        let tree = item.tree_method;
        let (gene_input, start_tree) = match tree {
            TreeMethod::Mrbayes => (layout.concordance_table(), layout.quartet_tree()),
            _ => (layout.gene_trees(tree), layout.species_tree(tree)),
        };
        let snaq = &self.settings.snaq;
        format!(
            "julia {} {} {} {} {} {} {} {}",
            quote(&self.settings.script_dir().join(&snaq.script)),
            tree,
            quote(&gene_input),
            quote(&start_tree),
            quote(&layout.snaq_dir()),
            snaq.threads.max(1),
            hmax,
            snaq.runs
        )
    }
}

impl CommandBuilder<'_> {
    /// Single plotting job over every network file of the run.
    pub fn plot(&self, networks: &[PathBuf]) -> String {
        let list = networks
            .iter()
            .map(|n| n.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "julia {} {}",
            quote(&self.settings.plot_script()),
            quote_str(&list)
        )
    }
}

fn outgroup_flag(item: &WorkItem) -> String {
    if item.outgroup.is_empty() {
        String::new()
    } else {
        format!(" -o {}", quote_str(&item.outgroup))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Single-quote a path when it contains characters the shell would split on.
fn quote(path: &Path) -> String {
    quote_str(&path.to_string_lossy())
}

fn quote_str(text: &str) -> String {
    let safe = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@%,".contains(c));
    if safe {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::NetworkMethod;
    use std::path::PathBuf;

    fn item(tree: TreeMethod, network: NetworkMethod) -> WorkItem {
        WorkItem {
            directory: PathBuf::from("/data/d1"),
            tree_method: tree,
            network_method: network,
            outgroup: "Z".into(),
            taxon_mapping: None,
            bootstrap_count: 100,
            hmax_values: vec![1, 2],
        }
    }

    #[test]
    fn test_raxml_command() {
        let settings = Settings::default();
        let builder = CommandBuilder::new(&settings);
        let line = builder
            .command(
                &item(TreeMethod::Raxml, NetworkMethod::Mpl),
                StageKind::TreeInference,
                &StageInstance::Input(PathBuf::from("/data/d1/input/phylip/gene1.phy")),
            )
            .unwrap();

        assert!(line.starts_with("cd /data/d1/raxml; raxmlHPC-PTHREADS -T 6 -p "));
        assert!(line.contains("-f a -m GTRGAMMA -N 100 -o Z"));
        assert!(line.ends_with("-s /data/d1/input/phylip/gene1.phy -n gene1"));
    }

    #[test]
    fn test_iqtree_without_outgroup() {
        let settings = Settings::default();
        let mut work = item(TreeMethod::Iqtree, NetworkMethod::Mp);
        work.outgroup.clear();
        let line = CommandBuilder::new(&settings)
            .command(
                &work,
                StageKind::TreeInference,
                &StageInstance::Input(PathBuf::from("/data/d1/input/phylip/g.phy")),
            )
            .unwrap();
        assert_eq!(
            line,
            "cd /data/d1/iqtree; iqtree2 -nt AUTO -ntmax 6 -b 100 -m MFP -s /data/d1/input/phylip/g.phy --keep-ident -redo"
        );
    }

    #[test]
    fn test_mbsum_uses_trim_count() {
        let mut settings = Settings::default();
        settings.mrbayes.parameters =
            "ngen=1000000 nruns=2 samplefreq=1000 burninfrac=0.25".into();
        let line = CommandBuilder::new(&settings)
            .command(
                &item(TreeMethod::Mrbayes, NetworkMethod::Mpl),
                StageKind::TreeSummarization,
                &StageInstance::Input(PathBuf::from("/data/d1/input/nexus/g1.nex")),
            )
            .unwrap();
        assert_eq!(
            line,
            "mbsum /data/d1/mrbayes/g1.nex*.t -n 251 -o /data/d1/mbsum/g1.nex.sum"
        );
    }

    #[test]
    fn test_snaq_inputs_follow_tree_method() {
        let settings = Settings::default();
        let builder = CommandBuilder::new(&settings);

        let ml = builder
            .command(
                &item(TreeMethod::Raxml, NetworkMethod::Mpl),
                StageKind::NetworkInferenceMPL,
                &StageInstance::Hmax(2),
            )
            .unwrap();
        assert!(ml.contains("RAXML /data/d1/raxml/besttrees.tre /data/d1/astral/raxml/astral.tre"));
        assert!(ml.ends_with(" 2 2 10"));

        let bayes = builder
            .command(
                &item(TreeMethod::Mrbayes, NetworkMethod::Mpl),
                StageKind::NetworkInferenceMPL,
                &StageInstance::Hmax(1),
            )
            .unwrap();
        assert!(bayes.contains("MRBAYES /data/d1/bucky/d1.csv /data/d1/qmc/d1.tre"));
    }

    #[test]
    fn test_astral_mapping_flag() {
        let settings = Settings::default();
        let mut work = item(TreeMethod::Iqtree, NetworkMethod::Mpl);
        work.taxon_mapping = Some("A:a1,a2".into());
        let line = CommandBuilder::new(&settings)
            .command(&work, StageKind::SpeciesTreeEstimation, &StageInstance::Single)
            .unwrap();
        assert!(line.contains("-a /data/d1/astral/mapping.dat"));
        assert!(line.ends_with("-o /data/d1/astral/iqtree/astral.tre"));
    }

    #[test]
    fn test_instance_mismatch_is_build_error() {
        let settings = Settings::default();
        let err = CommandBuilder::new(&settings)
            .command(
                &item(TreeMethod::Raxml, NetworkMethod::Mp),
                StageKind::NetworkInferenceMP,
                &StageInstance::Single,
            )
            .unwrap_err();
        assert!(matches!(err, PhyloflowError::Build { .. }));
    }

    #[test]
    fn test_outgroup_is_a_single_shell_word() {
        let settings = Settings::default();
        let mut work = item(TreeMethod::Raxml, NetworkMethod::Mpl);
        work.outgroup = "Homo sapiens; touch /tmp/x".into();
        let line = CommandBuilder::new(&settings)
            .command(
                &work,
                StageKind::TreeInference,
                &StageInstance::Input(PathBuf::from("/data/d1/input/phylip/g1.phy")),
            )
            .unwrap();
        assert!(line.contains(" -o 'Homo sapiens; touch /tmp/x' -s "));
        assert!(line.ends_with("-n g1"));
    }

    #[test]
    fn test_data_prep_clears_previous_outputs() {
        let settings = Settings::default();
        let mut work = item(TreeMethod::Raxml, NetworkMethod::Mpl);
        work.taxon_mapping = Some("A:a1,a2".into());
        let line = CommandBuilder::new(&settings)
            .command(&work, StageKind::DataPrep, &StageInstance::Single)
            .unwrap();

        let (remove, rest) = line.split_once("; ").unwrap();
        let (create, prepare) = rest.split_once("; ").unwrap();
        assert!(remove.starts_with("rm -rf /data/d1/raxml /data/d1/iqtree "));
        assert!(remove.ends_with("/data/d1/phylonet"));
        assert_eq!(create.trim_start_matches("mkdir -p "), remove.trim_start_matches("rm -rf "));
        assert_eq!(prepare, "phyloflow-prepare /data/d1 --mapping A:a1,a2");
    }

    #[test]
    fn test_plot_lists_networks_as_one_argument() {
        let settings = Settings::default();
        let line = CommandBuilder::new(&settings).plot(&[
            PathBuf::from("/data/d1/snaq/d1_RAXML_MPL_1.out"),
            PathBuf::from("/data/my set/phylonet/s_IQTREE_MP_1.nex"),
        ]);
        assert_eq!(
            line,
            "julia scripts/plot_networks.jl '/data/d1/snaq/d1_RAXML_MPL_1.out,/data/my set/phylonet/s_IQTREE_MP_1.nex'"
        );
    }

    #[test]
    fn test_quote_paths_with_spaces() {
        assert_eq!(quote(Path::new("/data/my set")), "'/data/my set'");
        assert_eq!(quote(Path::new("/data/d1")), "/data/d1");
    }
}
