//! Folding per-directory method requests into pipeline variants.
//!
//! When one directory asks for both network methods under the same tree
//! method, the two requests collapse into a single `BOTH` variant so tree
//! inference and consolidation run once and fan out to both branches.

use super::item::{MethodPair, NetworkMethod, WorkItem};
use super::registry::WorkItemRegistry;
use crate::executor::LoadHint;
use crate::template::TemplateCatalog;
use phyloflow_shared::errors::PhyloflowResult;

/// Output of the merge phase.
#[derive(Debug, Clone)]
pub struct MergePlan {
    /// One entry per (directory, tree method), in manifest order.
    pub variants: Vec<WorkItem>,
    pub load_hint: LoadHint,
}

pub struct PipelineMerger<'a> {
    catalog: &'a TemplateCatalog,
    nodes_per_block: u32,
}

impl<'a> PipelineMerger<'a> {
    pub fn new(catalog: &'a TemplateCatalog, nodes_per_block: u32) -> Self {
        Self {
            catalog,
            nodes_per_block,
        }
    }

    /// Build variants for every registered directory.
    ///
    /// Each variant is resolved against the catalog here, so an unsupported
    /// pair fails the run before any task is built.
    pub fn merge(&self, registry: &WorkItemRegistry) -> PhyloflowResult<MergePlan> {
        let mut variants = Vec::new();

        for (item, requests) in registry.iter() {
            for pair in self.merge_requests(requests) {
                self.catalog.resolve(pair.tree, pair.network)?;
                variants.push(item.with_methods(pair));
            }
        }

        let load_hint = LoadHint::new(registry.len(), self.nodes_per_block);
        tracing::info!(
            directories = registry.len(),
            variants = variants.len(),
            workers_per_node = load_hint.workers_per_node,
            "Merged workload"
        );

        Ok(MergePlan {
            variants,
            load_hint,
        })
    }

    /// Merge the request list of one directory.
    ///
    /// Requests are grouped by tree method in first-appearance order. A group
    /// asking for both network methods becomes `BOTH` when the catalog has a
    /// merged row for that tree method; otherwise its requests stay separate.
    /// Never drops a branch and never merges across tree methods.
    pub fn merge_requests(&self, requests: &[MethodPair]) -> Vec<MethodPair> {
        let mut groups: Vec<(MethodPair, Vec<NetworkMethod>)> = Vec::new();

        for pair in requests {
            match groups.iter_mut().find(|(first, _)| first.tree == pair.tree) {
                Some((_, networks)) => {
                    if !networks.contains(&pair.network) {
                        networks.push(pair.network);
                    }
                }
                None => groups.push((*pair, vec![pair.network])),
            }
        }

        let mut merged = Vec::new();
        for (first, networks) in groups {
            let wants_mpl = networks
                .iter()
                .any(|n| matches!(n, NetworkMethod::Mpl | NetworkMethod::Both));
            let wants_mp = networks
                .iter()
                .any(|n| matches!(n, NetworkMethod::Mp | NetworkMethod::Both));

            if wants_mpl && wants_mp && self.catalog.supports(first.tree, NetworkMethod::Both) {
                if networks.len() > 1 {
                    tracing::debug!(tree = %first.tree, "Merging MPL and MP into BOTH");
                }
                merged.push(MethodPair::new(first.tree, NetworkMethod::Both));
            } else {
                merged.extend(networks.into_iter().map(|n| MethodPair::new(first.tree, n)));
            }
        }
        merged
    }
}
