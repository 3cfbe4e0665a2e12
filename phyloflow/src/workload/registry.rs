//! Per-directory registry of work items and their requested method pairs.

use super::item::{MethodPair, NetworkMethod, TreeMethod, WorkItem};
use super::manifest::ManifestRecord;
use crate::runtime::options::Settings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Run-level values applied to manifest fields left empty.
#[derive(Debug, Clone)]
pub struct WorkloadDefaults {
    pub tree_method: TreeMethod,
    pub network_method: NetworkMethod,
    pub bootstrap_count: u32,
    pub hmax_values: Vec<u32>,
}

impl WorkloadDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tree_method: settings.general.tree_method,
            network_method: settings.general.network_method,
            bootstrap_count: settings.general.bootstrap,
            hmax_values: settings.general.hmax.clone(),
        }
    }
}

impl Default for WorkloadDefaults {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Holds at most one [`WorkItem`] per directory, in manifest order.
///
/// Every record still contributes its method pair to the directory's
/// request list, so a directory listed twice under different methods asks
/// for both analyses.
#[derive(Debug, Default)]
pub struct WorkItemRegistry {
    defaults: WorkloadDefaults,
    items: Vec<WorkItem>,
    requests: Vec<Vec<MethodPair>>,
    index: HashMap<PathBuf, usize>,
}

impl WorkItemRegistry {
    pub fn new(defaults: WorkloadDefaults) -> Self {
        Self {
            defaults,
            items: Vec::new(),
            requests: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a manifest record. Returns true when the directory is new.
    pub fn register(&mut self, record: ManifestRecord) -> bool {
        let pair = MethodPair::new(
            record.tree_method.unwrap_or(self.defaults.tree_method),
            record.network_method.unwrap_or(self.defaults.network_method),
        );

        if let Some(&slot) = self.index.get(&record.directory) {
            let existing = &self.items[slot];
            if record.outgroup.as_deref().is_some_and(|o| o != existing.outgroup)
                || (record.taxon_mapping.is_some() && record.taxon_mapping != existing.taxon_mapping)
            {
                tracing::warn!(
                    directory = %record.directory.display(),
                    line = record.line,
                    "Duplicate directory with different outgroup or mapping, keeping the first"
                );
            }
            let requests = &mut self.requests[slot];
            if !requests.contains(&pair) {
                requests.push(pair);
            }
            return false;
        }

        tracing::debug!(
            directory = %record.directory.display(),
            methods = %pair,
            "Registered work item"
        );

        let item = WorkItem {
            directory: record.directory.clone(),
            tree_method: pair.tree,
            network_method: pair.network,
            outgroup: record.outgroup.unwrap_or_default(),
            taxon_mapping: record.taxon_mapping,
            bootstrap_count: self.defaults.bootstrap_count,
            hmax_values: self.defaults.hmax_values.clone(),
        };
        self.index.insert(record.directory, self.items.len());
        self.items.push(item);
        self.requests.push(vec![pair]);
        true
    }

    pub fn register_all(&mut self, records: impl IntoIterator<Item = ManifestRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.register(record) {
                added += 1;
            }
        }
        added
    }

    pub fn get(&self, directory: &Path) -> Option<&WorkItem> {
        self.index.get(directory).map(|&slot| &self.items[slot])
    }

    /// Requested method pairs for a directory, without duplicates.
    pub fn requests(&self, directory: &Path) -> &[MethodPair] {
        self.index
            .get(directory)
            .map(|&slot| self.requests[slot].as_slice())
            .unwrap_or(&[])
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Items paired with their request lists, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&WorkItem, &[MethodPair])> {
        self.items
            .iter()
            .zip(self.requests.iter().map(Vec::as_slice))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
