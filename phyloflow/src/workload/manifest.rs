//! Workload manifest parsing.
//!
//! One record per line:
//!
//! ```text
//! # directory|tree_method|network_method|outgroup|taxon_mapping
//! /data/d1|RAXML|MPL|Z
//! /data/d2
//! ```
//!
//! Everything after the directory is optional; empty fields take the run
//! defaults when the record is registered.

use super::item::{NetworkMethod, TreeMethod};
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::path::{Path, PathBuf};

const FIELD_SEPARATOR: char = '|';

/// A single manifest line, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    /// 1-based line number in the source text.
    pub line: usize,
    pub directory: PathBuf,
    pub tree_method: Option<TreeMethod>,
    pub network_method: Option<NetworkMethod>,
    pub outgroup: Option<String>,
    pub taxon_mapping: Option<String>,
}

impl ManifestRecord {
    /// Record with only a directory, all other fields defaulted.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            line: 0,
            directory: directory.into(),
            tree_method: None,
            network_method: None,
            outgroup: None,
            taxon_mapping: None,
        }
    }

    pub fn with_methods(mut self, tree: TreeMethod, network: NetworkMethod) -> Self {
        self.tree_method = Some(tree);
        self.network_method = Some(network);
        self
    }
}

/// Parse manifest text into records, preserving line order.
pub fn parse_manifest(text: &str) -> PhyloflowResult<Vec<ManifestRecord>> {
    let mut records = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split(FIELD_SEPARATOR).map(str::trim);
        let directory = match fields.next() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                return Err(PhyloflowError::Manifest(format!(
                    "line {}: missing directory",
                    line
                )));
            }
        };

        let tree_method = optional(fields.next())
            .map(|s| s.parse::<TreeMethod>())
            .transpose()
            .map_err(|e| PhyloflowError::Manifest(format!("line {}: {}", line, e)))?;
        let network_method = optional(fields.next())
            .map(|s| s.parse::<NetworkMethod>())
            .transpose()
            .map_err(|e| PhyloflowError::Manifest(format!("line {}: {}", line, e)))?;
        let outgroup = optional(fields.next()).map(str::to_string);
        let taxon_mapping = optional(fields.next()).map(str::to_string);

        if fields.next().is_some() {
            return Err(PhyloflowError::Manifest(format!(
                "line {}: too many fields",
                line
            )));
        }

        records.push(ManifestRecord {
            line,
            directory,
            tree_method,
            network_method,
            outgroup,
            taxon_mapping,
        });
    }

    tracing::debug!(records = records.len(), "Parsed workload manifest");
    Ok(records)
}

/// Read and parse a manifest file.
///
/// Relative directories resolve against the manifest's own directory.
pub fn load_manifest(path: &Path) -> PhyloflowResult<Vec<ManifestRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PhyloflowError::Manifest(format!("cannot read {}: {}", path.display(), e))
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut records = parse_manifest(&text)?;
    for record in &mut records {
        if record.directory.is_relative() {
            record.directory = base.join(&record.directory);
        }
    }
    Ok(records)
}

fn optional(field: Option<&str>) -> Option<&str> {
    field.filter(|f| !f.is_empty())
}
