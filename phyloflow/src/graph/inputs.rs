//! Discovery of per-input stage instances.

use crate::template::InputSet;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists the input files a per-input stage expands over.
pub trait InputCatalog: Send + Sync {
    /// Files of `set` under `directory`, in a stable order.
    fn list(&self, directory: &Path, set: InputSet) -> PhyloflowResult<Vec<PathBuf>>;
}

/// Reads inputs from `<directory>/input/<set>/*.<ext>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsInputCatalog;

impl InputCatalog for FsInputCatalog {
    fn list(&self, directory: &Path, set: InputSet) -> PhyloflowResult<Vec<PathBuf>> {
        let dir = directory.join(set.subdirectory());
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "Input directory missing");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                PhyloflowError::Storage(format!("cannot list {}: {}", dir.display(), e))
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(set.extension()))
            {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lists_matching_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let phylip = tmp.path().join("input/phylip");
        std::fs::create_dir_all(phylip.join("nested")).unwrap();
        for name in ["b.phy", "a.phy", "notes.txt", "nested/c.phy"] {
            std::fs::write(phylip.join(name), "").unwrap();
        }

        let files = FsInputCatalog.list(tmp.path(), InputSet::Phylip).unwrap();
        assert_eq!(files, vec![phylip.join("a.phy"), phylip.join("b.phy")]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = FsInputCatalog.list(tmp.path(), InputSet::Nexus).unwrap();
        assert!(files.is_empty());
    }
}
