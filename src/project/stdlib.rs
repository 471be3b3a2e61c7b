//! The base library: which files make it up and loading their text.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::base::FileId;
use crate::config::AnalysisConfig;

use super::include_paths::list_scripts;
use super::source::{DocumentSource, FileSet};

/// Expand the configured library file list against the library directory.
///
/// `dir/*.ds` entries list that directory (not recursively). Entries naming
/// files that do not exist are skipped with a warning.
pub fn library_paths(config: &AnalysisConfig) -> Vec<PathBuf> {
    let Some(root) = &config.library_dir else {
        return Vec::new();
    };
    let mut paths = Vec::new();
    for entry in &config.library_files {
        match entry.strip_suffix(&format!("*.{}", config.extension)) {
            Some(dir) => paths.extend(list_scripts(&root.join(dir), &config.extension, 1)),
            None => {
                let path = root.join(entry);
                if path.is_file() {
                    paths.push(path);
                } else {
                    tracing::warn!("base library file {} not found", path.display());
                }
            }
        }
    }
    paths.dedup();
    paths
}

/// Register the library files with `files` and read them in parallel.
///
/// Returns the ids of the files that could be read, in configured order;
/// the rest are logged and left out so they cannot hold the library back.
pub fn load_library(config: &AnalysisConfig, files: &FileSet) -> Vec<FileId> {
    let paths = library_paths(config);
    let ids: Vec<(FileId, &Path)> = paths.iter().map(|p| (files.file_id(p), p.as_path())).collect();

    let loaded: Vec<Option<FileId>> = ids
        .par_iter()
        .map(|&(id, path)| match files.read(id) {
            Ok(_) => Some(id),
            Err(err) => {
                tracing::warn!("dropping base library file {}: {}", path.display(), err);
                None
            }
        })
        .collect();

    let loaded: Vec<FileId> = loaded.into_iter().flatten().collect();
    tracing::info!("base library: {} of {} files loaded", loaded.len(), paths.len());
    loaded
}
