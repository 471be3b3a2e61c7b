//! Lazy, cached listing of script files under include directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use walkdir::WalkDir;

/// Recursive `*.<extension>` listings, one per directory, computed on first
/// use and kept until dropped.
#[derive(Debug)]
pub struct IncludePaths {
    extension: String,
    cache: Mutex<IndexMap<PathBuf, Arc<[PathBuf]>>>,
}

impl IncludePaths {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            cache: Mutex::new(IndexMap::new()),
        }
    }

    /// Script files below `dir`, sorted by path.
    pub fn files(&self, dir: &Path) -> Arc<[PathBuf]> {
        if let Some(files) = self.cache.lock().get(dir) {
            return files.clone();
        }
        let files: Arc<[PathBuf]> = list_scripts(dir, &self.extension, usize::MAX).into();
        tracing::debug!("listed {} scripts under {}", files.len(), dir.display());
        self.cache
            .lock()
            .entry(dir.to_owned())
            .or_insert(files)
            .clone()
    }

    /// Whether a listing of `dir` is cached.
    pub fn is_cached(&self, dir: &Path) -> bool {
        self.cache.lock().contains_key(dir)
    }

    /// Forget the listing of `dir`; the next [`files`](Self::files) rescans.
    pub fn drop_cache(&self, dir: &Path) -> bool {
        let dropped = self.cache.lock().swap_remove(dir).is_some();
        if dropped {
            tracing::debug!("dropped include listing of {}", dir.display());
        }
        dropped
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

/// Files with `extension` below `dir`, at most `depth` levels deep.
/// Unreadable entries are skipped.
pub(crate) fn list_scripts(dir: &Path, extension: &str, depth: usize) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(depth)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping entry under {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, "class X\nend\n").expect("write");
    }

    #[test]
    fn test_lists_recursively_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("a.ds"));
        touch(&dir.path().join("nested/deeper/b.ds"));
        touch(&dir.path().join("notes.txt"));

        let paths = IncludePaths::new("ds");
        let files = paths.files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.extension().is_some_and(|e| e == "ds")));
    }

    #[test]
    fn test_listing_is_cached_until_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("a.ds"));

        let paths = IncludePaths::new("ds");
        assert_eq!(paths.files(dir.path()).len(), 1);
        assert!(paths.is_cached(dir.path()));

        touch(&dir.path().join("b.ds"));
        assert_eq!(paths.files(dir.path()).len(), 1);

        assert!(paths.drop_cache(dir.path()));
        assert!(!paths.drop_cache(dir.path()));
        assert_eq!(paths.files(dir.path()).len(), 2);
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let paths = IncludePaths::new("ds");
        assert!(paths.files(Path::new("/no/such/include/dir")).is_empty());
    }
}
