//! Analysis configuration.
//!
//! Plain options with builder-style setters. Nothing here reads files; the
//! project layer expands directories when the orchestrator is created.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use smol_str::SmolStr;

use crate::hir::BuildOptions;

/// Base-library files in load order, relative to the library directory.
/// A trailing `*.ds` segment lists a whole directory.
pub const DEFAULT_LIBRARY_FILES: &[&str] = &[
    "bool.ds",
    "int.ds",
    "byte.ds",
    "float.ds",
    "Object.ds",
    "Exception.ds",
    "String.ds",
    "Array.ds",
    "Dictionary.ds",
    "Block.ds",
    "Byte.ds",
    "Boolean.ds",
    "Integer.ds",
    "Float.ds",
    "WeakReference.ds",
    "math/Math.ds",
    "exceptions/*.ds",
    "introspection/*.ds",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("use batch size must be at least 1")]
    ZeroBatchSize,
    #[error("cast depth limit must be at least 1")]
    ZeroCastLimit,
    #[error("script extension must be non-empty and without a leading dot, got {0:?}")]
    InvalidExtension(String),
    #[error("root class name must not be empty")]
    EmptyRootClass,
    #[error("library directory not found: {0}")]
    LibraryDirNotFound(PathBuf),
    #[error("root file {0} is not part of the library file list")]
    RootFileNotListed(String),
}

/// Options for one analysis host.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Size of the worker pool.
    pub workers: usize,
    /// Directory holding the base library. Without one there is no library
    /// and every file is ready immediately.
    pub library_dir: Option<PathBuf>,
    pub library_files: Vec<String>,
    /// Library file declaring the root class.
    pub root_file: String,
    pub root_class: SmolStr,
    pub include_dirs: Vec<PathBuf>,
    /// Script file extension, without the dot.
    pub extension: String,
    pub cast_limit: u32,
    /// How many uses are published per write-lock acquisition.
    pub use_batch_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            library_dir: None,
            library_files: DEFAULT_LIBRARY_FILES.iter().map(|s| s.to_string()).collect(),
            root_file: String::from("Object.ds"),
            root_class: SmolStr::new_static("Object"),
            include_dirs: Vec::new(),
            extension: String::from("ds"),
            cast_limit: 16,
            use_batch_size: 64,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    pub fn with_library_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.library_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_root(mut self, file: impl Into<String>, class: impl Into<SmolStr>) -> Self {
        self.root_file = file.into();
        self.root_class = class.into();
        self
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_cast_limit(mut self, limit: u32) -> Self {
        self.cast_limit = limit;
        self
    }

    pub fn with_use_batch_size(mut self, size: usize) -> Self {
        self.use_batch_size = size;
        self
    }

    /// Check the options without touching anything but the library
    /// directory's existence.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.use_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.cast_limit == 0 {
            return Err(ConfigError::ZeroCastLimit);
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(ConfigError::InvalidExtension(self.extension.clone()));
        }
        if self.root_class.is_empty() {
            return Err(ConfigError::EmptyRootClass);
        }
        if let Some(dir) = &self.library_dir {
            if !dir.is_dir() {
                return Err(ConfigError::LibraryDirNotFound(dir.clone()));
            }
            if !self.library_files.iter().any(|f| f == &self.root_file) {
                return Err(ConfigError::RootFileNotListed(self.root_file.clone()));
            }
        }
        Ok(())
    }

    /// Whether `path` names a script by its extension.
    pub fn is_script(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension.as_str())
    }

    /// The language settings the builders need.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            root_class: self.root_class.clone(),
            cast_limit: self.cast_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.root_file, "Object.ds");
        assert_eq!(config.cast_limit, 16);
        assert_eq!(config.use_batch_size, 64);
        assert!(config.library_files.iter().any(|f| f == "exceptions/*.ds"));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(AnalysisConfig::new().with_workers(0).validate(), Err(ConfigError::ZeroWorkers));
        assert_eq!(
            AnalysisConfig::new().with_use_batch_size(0).validate(),
            Err(ConfigError::ZeroBatchSize)
        );
        assert_eq!(
            AnalysisConfig::new().with_extension(".ds").validate(),
            Err(ConfigError::InvalidExtension(".ds".into()))
        );
        let missing = PathBuf::from("/definitely/not/a/library");
        assert_eq!(
            AnalysisConfig::new().with_library_dir(&missing).validate(),
            Err(ConfigError::LibraryDirNotFound(missing))
        );
    }

    #[test]
    fn test_root_file_must_be_listed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AnalysisConfig::new()
            .with_library_dir(dir.path())
            .with_library_files(["Base.ds"]);
        assert_eq!(config.validate(), Err(ConfigError::RootFileNotListed("Object.ds".into())));
        assert_eq!(config.with_root("Base.ds", "Base").validate(), Ok(()));
    }

    #[test]
    fn test_build_options_and_extension() {
        let config = AnalysisConfig::new().with_cast_limit(4).with_root("Object.ds", "Root");
        let options = config.build_options();
        assert_eq!(options.cast_limit, 4);
        assert_eq!(options.root_class, "Root");
        assert!(config.is_script(Path::new("a/b/Main.ds")));
        assert!(!config.is_script(Path::new("a/b/Main.txt")));
    }
}
