//! Analysis host and read-only snapshots of its results.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::base::{FileId, LineCol, LineIndex, TextSize};
use crate::config::AnalysisConfig;
use crate::hir::{ContextId, DeclId, Declaration, Diagnostic, SymbolStore, Use};
use crate::project::{
    stdlib, AnalysisError, DocumentSource, FileSet, JobOutcome, JobRequest, Orchestrator, Priority,
    PublishListener,
};

use super::completion::{completions_at, completions_in_scope, CompletionItem};
use super::goto::{resolve_at, GotoTarget};
use super::references::uses_of;

/// Owns the symbol store, the documents and the job orchestrator.
pub struct AnalysisHost {
    store: Arc<RwLock<SymbolStore>>,
    files: Arc<FileSet>,
    orchestrator: Orchestrator,
}

impl AnalysisHost {
    /// Register and read the base library and queue it for analysis.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let files = Arc::new(FileSet::new());
        let library = stdlib::load_library(&config, &files);

        let mut store = SymbolStore::new();
        store.set_library_files(library.clone());
        let store = Arc::new(RwLock::new(store));

        let orchestrator = Orchestrator::new(store.clone(), files.clone(), config)?;
        for file in library {
            orchestrator.schedule(JobRequest::new(file).with_priority(Priority::High));
        }
        Ok(Self {
            store,
            files,
            orchestrator,
        })
    }

    /// Set the text of a document (opening it if new) and queue it.
    pub fn set_file_content(&self, path: impl AsRef<Path>, text: &str) -> FileId {
        let file = self.files.file_id(path.as_ref());
        self.files.set_contents(file, text);
        self.orchestrator.schedule_file(file);
        file
    }

    /// Open a document from disk and queue it.
    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<FileId, AnalysisError> {
        let file = self.files.file_id(path.as_ref());
        self.files.read(file)?;
        self.orchestrator.schedule_file(file);
        Ok(file)
    }

    pub fn remove_file(&self, file: FileId) {
        self.orchestrator.remove_file(file);
        self.files.remove(file);
    }

    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.files.lookup(path.as_ref())
    }

    pub fn add_listener(&self, listener: Arc<dyn PublishListener>) {
        self.orchestrator.add_listener(listener);
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run all queued jobs to completion.
    pub fn analyze(&self) -> Vec<JobOutcome> {
        self.orchestrator.run()
    }

    /// A snapshot holding the store's read lock. Drop it before calling
    /// [`analyze`](Self::analyze).
    pub fn analysis(&self) -> Analysis<'_> {
        Analysis {
            store: self.store.read(),
            files: &self.files,
        }
    }
}

/// Read-only queries over published results.
pub struct Analysis<'a> {
    store: RwLockReadGuard<'a, SymbolStore>,
    files: &'a FileSet,
}

impl Analysis<'_> {
    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn resolve_at(&self, file: FileId, offset: TextSize) -> Option<GotoTarget> {
        resolve_at(&self.store, file, offset)
    }

    pub fn completions_in_scope(&self, ctx: ContextId) -> Vec<CompletionItem> {
        completions_in_scope(&self.store, ctx)
    }

    pub fn completions_at(&self, file: FileId, offset: TextSize) -> Vec<CompletionItem> {
        completions_at(&self.store, file, offset)
    }

    /// Published diagnostics of `file`; empty when it was never analysed.
    pub fn diagnostics(&self, file: FileId) -> Vec<Diagnostic> {
        self.store
            .current(file)
            .map(|arena| arena.diagnostics.clone())
            .unwrap_or_default()
    }

    pub fn uses_of(&self, decl: DeclId) -> Vec<Use> {
        uses_of(&self.store, decl)
    }

    pub fn declaration(&self, decl: DeclId) -> Option<&Declaration> {
        self.store.view().decl(decl)
    }

    /// Top-level or nested declarations named `name` in `file`.
    pub fn declarations_named(&self, file: FileId, name: &str) -> Vec<DeclId> {
        self.store
            .current(file)
            .map(|arena| {
                arena
                    .decls()
                    .filter(|(_, d)| d.name == name)
                    .map(|(id, _)| id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Display position of `offset`, when the file's text is known.
    pub fn line_col(&self, file: FileId, offset: TextSize) -> Option<LineCol> {
        let text = self.files.contents(file)?;
        Some(LineIndex::new(&text).line_col(offset))
    }

    /// Store generation the snapshot was taken at.
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }
}
