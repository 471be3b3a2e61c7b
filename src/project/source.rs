//! Document sources: stable file ids, text and revisions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::FileId;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unknown file {0}")]
    UnknownFile(FileId),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Text of a document together with the revision it was taken at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub text: Arc<str>,
    pub revision: u64,
}

/// Where analysis jobs read documents from.
pub trait DocumentSource: Send + Sync {
    /// Current revision marker, without reading the text.
    fn revision(&self, file: FileId) -> Option<u64>;

    fn read(&self, file: FileId) -> Result<Document, SourceError>;
}

/// Maps paths to stable [`FileId`]s and holds document text.
///
/// Text set through [`set_contents`](Self::set_contents) wins over the file
/// on disk. Text read from disk is cached until
/// [`invalidate`](Self::invalidate).
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    path_to_id: IndexMap<PathBuf, FileId>,
    id_to_path: IndexMap<FileId, PathBuf>,
    contents: IndexMap<FileId, Arc<str>>,
    revisions: IndexMap<FileId, u64>,
    next_id: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign the id of `path`.
    pub fn file_id(&self, path: &Path) -> FileId {
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        let mut inner = self.inner.write();
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }
        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        inner.revisions.insert(id, 0);
        id
    }

    pub fn lookup(&self, path: &Path) -> Option<FileId> {
        self.inner.read().path_to_id.get(path).copied()
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.inner.read().id_to_path.get(&file).cloned()
    }

    /// Replace the text of a file, bumping its revision.
    pub fn set_contents(&self, file: FileId, contents: impl Into<Arc<str>>) -> u64 {
        let mut inner = self.inner.write();
        inner.contents.insert(file, contents.into());
        let revision = inner.revisions.entry(file).or_insert(0);
        *revision += 1;
        *revision
    }

    pub fn contents(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().contents.get(&file).cloned()
    }

    /// Forget cached text so the next read goes to disk again.
    pub fn invalidate(&self, file: FileId) {
        let mut inner = self.inner.write();
        inner.contents.swap_remove(&file);
        if let Some(revision) = inner.revisions.get_mut(&file) {
            *revision += 1;
        }
    }

    pub fn remove(&self, file: FileId) {
        let mut inner = self.inner.write();
        if let Some(path) = inner.id_to_path.swap_remove(&file) {
            inner.path_to_id.swap_remove(&path);
        }
        inner.contents.swap_remove(&file);
        inner.revisions.swap_remove(&file);
    }

    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn files(&self) -> Vec<FileId> {
        self.inner.read().id_to_path.keys().copied().collect()
    }
}

impl DocumentSource for FileSet {
    fn revision(&self, file: FileId) -> Option<u64> {
        self.inner.read().revisions.get(&file).copied()
    }

    fn read(&self, file: FileId) -> Result<Document, SourceError> {
        let path = {
            let inner = self.inner.read();
            let revision = *inner.revisions.get(&file).ok_or(SourceError::UnknownFile(file))?;
            if let Some(text) = inner.contents.get(&file) {
                return Ok(Document {
                    text: text.clone(),
                    revision,
                });
            }
            inner.id_to_path.get(&file).cloned().ok_or(SourceError::UnknownFile(file))?
        };

        let text: Arc<str> = std::fs::read_to_string(&path)
            .map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?
            .into();
        tracing::debug!("read {} from {}", file, path.display());

        let mut inner = self.inner.write();
        let revision = inner.revisions.get(&file).copied().unwrap_or_default();
        inner.contents.entry(file).or_insert_with(|| text.clone());
        Ok(Document { text, revision })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_id_assignment_is_stable() {
        let files = FileSet::new();
        let a = files.file_id(Path::new("/a.ds"));
        let b = files.file_id(Path::new("/b.ds"));
        assert_ne!(a, b);
        assert_eq!(files.file_id(Path::new("/a.ds")), a);
        assert_eq!(files.lookup(Path::new("/b.ds")), Some(b));
        assert_eq!(files.path(a).as_deref(), Some(Path::new("/a.ds")));
    }

    #[test]
    fn test_in_memory_contents_bump_revision() {
        let files = FileSet::new();
        let id = files.file_id(Path::new("/memory.ds"));
        assert_eq!(files.revision(id), Some(0));

        assert_eq!(files.set_contents(id, "class A\nend\n"), 1);
        assert_eq!(files.set_contents(id, "class B\nend\n"), 2);
        let document = files.read(id).expect("in memory");
        assert_eq!(&*document.text, "class B\nend\n");
        assert_eq!(document.revision, 2);
    }

    #[test]
    fn test_reads_and_caches_disk_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Main.ds");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "class Main").expect("write");
        writeln!(file, "end").expect("write");

        let files = FileSet::new();
        let id = files.file_id(&path);
        assert_eq!(&*files.read(id).expect("disk").text, "class Main\nend\n");

        std::fs::write(&path, "class Changed\nend\n").expect("rewrite");
        assert_eq!(&*files.read(id).expect("cached").text, "class Main\nend\n");

        files.invalidate(id);
        let document = files.read(id).expect("reread");
        assert_eq!(&*document.text, "class Changed\nend\n");
        assert_eq!(document.revision, 1);
    }

    #[test]
    fn test_read_failures() {
        let files = FileSet::new();
        assert!(matches!(files.read(FileId::new(9)), Err(SourceError::UnknownFile(_))));

        let id = files.file_id(Path::new("/no/such/dir/Missing.ds"));
        assert!(matches!(files.read(id), Err(SourceError::Io { .. })));
    }
}
