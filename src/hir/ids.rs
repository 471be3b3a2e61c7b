//! Handles into the per-file symbol arenas.
//!
//! Every declaration and context lives in the arena of the file that
//! declares it. Cross-file references are `(FileId, local index)` pairs, so
//! replacing one file's arena never leaves dangling pointers elsewhere: a
//! stale handle simply fails to resolve.

use std::fmt;

use crate::base::FileId;

/// Index of a declaration inside its file's arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LocalDeclId(pub u32);

impl LocalDeclId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a context inside its file's arena. Index 0 is the top context.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LocalContextId(pub u32);

impl LocalContextId {
    pub const TOP: LocalContextId = LocalContextId(0);

    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A declaration anywhere in the store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DeclId {
    pub file: FileId,
    pub local: LocalDeclId,
}

impl DeclId {
    #[inline]
    pub const fn new(file: FileId, local: LocalDeclId) -> Self {
        Self { file, local }
    }
}

/// A context (scope) anywhere in the store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ContextId {
    pub file: FileId,
    pub local: LocalContextId,
}

impl ContextId {
    #[inline]
    pub const fn new(file: FileId, local: LocalContextId) -> Self {
        Self { file, local }
    }

    /// The top context of `file`.
    #[inline]
    pub const fn top(file: FileId) -> Self {
        Self {
            file,
            local: LocalContextId::TOP,
        }
    }

    #[inline]
    pub fn is_top(self) -> bool {
        self.local == LocalContextId::TOP
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclId({}:{})", self.file.0, self.local.0)
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({}:{})", self.file.0, self.local.0)
    }
}

impl fmt::Debug for LocalDeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalDeclId({})", self.0)
    }
}

impl fmt::Debug for LocalContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalContextId({})", self.0)
    }
}
