//! Go to definition: the declaration behind a source position.

use crate::base::{FileId, TextRange, TextSize};
use crate::hir::{DeclId, Declaration, SymbolStore};

/// The declaration a position refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoTarget {
    pub decl: DeclId,
    /// File and name range to jump to.
    pub file: FileId,
    pub range: TextRange,
    pub declaration: Declaration,
}

/// Resolve the identifier at `offset` in `file`.
///
/// A recorded use wins (the innermost when several touch the offset);
/// otherwise a declaration whose name is under the cursor resolves to
/// itself.
pub fn resolve_at(store: &SymbolStore, file: FileId, offset: TextSize) -> Option<GotoTarget> {
    let arena = store.current(file)?;
    let view = store.view();

    let used = arena
        .uses
        .iter()
        .filter(|u| u.range.contains_inclusive(offset))
        .min_by_key(|u| u.range.len())
        .map(|u| u.decl);
    let decl = used.or_else(|| {
        arena
            .decls()
            .filter(|(_, d)| d.name_range.contains_inclusive(offset))
            .min_by_key(|(_, d)| d.name_range.len())
            .map(|(id, _)| id)
    })?;

    let declaration = view.decl(decl)?;
    Some(GotoTarget {
        decl,
        file: decl.file,
        range: declaration.name_range,
        declaration: declaration.clone(),
    })
}
