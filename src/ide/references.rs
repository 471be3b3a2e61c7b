//! Find references: every recorded use of a declaration.

use crate::hir::{DeclId, SymbolStore, Use};

/// Uses of `decl` across all published files, ordered by file and position.
pub fn uses_of(store: &SymbolStore, decl: DeclId) -> Vec<Use> {
    let mut uses: Vec<Use> = store
        .published_files()
        .filter_map(|file| store.current(file))
        .flat_map(|arena| arena.uses.iter().copied())
        .filter(|u| u.decl == decl)
        .collect();
    uses.sort_by_key(|u| (u.file, u.range.start()));
    uses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FileId, TextRange, TextSize};
    use crate::hir::{ContextId, DeclKind, Declaration, FileSymbols};

    fn r(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn test_collects_across_files_in_order() {
        let a = FileId::new(0);
        let b = FileId::new(1);
        let mut store = SymbolStore::new();

        let mut defining = FileSymbols::new(a, r(0, 100));
        let target = defining.add_decl(Declaration::new("T", DeclKind::Class, ContextId::top(a), r(6, 7)));
        defining.uses.push(Use { file: a, range: r(50, 51), decl: target });
        defining.uses.push(Use { file: a, range: r(20, 21), decl: target });
        store.stage(defining);
        store.publish(a);

        let mut using = FileSymbols::new(b, r(0, 100));
        let other = using.add_decl(Declaration::new("U", DeclKind::Class, ContextId::top(b), r(6, 7)));
        using.uses.push(Use { file: b, range: r(30, 31), decl: target });
        using.uses.push(Use { file: b, range: r(40, 41), decl: other });
        store.stage(using);
        store.publish(b);

        let found: Vec<(FileId, u32)> = uses_of(&store, target)
            .iter()
            .map(|u| (u.file, u.range.start().into()))
            .collect();
        assert_eq!(found, vec![(a, 20), (a, 50), (b, 30)]);
    }
}
