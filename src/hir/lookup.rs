//! Name lookup through contexts, inheritance and imports.
//!
//! A lookup starts at a context and walks outward. At every level it asks
//! one context (plus, for classes, the inheritance chain and, for
//! namespaces, the same-path namespaces of visible files) for declarations
//! of the name and stops at the first level that yields anything. Imported
//! parent contexts of the top context are tried last.

use rustc_hash::FxHashSet;

use crate::base::{FileId, TextSize};

use super::ids::{ContextId, DeclId};
use super::store::SymbolView;
use super::symbols::ContextKind;

/// Inheritance chains deeper than this are not followed.
const MAX_BASE_DEPTH: u32 = 10;

/// What a lookup is for. Each mode sees the same contexts but filters or
/// groups the results differently.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LookupMode {
    /// Any declaration; the caller picks the most recent.
    Values,
    /// Overload candidates: a class and its whole inheritance chain count as
    /// one level so overriding and overridden functions are both returned.
    Functions,
    /// Namespaces, classes, interfaces and enumerations only.
    Types,
}

impl<'a> SymbolView<'a> {
    /// Look `name` up from `ctx`, seeing only what is declared before `pos`
    /// in statement-ordered contexts.
    pub fn lookup(&self, ctx: ContextId, name: &str, pos: Option<TextSize>, mode: LookupMode) -> Vec<DeclId> {
        let mut current = Some(ctx);
        while let Some(id) = current {
            let found = self.lookup_level(id, name, pos, mode);
            if !found.is_empty() {
                return found;
            }
            current = self.context(id).and_then(|c| c.parent);
        }

        let Some(top) = self.context(ContextId::top(ctx.file)) else {
            return Vec::new();
        };
        for &import in &top.imports {
            let found = self.local_declarations(import, name, None, mode);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// [`lookup`](Self::lookup), retried from the enclosing class when the
    /// start context is not itself a class body.
    pub fn lookup_with_auto_this(
        &self,
        ctx: ContextId,
        name: &str,
        pos: Option<TextSize>,
        mode: LookupMode,
    ) -> Vec<DeclId> {
        let found = self.lookup(ctx, name, pos, mode);
        if !found.is_empty() {
            return found;
        }
        let Some(context) = self.context(ctx) else {
            return found;
        };
        if context.kind == ContextKind::Type {
            return found;
        }
        match self.enclosing_class(ctx).and_then(|c| self.decl(c)?.inner) {
            Some(class_ctx) => self.lookup(class_ctx, name, None, mode),
            None => found,
        }
    }

    /// Declarations named `name` that are locals of `ctx` itself.
    pub fn local_declarations(
        &self,
        ctx: ContextId,
        name: &str,
        pos: Option<TextSize>,
        mode: LookupMode,
    ) -> Vec<DeclId> {
        let Some(context) = self.context(ctx) else {
            return Vec::new();
        };
        let ordered = context.kind.is_ordered();
        context
            .locals
            .iter()
            .copied()
            .filter(|&id| {
                let Some(decl) = self.decl(id) else {
                    return false;
                };
                if decl.name != name {
                    return false;
                }
                if mode == LookupMode::Types && !decl.kind.is_type_like() {
                    return false;
                }
                match pos {
                    Some(pos) if ordered => decl.name_range.start() < pos,
                    _ => true,
                }
            })
            .collect()
    }

    fn lookup_level(&self, ctx: ContextId, name: &str, pos: Option<TextSize>, mode: LookupMode) -> Vec<DeclId> {
        let Some(context) = self.context(ctx) else {
            return Vec::new();
        };
        match context.kind {
            ContextKind::Type => self.class_members(ctx, name, mode),
            ContextKind::Namespace => self.members_of(ctx, name, mode, ctx.file),
            _ => self.local_declarations(ctx, name, pos, mode),
        }
    }

    /// Members named `name` of the class owning `class_ctx`, searching the
    /// class first and then its bases depth first.
    ///
    /// In [`LookupMode::Functions`] every level contributes; otherwise the
    /// first class in the chain declaring the name wins.
    pub fn class_members(&self, class_ctx: ContextId, name: &str, mode: LookupMode) -> Vec<DeclId> {
        let mut found = self.local_declarations(class_ctx, name, None, mode);
        if !found.is_empty() && mode != LookupMode::Functions {
            return found;
        }
        for base_ctx in self.base_contexts(class_ctx) {
            let level = self.local_declarations(base_ctx, name, None, mode);
            if level.is_empty() {
                continue;
            }
            if mode != LookupMode::Functions {
                return level;
            }
            found.extend(level);
        }
        found
    }

    /// Member contexts of every base class and interface of the class owning
    /// `class_ctx`, depth first, each visited once.
    pub fn base_contexts(&self, class_ctx: ContextId) -> Vec<ContextId> {
        let mut out = Vec::new();
        let mut visited = FxHashSet::default();
        visited.insert(class_ctx);
        self.collect_bases(class_ctx, 0, &mut visited, &mut out);
        out
    }

    fn collect_bases(
        &self,
        class_ctx: ContextId,
        depth: u32,
        visited: &mut FxHashSet<ContextId>,
        out: &mut Vec<ContextId>,
    ) {
        if depth >= MAX_BASE_DEPTH {
            return;
        }
        let Some(owner) = self.context(class_ctx).and_then(|c| c.owner).and_then(|o| self.decl(o)) else {
            return;
        };
        for base in &owner.bases {
            let Some(base_ctx) = self.class_context_of(&base.ty) else {
                continue;
            };
            if visited.insert(base_ctx) {
                out.push(base_ctx);
                self.collect_bases(base_ctx, depth + 1, visited, out);
            }
        }
    }

    /// All namespace contexts with dotted `path` that `viewer` can see: the
    /// ones of its own file first, then those of imported files.
    pub fn namespace_contexts(&self, path: &str, viewer: FileId) -> Vec<ContextId> {
        let mut out = Vec::new();
        for file in self.visible_files(viewer) {
            if let Some(arena) = self.file(file) {
                out.extend(arena.namespace_contexts(path));
            }
        }
        out
    }

    /// Declarations named `name` inside `scope` as seen from `viewer`:
    /// class members with inheritance, or namespace members across files.
    pub fn members_of(&self, scope: ContextId, name: &str, mode: LookupMode, viewer: FileId) -> Vec<DeclId> {
        let Some(context) = self.context(scope) else {
            return Vec::new();
        };
        match context.kind {
            ContextKind::Namespace => {
                let path = context.path.clone().unwrap_or_default();
                let mut scopes = vec![scope];
                for ns in self.namespace_contexts(&path, viewer) {
                    if !scopes.contains(&ns) {
                        scopes.push(ns);
                    }
                }
                self.first_yielding(&scopes, name, mode)
            }
            ContextKind::Type => self.class_members(scope, name, mode),
            _ => self.local_declarations(scope, name, None, mode),
        }
    }

    fn first_yielding(&self, scopes: &[ContextId], name: &str, mode: LookupMode) -> Vec<DeclId> {
        scopes
            .iter()
            .map(|&ns| self.local_declarations(ns, name, None, mode))
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextRange;
    use crate::hir::store::SymbolStore;
    use crate::hir::symbols::{BaseClass, Context, DeclKind, Declaration, FileSymbols};
    use crate::hir::ty::Ty;

    fn r(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    fn ctx(kind: ContextKind, range: TextRange, owner: Option<DeclId>) -> Context {
        Context {
            kind,
            label: Default::default(),
            range,
            parent: None,
            owner,
            locals: Vec::new(),
            children: Vec::new(),
            imports: Vec::new(),
            origin: range.start(),
            path: None,
        }
    }

    /// class Base: func f(); class A extends Base: var x; func g() { var y }
    fn sample() -> (FileSymbols, ContextId, ContextId, ContextId) {
        let file = FileId::new(0);
        let top = ContextId::top(file);
        let mut arena = FileSymbols::new(file, r(0, 200));

        let base = arena.add_decl(Declaration::new("Base", DeclKind::Class, top, r(6, 10)));
        let base_ctx = arena.add_context(top, ctx(ContextKind::Type, r(10, 40), Some(base)));
        arena.decl_mut(base.local).expect("base").inner = Some(base_ctx);
        arena.decl_mut(base.local).expect("base").ty = Ty::Structure(base);
        arena.add_decl(Declaration::new("f", DeclKind::Function, base_ctx, r(20, 21)));

        let a = arena.add_decl(Declaration::new("A", DeclKind::Class, top, r(50, 51)));
        let a_ctx = arena.add_context(top, ctx(ContextKind::Type, r(60, 190), Some(a)));
        {
            let decl = arena.decl_mut(a.local).expect("a");
            decl.inner = Some(a_ctx);
            decl.bases.push(BaseClass::superclass(Ty::Structure(base)));
        }
        arena.add_decl(Declaration::new("x", DeclKind::Variable, a_ctx, r(70, 71)));
        arena.add_decl(Declaration::new("f", DeclKind::Function, a_ctx, r(75, 76)));
        let g = arena.add_decl(Declaration::new("g", DeclKind::Function, a_ctx, r(80, 81)));
        let g_ctx = arena.add_context(a_ctx, ctx(ContextKind::Function, r(82, 180), Some(g)));
        arena.add_decl(Declaration::new("y", DeclKind::Variable, g_ctx, r(100, 101)));

        (arena, a_ctx, base_ctx, g_ctx)
    }

    #[test]
    fn test_position_filter_in_function_context() {
        let (arena, _, _, g_ctx) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);

        assert!(view.lookup(g_ctx, "y", Some(TextSize::from(90)), LookupMode::Values).is_empty());
        assert_eq!(view.lookup(g_ctx, "y", Some(TextSize::from(120)), LookupMode::Values).len(), 1);
        assert_eq!(view.lookup(g_ctx, "y", None, LookupMode::Values).len(), 1);
    }

    #[test]
    fn test_walks_to_class_and_bases() {
        let (arena, a_ctx, base_ctx, g_ctx) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);

        assert_eq!(view.lookup(g_ctx, "x", Some(TextSize::from(120)), LookupMode::Values).len(), 1);
        assert_eq!(view.base_contexts(a_ctx), vec![base_ctx]);

        let values = view.lookup(g_ctx, "f", None, LookupMode::Values);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].file, FileId::new(0));
        assert_eq!(view.decl(values[0]).map(|d| d.context), Some(a_ctx));

        let functions = view.lookup(g_ctx, "f", None, LookupMode::Functions);
        assert_eq!(functions.len(), 2);
        assert_eq!(view.decl(functions[1]).map(|d| d.context), Some(base_ctx));
    }

    #[test]
    fn test_type_mode_skips_values() {
        let (arena, _, _, g_ctx) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);

        assert!(view.lookup(g_ctx, "x", None, LookupMode::Types).is_empty());
        assert_eq!(view.lookup(g_ctx, "Base", None, LookupMode::Types).len(), 1);
    }
}
