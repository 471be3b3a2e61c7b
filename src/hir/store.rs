//! The symbol store: published and in-progress analyses of every file.
//!
//! A job builds into the file's *pending* slot and only [`SymbolStore::publish`]
//! makes the result visible to other files. Readers always go through a
//! [`SymbolView`], which overlays the arena currently being built (if any)
//! on top of the published arenas.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::FileId;

use super::ids::{ContextId, DeclId};
use super::symbols::{Context, DeclKind, Declaration, FileSymbols};
use super::ty::{Primitive, Ty};

#[derive(Debug, Default)]
pub struct SymbolStore {
    current: FxHashMap<FileId, FileSymbols>,
    pending: FxHashMap<FileId, FileSymbols>,
    generation: u64,
    library: LibraryIndex,
    /// Files whose declarations or contexts changed (or vanished) since the
    /// last [`take_changed`](Self::take_changed).
    changed: Vec<FileId>,
}

/// The base-library file set and the classes it declares at top level.
#[derive(Debug, Default)]
struct LibraryIndex {
    files: Vec<FileId>,
    members: FxHashSet<FileId>,
    classes: FxHashMap<SmolStr, DeclId>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // BASE LIBRARY
    // ========================================================================

    /// Declare which files make up the base library, in search order.
    pub fn set_library_files(&mut self, files: Vec<FileId>) {
        self.library.members = files.iter().copied().collect();
        self.library.files = files;
        self.rebuild_library_classes();
    }

    pub fn is_library_file(&self, file: FileId) -> bool {
        self.library.members.contains(&file)
    }

    pub fn library_files(&self) -> &[FileId] {
        &self.library.files
    }

    /// Library files without a published analysis.
    pub fn missing_library_files(&self) -> Vec<FileId> {
        self.library
            .files
            .iter()
            .copied()
            .filter(|f| !self.current.contains_key(f))
            .collect()
    }

    /// True once every library file has been published at least once. A
    /// store without a library is always ready.
    pub fn library_ready(&self) -> bool {
        self.missing_library_files().is_empty()
    }

    /// Top contexts of the published library files, in library order.
    pub fn library_tops(&self) -> Vec<ContextId> {
        self.library
            .files
            .iter()
            .filter(|f| self.current.contains_key(f))
            .map(|&f| ContextId::top(f))
            .collect()
    }

    fn rebuild_library_classes(&mut self) {
        let mut classes = FxHashMap::default();
        for file in &self.library.files {
            let Some(arena) = self.current.get(file) else {
                continue;
            };
            for &id in &arena.top().locals {
                if let Some(decl) = arena.decl(id.local) {
                    if matches!(decl.kind, DeclKind::Class | DeclKind::Interface) {
                        classes.entry(decl.name.clone()).or_insert(id);
                    }
                }
            }
        }
        self.library.classes = classes;
    }

    // ========================================================================
    // PENDING / PUBLISHED
    // ========================================================================

    /// Install a freshly built arena as the file's pending result.
    pub fn stage(&mut self, arena: FileSymbols) {
        self.pending.insert(arena.file, arena);
    }

    pub fn pending(&self, file: FileId) -> Option<&FileSymbols> {
        self.pending.get(&file)
    }

    pub fn pending_mut(&mut self, file: FileId) -> Option<&mut FileSymbols> {
        self.pending.get_mut(&file)
    }

    /// Drop the pending result without publishing it.
    pub fn discard(&mut self, file: FileId) -> bool {
        self.pending.remove(&file).is_some()
    }

    /// Swap the pending result in as the published one.
    ///
    /// Returns the new generation, or `None` when nothing was pending.
    pub fn publish(&mut self, file: FileId) -> Option<u64> {
        let mut arena = self.pending.remove(&file)?;
        self.generation += 1;
        arena.generation = self.generation;
        let changed = self
            .current
            .get(&file)
            .is_none_or(|old| !old.same_declarations(&arena));
        if changed && !self.changed.contains(&file) {
            self.changed.push(file);
        }
        self.current.insert(file, arena);
        if self.is_library_file(file) {
            self.rebuild_library_classes();
        }
        tracing::debug!("published {} at generation {}", file, self.generation);
        Some(self.generation)
    }

    /// The published analysis of a file.
    pub fn current(&self, file: FileId) -> Option<&FileSymbols> {
        self.current.get(&file)
    }

    pub fn remove_file(&mut self, file: FileId) {
        self.pending.remove(&file);
        if self.current.remove(&file).is_some() && !self.changed.contains(&file) {
            self.changed.push(file);
        }
        if self.is_library_file(file) {
            self.rebuild_library_classes();
        }
    }

    /// Drain the files whose published declarations changed. Handles other
    /// files hold into them may now name different declarations.
    pub fn take_changed(&mut self) -> Vec<FileId> {
        std::mem::take(&mut self.changed)
    }

    /// Published files other than `file` whose imports reach into `file`.
    /// Their declarations and uses may hold handles into it.
    pub fn dependents(&self, file: FileId) -> Vec<FileId> {
        let mut files: Vec<FileId> = self
            .current
            .iter()
            .filter(|&(&f, arena)| f != file && arena.top().imports.iter().any(|c| c.file == file))
            .map(|(&f, _)| f)
            .collect();
        files.sort();
        files
    }

    pub fn published_files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.current.keys().copied()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A view over the published arenas only.
    pub fn view(&self) -> SymbolView<'_> {
        SymbolView {
            store: self,
            local: None,
        }
    }

    /// A view that sees `local` in place of the published arena of its file.
    pub fn view_with<'a>(&'a self, local: &'a FileSymbols) -> SymbolView<'a> {
        SymbolView {
            store: self,
            local: Some(local),
        }
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// Read access to declarations and contexts across files.
#[derive(Copy, Clone)]
pub struct SymbolView<'a> {
    store: &'a SymbolStore,
    local: Option<&'a FileSymbols>,
}

impl<'a> SymbolView<'a> {
    pub fn store(&self) -> &'a SymbolStore {
        self.store
    }

    pub fn file(&self, file: FileId) -> Option<&'a FileSymbols> {
        match self.local {
            Some(local) if local.file == file => Some(local),
            _ => self.store.current.get(&file),
        }
    }

    pub fn decl(&self, id: DeclId) -> Option<&'a Declaration> {
        self.file(id.file)?.decl(id.local)
    }

    pub fn context(&self, id: ContextId) -> Option<&'a Context> {
        self.file(id.file)?.context(id.local)
    }

    /// A top-level class of the base library, e.g. `Object` or `int`.
    pub fn library_class(&self, name: &str) -> Option<DeclId> {
        if let Some(local) = self.local.filter(|l| l.is_library) {
            let found = local.top().locals.iter().copied().find(|id| {
                local
                    .decl(id.local)
                    .is_some_and(|d| d.name == name && d.kind == DeclKind::Class)
            });
            if found.is_some() {
                return found;
            }
        }
        let id = *self.store.library.classes.get(name)?;
        // The published arena of the file being rebuilt is hidden by the view.
        match self.local {
            Some(local) if local.file == id.file => None,
            _ => Some(id),
        }
    }

    /// The class declaration whose context holds the members of `ty`.
    pub fn class_decl_of(&self, ty: &Ty) -> Option<DeclId> {
        match ty {
            Ty::Structure(id) => Some(*id),
            Ty::Primitive(p) => self.library_class(p.class_name()),
            _ => None,
        }
    }

    /// The member context of `ty`.
    pub fn class_context_of(&self, ty: &Ty) -> Option<ContextId> {
        self.decl(self.class_decl_of(ty)?)?.inner
    }

    /// The type a class declaration stands for: primitives for the library
    /// classes backing them, the structure type otherwise.
    pub fn structure_type(&self, id: DeclId) -> Ty {
        let Some(decl) = self.decl(id) else {
            return Ty::Unknown;
        };
        let in_library = self
            .file(id.file)
            .is_some_and(|f| f.is_library || self.store.is_library_file(f.file));
        if in_library && decl.context.is_top() {
            if let Some(p) = Primitive::from_class_name(&decl.name) {
                return Ty::Primitive(p);
            }
        }
        Ty::Structure(id)
    }

    /// Dotted name of a declaration through its owning contexts.
    pub fn qualified_name(&self, id: DeclId) -> Option<String> {
        let decl = self.decl(id)?;
        let mut parts = vec![decl.name.clone()];
        let mut ctx = self.context(decl.context);
        while let Some(c) = ctx {
            if let Some(owner) = c.owner.and_then(|o| self.decl(o)) {
                parts.push(owner.name.clone());
            }
            ctx = c.parent.and_then(|p| self.context(p));
        }
        parts.reverse();
        Some(parts.join("."))
    }

    /// The nearest enclosing class or interface declaration of `ctx`.
    pub fn enclosing_class(&self, ctx: ContextId) -> Option<DeclId> {
        let mut current = Some(ctx);
        while let Some(id) = current {
            let context = self.context(id)?;
            if let Some(owner) = context.owner {
                if self
                    .decl(owner)
                    .is_some_and(|d| matches!(d.kind, DeclKind::Class | DeclKind::Interface))
                {
                    return Some(owner);
                }
            }
            current = context.parent;
        }
        None
    }

    /// Files whose declarations `file` can see: itself and everything its
    /// top context imports.
    pub fn visible_files(&self, file: FileId) -> Vec<FileId> {
        let mut files = vec![file];
        if let Some(arena) = self.file(file) {
            for import in &arena.top().imports {
                if !files.contains(&import.file) {
                    files.push(import.file);
                }
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{TextRange, TextSize};
    use crate::hir::ids::LocalDeclId;

    fn arena_with_class(file: FileId, name: &str) -> FileSymbols {
        let mut arena = FileSymbols::new(file, TextRange::empty(TextSize::from(0)));
        arena.add_decl(Declaration::new(
            name,
            DeclKind::Class,
            ContextId::top(file),
            TextRange::empty(TextSize::from(0)),
        ));
        arena
    }

    #[test]
    fn test_publish_swaps_pending_and_bumps_generation() {
        let mut store = SymbolStore::new();
        let file = FileId::new(1);
        store.stage(arena_with_class(file, "A"));

        assert!(store.current(file).is_none());
        assert!(store.view().decl(DeclId::new(file, LocalDeclId::new(0))).is_none());

        let generation = store.publish(file);
        assert_eq!(generation, Some(1));
        assert_eq!(store.current(file).map(|f| f.generation), Some(1));
        assert!(store.pending(file).is_none());
        assert_eq!(store.publish(file), None);
    }

    #[test]
    fn test_changed_files_and_dependents() {
        let mut store = SymbolStore::new();
        let util = FileId::new(1);
        let app = FileId::new(2);
        store.stage(arena_with_class(util, "Util"));
        store.publish(util);
        let mut using = arena_with_class(app, "App");
        using.top_mut().imports.push(ContextId::top(util));
        store.stage(using);
        store.publish(app);
        assert_eq!(store.take_changed(), vec![util, app]);
        assert_eq!(store.dependents(util), vec![app]);
        assert!(store.dependents(app).is_empty());

        // Same declarations again: nothing to propagate.
        store.stage(arena_with_class(util, "Util"));
        store.publish(util);
        assert!(store.take_changed().is_empty());

        store.stage(arena_with_class(util, "Renamed"));
        store.publish(util);
        assert_eq!(store.take_changed(), vec![util]);

        store.remove_file(util);
        assert_eq!(store.take_changed(), vec![util]);
    }

    #[test]
    fn test_discard_keeps_published_result() {
        let mut store = SymbolStore::new();
        let file = FileId::new(1);
        store.stage(arena_with_class(file, "A"));
        store.publish(file);
        store.stage(arena_with_class(file, "B"));

        assert!(store.discard(file));
        let name = store.view().decl(DeclId::new(file, LocalDeclId::new(0))).map(|d| d.name.clone());
        assert_eq!(name.as_deref(), Some("A"));
    }

    #[test]
    fn test_view_overlays_local_arena() {
        let mut store = SymbolStore::new();
        let file = FileId::new(1);
        store.stage(arena_with_class(file, "Old"));
        store.publish(file);

        let local = arena_with_class(file, "New");
        let view = store.view_with(&local);
        let id = DeclId::new(file, LocalDeclId::new(0));
        assert_eq!(view.decl(id).map(|d| d.name.as_str()), Some("New"));
        assert_eq!(store.view().decl(id).map(|d| d.name.as_str()), Some("Old"));
    }

    #[test]
    fn test_library_readiness_and_classes() {
        let mut store = SymbolStore::new();
        let object = FileId::new(10);
        let int = FileId::new(11);
        store.set_library_files(vec![object, int]);
        assert!(!store.library_ready());

        store.stage(arena_with_class(object, "Object"));
        store.publish(object);
        assert_eq!(store.missing_library_files(), vec![int]);

        store.stage(arena_with_class(int, "int"));
        store.publish(int);
        assert!(store.library_ready());

        let view = store.view();
        let int_class = view.library_class("int").expect("int class");
        assert_eq!(view.structure_type(int_class), Ty::Primitive(Primitive::Int));
        let object_class = view.library_class("Object").expect("Object class");
        assert_eq!(view.structure_type(object_class), Ty::Structure(object_class));
        assert_eq!(store.library_tops(), vec![ContextId::top(object), ContextId::top(int)]);
    }
}
