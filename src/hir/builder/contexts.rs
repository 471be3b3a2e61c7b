//! Scope construction: a stack of open contexts over one file arena.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};

use crate::hir::ids::{ContextId, DeclId};
use crate::hir::symbols::{Context, ContextKind, FileSymbols};

/// Opens and closes the contexts of one file in source order.
///
/// Every opened context is closed exactly once. A context whose terminator
/// is missing ends at the furthest end among its contents.
pub struct ContextBuilder {
    arena: FileSymbols,
    stack: Vec<ContextId>,
}

/// What a new context is introduced by.
pub struct OpenContext {
    pub kind: ContextKind,
    pub label: SmolStr,
    /// Where the scope's range begins.
    pub start: TextSize,
    /// Start of the syntax node introducing the scope.
    pub origin: TextSize,
    pub owner: Option<DeclId>,
    pub path: Option<SmolStr>,
}

impl OpenContext {
    pub fn new(kind: ContextKind, label: impl Into<SmolStr>, start: TextSize, origin: TextSize) -> Self {
        Self {
            kind,
            label: label.into(),
            start,
            origin,
            owner: None,
            path: None,
        }
    }

    pub fn owned_by(mut self, owner: DeclId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_path(mut self, path: impl Into<SmolStr>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl ContextBuilder {
    pub fn new(arena: FileSymbols) -> Self {
        let top = ContextId::top(arena.file);
        Self {
            arena,
            stack: vec![top],
        }
    }

    /// The innermost open context.
    pub fn current(&self) -> ContextId {
        self.stack.last().copied().unwrap_or_else(|| ContextId::top(self.arena.file))
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn open(&mut self, open: OpenContext) -> ContextId {
        let parent = self.current();
        let id = self.arena.add_context(
            parent,
            Context {
                kind: open.kind,
                label: open.label,
                range: TextRange::empty(open.start),
                parent: None,
                owner: open.owner,
                locals: Vec::new(),
                children: Vec::new(),
                imports: Vec::new(),
                origin: open.origin,
                path: open.path,
            },
        );
        self.stack.push(id);
        id
    }

    /// Close the innermost context at `end`, or at the furthest end among
    /// its contents (at least `hint`) when the terminator is missing.
    pub fn close(&mut self, end: Option<TextSize>, hint: TextSize) {
        if self.stack.len() <= 1 {
            tracing::warn!("close without an open context in {}", self.arena.file);
            return;
        }
        let Some(id) = self.stack.pop() else {
            return;
        };
        let end = match end {
            Some(end) => end,
            None => self.furthest_content_end(id).max(hint),
        };
        if let Some(ctx) = self.arena.context_mut(id.local) {
            let start = ctx.range.start();
            ctx.range = TextRange::new(start, end.max(start));
        }
    }

    /// Re-enter a context closed earlier to add nested scopes to it.
    pub fn enter(&mut self, id: ContextId) {
        self.stack.push(id);
    }

    /// Leave a context entered with [`enter`](Self::enter) without touching
    /// its range.
    pub fn leave(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Close contexts until only `depth` remain open.
    pub fn close_to(&mut self, depth: usize, end: TextSize) {
        while self.stack.len() > depth.max(1) {
            self.close(Some(end), end);
        }
    }

    fn furthest_content_end(&self, id: ContextId) -> TextSize {
        let Some(ctx) = self.arena.context(id.local) else {
            return TextSize::from(0);
        };
        let children = ctx
            .children
            .iter()
            .filter_map(|c| self.arena.context(c.local))
            .map(|c| c.range.end());
        let locals = ctx
            .locals
            .iter()
            .filter_map(|d| self.arena.decl(d.local))
            .map(|d| d.range.end());
        children.chain(locals).fold(ctx.range.start(), TextSize::max)
    }

    pub fn arena(&self) -> &FileSymbols {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut FileSymbols {
        &mut self.arena
    }

    /// Close whatever is still open and hand the arena back.
    pub fn finish(mut self, end: TextSize) -> FileSymbols {
        self.close_to(1, end);
        self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;
    use crate::hir::symbols::{DeclKind, Declaration};

    fn at(offset: u32) -> TextSize {
        TextSize::from(offset)
    }

    #[test]
    fn test_nesting_and_explicit_ends() {
        let file = FileId::new(0);
        let mut builder = ContextBuilder::new(FileSymbols::new(file, TextRange::new(at(0), at(100))));

        let class = builder.open(OpenContext::new(ContextKind::Type, "A", at(10), at(0)));
        let func = builder.open(OpenContext::new(ContextKind::Function, "f", at(20), at(15)));
        assert_eq!(builder.current(), func);
        builder.close(Some(at(40)), at(40));
        assert_eq!(builder.current(), class);
        builder.close(Some(at(50)), at(50));

        let arena = builder.finish(at(100));
        let class_ctx = arena.context(class.local).expect("class");
        assert_eq!(class_ctx.range, TextRange::new(at(10), at(50)));
        assert_eq!(class_ctx.children, vec![func]);
        assert_eq!(arena.child_at_origin(ContextId::top(file), at(0)), Some(class));
        assert_eq!(arena.context_at(at(30)), func);
    }

    #[test]
    fn test_missing_end_uses_furthest_content() {
        let file = FileId::new(0);
        let mut builder = ContextBuilder::new(FileSymbols::new(file, TextRange::new(at(0), at(100))));

        let block = builder.open(OpenContext::new(ContextKind::Block, "if", at(10), at(10)));
        let mut decl = Declaration::new("x", DeclKind::Variable, block, TextRange::new(at(14), at(15)));
        decl.range = TextRange::new(at(12), at(30));
        builder.arena_mut().add_decl(decl);
        builder.close(None, at(20));

        let empty = builder.open(OpenContext::new(ContextKind::Block, "else", at(60), at(60)));
        builder.close(None, at(0));

        let arena = builder.finish(at(100));
        assert_eq!(arena.context(block.local).map(|c| c.range.end()), Some(at(30)));
        assert_eq!(arena.context(empty.local).map(|c| c.range), Some(TextRange::empty(at(60))));
    }

    #[test]
    fn test_finish_closes_open_chain() {
        let file = FileId::new(0);
        let mut builder = ContextBuilder::new(FileSymbols::new(file, TextRange::new(at(0), at(80))));
        let outer = builder
            .open(OpenContext::new(ContextKind::Namespace, "A", at(10), at(10)).with_path("A"));
        let inner = builder
            .open(OpenContext::new(ContextKind::Namespace, "B", at(12), at(12)).with_path("A.B"));
        assert_eq!(builder.depth(), 3);

        let arena = builder.finish(at(80));
        assert_eq!(arena.context(outer.local).map(|c| c.range.end()), Some(at(80)));
        assert_eq!(arena.context(inner.local).map(|c| c.range.end()), Some(at(80)));
        assert_eq!(arena.namespace_contexts("A.B").collect::<Vec<_>>(), vec![inner]);
    }
}
