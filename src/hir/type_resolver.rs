//! Resolution of qualified type names and of `this` / `super`.
//!
//! The resolver itself never reports anything. It returns which segment
//! failed so the use builder can place an "Unknown type" diagnostic on
//! exactly that segment, and the declaration each resolved segment names so
//! the use builder can record uses for them.

use crate::base::TextSize;
use crate::syntax::ast::QualifiedName;

use super::ids::{ContextId, DeclId};
use super::lookup::LookupMode;
use super::store::SymbolView;
use super::symbols::DeclKind;
use super::ty::Ty;

/// Outcome of resolving one qualified name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedType {
    pub ty: Ty,
    /// The declaration of every segment that resolved, in order.
    pub segments: Vec<DeclId>,
    /// Index of the first segment that did not resolve.
    pub failed_at: Option<usize>,
}

impl ResolvedType {
    fn failed(segments: Vec<DeclId>, index: usize) -> Self {
        Self {
            ty: Ty::Unknown,
            segments,
            failed_at: Some(index),
        }
    }

    /// The declaration the whole name resolved to.
    pub fn decl(&self) -> Option<DeclId> {
        match self.failed_at {
            None => self.segments.last().copied(),
            Some(_) => None,
        }
    }
}

/// Resolves type names as seen from one context.
pub struct TypeResolver<'a> {
    view: SymbolView<'a>,
    ctx: ContextId,
    pos: Option<TextSize>,
    allow_void: bool,
}

impl<'a> TypeResolver<'a> {
    pub fn new(view: SymbolView<'a>, ctx: ContextId) -> Self {
        Self {
            view,
            ctx,
            pos: None,
            allow_void: false,
        }
    }

    /// Only see declarations made before `pos` in statement-ordered contexts.
    pub fn at(mut self, pos: TextSize) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Accept `void`, for function return types.
    pub fn allow_void(mut self) -> Self {
        self.allow_void = true;
        self
    }

    pub fn resolve(&self, name: &QualifiedName) -> ResolvedType {
        if name.segments.is_empty() {
            return ResolvedType::failed(Vec::new(), 0);
        }
        if self.allow_void && name.is_void() {
            return ResolvedType {
                ty: Ty::Void,
                segments: Vec::new(),
                failed_at: None,
            };
        }

        let (mut segments, failed_at) = self.walk(name);
        if let Some(index) = failed_at {
            return ResolvedType::failed(segments, index);
        }
        let Some(&last) = segments.last() else {
            return ResolvedType::failed(segments, 0);
        };
        match self.view.decl(last).map(|d| d.kind) {
            Some(DeclKind::Namespace) | None => {
                let index = segments.len() - 1;
                segments.pop();
                ResolvedType::failed(segments, index)
            }
            Some(_) => ResolvedType {
                ty: self.view.structure_type(last),
                segments,
                failed_at: None,
            },
        }
    }

    /// Resolve a dotted namespace path such as the operand of `pin`. The
    /// result carries no type; its declaration is the last namespace.
    pub fn resolve_namespace(&self, name: &QualifiedName) -> ResolvedType {
        let (mut segments, failed_at) = self.walk(name);
        if let Some(index) = failed_at {
            return ResolvedType::failed(segments, index);
        }
        match segments.last().and_then(|&d| self.view.decl(d)) {
            Some(decl) if decl.kind == DeclKind::Namespace => ResolvedType {
                ty: Ty::Unknown,
                segments,
                failed_at: None,
            },
            _ => {
                let index = segments.len().saturating_sub(1);
                segments.pop();
                ResolvedType::failed(segments, index)
            }
        }
    }

    /// Resolve segment by segment, each from the inner context of the
    /// previous one. Stops at the first segment that finds nothing.
    fn walk(&self, name: &QualifiedName) -> (Vec<DeclId>, Option<usize>) {
        let mut segments: Vec<DeclId> = Vec::with_capacity(name.segments.len());
        for (i, segment) in name.segments.iter().enumerate() {
            let found = match segments.last() {
                None => self
                    .view
                    .lookup_with_auto_this(self.ctx, &segment.text, self.pos, LookupMode::Types),
                Some(&prev) => match self.view.decl(prev).and_then(|d| d.inner) {
                    Some(scope) => self
                        .view
                        .members_of(scope, &segment.text, LookupMode::Types, self.ctx.file),
                    None => Vec::new(),
                },
            };
            match found.last() {
                Some(&decl) => segments.push(decl),
                None => return (segments, Some(i)),
            }
        }
        (segments, None)
    }

    /// The type of `this`: the nearest enclosing class or interface.
    pub fn this_type(&self) -> (Option<DeclId>, Ty) {
        match self.view.enclosing_class(self.ctx) {
            Some(class) => (Some(class), self.view.structure_type(class)),
            None => (None, Ty::Unknown),
        }
    }

    /// The type of `super`: the superclass of the enclosing class, or
    /// `Unknown` when there is none.
    pub fn super_type(&self) -> (Option<DeclId>, Ty) {
        let Some(class) = self.view.enclosing_class(self.ctx).and_then(|c| self.view.decl(c)) else {
            return (None, Ty::Unknown);
        };
        let Some(base) = class.superclass() else {
            return (None, Ty::Unknown);
        };
        match self.view.class_decl_of(base) {
            Some(id) if self.view.decl(id).is_some_and(|d| d.kind != DeclKind::Interface) => {
                (Some(id), base.clone())
            }
            _ => (None, Ty::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FileId, TextRange};
    use crate::hir::store::SymbolStore;
    use crate::hir::symbols::{BaseClass, Context, ContextKind, Declaration, FileSymbols};
    use crate::syntax::ast::Ident;

    fn r(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    fn qn(path: &str) -> QualifiedName {
        QualifiedName {
            segments: path.split('.').map(|s| Ident::new(s, r(0, s.len() as u32))).collect(),
        }
    }

    fn scope(kind: ContextKind, range: TextRange, owner: Option<DeclId>, path: Option<&str>) -> Context {
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
            path: path.map(Into::into),
        }
    }

    /// namespace Game; class Base; class Player extends Base { class Stats }
    fn sample() -> (FileSymbols, ContextId) {
        let file = FileId::new(0);
        let top = ContextId::top(file);
        let mut arena = FileSymbols::new(file, r(0, 300));

        let ns = arena.add_decl(Declaration::new("Game", DeclKind::Namespace, top, r(10, 14)));
        let ns_ctx = arena.add_context(top, scope(ContextKind::Namespace, r(10, 300), None, Some("Game")));
        arena.decl_mut(ns.local).expect("ns").inner = Some(ns_ctx);

        let base = arena.add_decl(Declaration::new("Base", DeclKind::Class, ns_ctx, r(20, 24)));
        let base_ctx = arena.add_context(ns_ctx, scope(ContextKind::Type, r(25, 40), Some(base), None));
        arena.decl_mut(base.local).expect("base").inner = Some(base_ctx);

        let player = arena.add_decl(Declaration::new("Player", DeclKind::Class, ns_ctx, r(50, 56)));
        let player_ctx = arena.add_context(ns_ctx, scope(ContextKind::Type, r(60, 200), Some(player), None));
        {
            let decl = arena.decl_mut(player.local).expect("player");
            decl.inner = Some(player_ctx);
            decl.bases.push(BaseClass::superclass(Ty::Structure(base)));
        }
        let stats = arena.add_decl(Declaration::new("Stats", DeclKind::Class, player_ctx, r(70, 75)));
        let stats_ctx = arena.add_context(player_ctx, scope(ContextKind::Type, r(76, 90), Some(stats), None));
        arena.decl_mut(stats.local).expect("stats").inner = Some(stats_ctx);

        (arena, player_ctx)
    }

    #[test]
    fn test_resolves_dotted_names() {
        let (arena, player_ctx) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);
        let resolver = TypeResolver::new(view, ContextId::top(arena.file));

        let resolved = resolver.resolve(&qn("Game.Player.Stats"));
        assert_eq!(resolved.failed_at, None);
        assert_eq!(resolved.segments.len(), 3);
        assert!(matches!(resolved.ty, Ty::Structure(_)));

        let inner = TypeResolver::new(view, player_ctx).resolve(&qn("Stats"));
        assert_eq!(inner.decl(), resolved.decl());
    }

    #[test]
    fn test_reports_failing_segment() {
        let (arena, _) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);
        let resolver = TypeResolver::new(view, ContextId::top(arena.file));

        let resolved = resolver.resolve(&qn("Game.Missing"));
        assert_eq!(resolved.ty, Ty::Unknown);
        assert_eq!(resolved.failed_at, Some(1));
        assert_eq!(resolved.segments.len(), 1);

        let namespace_only = resolver.resolve(&qn("Game"));
        assert_eq!(namespace_only.failed_at, Some(0));
        assert!(resolver.resolve_namespace(&qn("Game")).decl().is_some());
        assert_eq!(resolver.resolve_namespace(&qn("Game.Player")).failed_at, Some(1));
    }

    #[test]
    fn test_void_only_where_allowed() {
        let (arena, _) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);
        let top = ContextId::top(arena.file);

        assert_eq!(TypeResolver::new(view, top).allow_void().resolve(&qn("void")).ty, Ty::Void);
        assert_eq!(TypeResolver::new(view, top).resolve(&qn("void")).failed_at, Some(0));
    }

    #[test]
    fn test_this_and_super() {
        let (arena, player_ctx) = sample();
        let store = SymbolStore::new();
        let view = store.view_with(&arena);
        let resolver = TypeResolver::new(view, player_ctx);

        let (this_decl, _) = resolver.this_type();
        assert_eq!(view.decl(this_decl.expect("this")).map(|d| d.name.as_str()), Some("Player"));
        let (super_decl, super_ty) = resolver.super_type();
        assert_eq!(view.decl(super_decl.expect("super")).map(|d| d.name.as_str()), Some("Base"));
        assert!(matches!(super_ty, Ty::Structure(_)));

        let top = TypeResolver::new(view, ContextId::top(arena.file));
        assert_eq!(top.super_type(), (None, Ty::Unknown));
    }
}
