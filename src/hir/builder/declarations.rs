//! First pass: contexts, declarations and their types.
//!
//! The pass walks the tree in stages so declarative scopes accept forward
//! references:
//!
//! 1. structure: namespaces, classes, interfaces, enumerations, functions,
//!    parameters and fields, all with unresolved types
//! 2. imports: base-library and include tops, then pinned namespaces
//! 3. signatures: base classes first, then function and field types
//! 4. bodies: block scopes and local variables, in statement order

use crate::base::{FileId, TextRange, TextSize};
use crate::syntax::ast::{
    Body, CatchClause, ClassDecl, EnumDecl, Expr, ExprKind, FuncDecl, Ident, InterfaceDecl, Literal,
    Member, Modifier, Modifiers, NamespaceDecl, QualifiedName, Script, ScriptItem, Stmt, UnaryOp,
    VarDecl,
};

use super::contexts::{ContextBuilder, OpenContext};
use super::BuildOptions;
use crate::hir::ids::{ContextId, DeclId};
use crate::hir::store::SymbolStore;
use crate::hir::symbols::{Access, BaseClass, BaseKind, ContextKind, DeclKind, Declaration, FileSymbols, StorageFlags};
use crate::hir::ty::{Primitive, Ty};
use crate::hir::type_resolver::TypeResolver;

#[derive(Debug)]
pub enum DeclarationOutcome {
    Built(FileSymbols),
    /// The base library is not complete yet; the file has to be analysed
    /// again once these files are published.
    RequiresReparse { missing: Vec<FileId> },
}

/// Types to resolve once every declaration of the file exists.
enum Signature<'t> {
    Class {
        decl: DeclId,
        implicit_root: bool,
        extends: Option<&'t QualifiedName>,
        implements: &'t [QualifiedName],
    },
    Function {
        decl: DeclId,
        node: &'t FuncDecl,
        params: Vec<DeclId>,
    },
    Variables {
        decls: Vec<DeclId>,
        ty: &'t QualifiedName,
    },
}

/// Executable code whose scopes are built last.
enum BodyWork<'t> {
    Function { ctx: ContextId, node: &'t FuncDecl },
    Initializer { ctx: ContextId, expr: &'t Expr },
}

pub struct DeclarationBuilder<'s, 't> {
    store: &'s SymbolStore,
    options: &'s BuildOptions,
    includes: Vec<ContextId>,
    contexts: ContextBuilder,
    pins: Vec<&'t QualifiedName>,
    signatures: Vec<Signature<'t>>,
    bodies: Vec<BodyWork<'t>>,
}

impl<'s, 't> DeclarationBuilder<'s, 't> {
    /// Build into `arena`, a fresh arena for the file holding only its top
    /// context.
    pub fn new(store: &'s SymbolStore, options: &'s BuildOptions, arena: FileSymbols) -> Self {
        Self {
            store,
            options,
            includes: Vec::new(),
            contexts: ContextBuilder::new(arena),
            pins: Vec::new(),
            signatures: Vec::new(),
            bodies: Vec::new(),
        }
    }

    /// Top contexts of include-path files to import.
    pub fn with_includes(mut self, includes: Vec<ContextId>) -> Self {
        self.includes = includes;
        self
    }

    pub fn build(mut self, script: &'t Script) -> DeclarationOutcome {
        let file = self.file();
        if !self.contexts.arena().is_library && !self.store.library_ready() {
            let missing = self.store.missing_library_files();
            tracing::debug!("{} waits for {} base library file(s)", file, missing.len());
            return DeclarationOutcome::RequiresReparse { missing };
        }

        self.declare_script(script);
        self.link_imports();
        self.resolve_signatures();
        self.declare_bodies();

        let arena = self.contexts.finish(script.range.end());
        tracing::debug!(
            "{}: {} declarations in {} contexts",
            file,
            arena.decl_count(),
            arena.context_count()
        );
        DeclarationOutcome::Built(arena)
    }

    fn file(&self) -> FileId {
        self.contexts.arena().file
    }

    fn add_decl(&mut self, decl: Declaration) -> DeclId {
        self.contexts.arena_mut().add_decl(decl)
    }

    fn decl_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.contexts.arena_mut().decl_mut(id.local)
    }

    fn decl_context(&self, id: DeclId) -> ContextId {
        self.contexts
            .arena()
            .decl(id.local)
            .map_or(ContextId::top(id.file), |d| d.context)
    }

    fn resolver(&self, ctx: ContextId) -> TypeResolver<'_> {
        TypeResolver::new(self.store.view_with(self.contexts.arena()), ctx)
    }

    // ========================================================================
    // STRUCTURE
    // ========================================================================

    fn declare_script(&mut self, script: &'t Script) {
        let mut namespace_depth: Option<usize> = None;
        for item in &script.items {
            match item {
                ScriptItem::Requires(_) => {}
                ScriptItem::Pin(pin) => self.pins.push(&pin.name),
                ScriptItem::Namespace(ns) => {
                    if let Some(depth) = namespace_depth.take() {
                        self.contexts.close_to(depth, ns.range.start());
                    }
                    namespace_depth = Some(self.contexts.depth());
                    self.open_namespace(ns);
                }
                ScriptItem::Class(class) => self.declare_class(class),
                ScriptItem::Interface(interface) => self.declare_interface(interface),
                ScriptItem::Enum(enumeration) => self.declare_enum(enumeration),
            }
        }
        self.contexts.close_to(1, script.range.end());
    }

    fn open_namespace(&mut self, ns: &NamespaceDecl) {
        let mut path = String::new();
        for segment in &ns.name.segments {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment.text);

            let mut decl = Declaration::new(
                segment.text.clone(),
                DeclKind::Namespace,
                self.contexts.current(),
                segment.range,
            );
            decl.range = ns.range;
            let id = self.add_decl(decl);
            let start = segment.range.start();
            let ctx = self.contexts.open(
                OpenContext::new(ContextKind::Namespace, segment.text.clone(), start, start)
                    .owned_by(id)
                    .with_path(path.as_str()),
            );
            if let Some(decl) = self.decl_mut(id) {
                decl.inner = Some(ctx);
            }
        }
    }

    /// Declare a class-like declaration and open its member context.
    fn open_type(
        &mut self,
        kind: DeclKind,
        name: &Ident,
        modifiers: &Modifiers,
        range: TextRange,
        body_start: TextSize,
    ) -> DeclId {
        let scope = self.contexts.current();
        let mut decl = Declaration::new(name.text.clone(), kind, scope, name.range);
        decl.range = range;
        decl.access = access_of(modifiers);
        decl.storage = storage_of(modifiers);
        if kind == DeclKind::Interface {
            decl.storage.is_abstract = true;
        }
        let id = self.add_decl(decl);

        let ty = self.type_of_class(id, scope, &name.text);
        let ctx = self.contexts.open(
            OpenContext::new(ContextKind::Type, name.text.clone(), body_start, range.start()).owned_by(id),
        );
        if let Some(decl) = self.decl_mut(id) {
            decl.inner = Some(ctx);
            decl.ty = ty;
        }
        id
    }

    /// Top-level library classes named like a primitive stand for it.
    fn type_of_class(&self, id: DeclId, scope: ContextId, name: &str) -> Ty {
        if self.contexts.arena().is_library && scope.is_top() {
            if let Some(primitive) = Primitive::from_class_name(name) {
                return Ty::Primitive(primitive);
            }
        }
        Ty::Structure(id)
    }

    fn declare_class(&mut self, class: &'t ClassDecl) {
        let id = self.open_type(DeclKind::Class, &class.name, &class.modifiers, class.range, class.body_start);
        self.signatures.push(Signature::Class {
            decl: id,
            implicit_root: class.extends.is_none(),
            extends: class.extends.as_ref(),
            implements: &class.implements,
        });
        for member in &class.members {
            self.declare_member(member, false);
        }
        self.contexts.close(class.end, class.range.end());
    }

    fn declare_interface(&mut self, interface: &'t InterfaceDecl) {
        let id = self.open_type(
            DeclKind::Interface,
            &interface.name,
            &interface.modifiers,
            interface.range,
            interface.body_start,
        );
        self.signatures.push(Signature::Class {
            decl: id,
            implicit_root: false,
            extends: None,
            implements: &interface.implements,
        });
        for member in &interface.members {
            self.declare_member(member, true);
        }
        self.contexts.close(interface.end, interface.range.end());
    }

    fn declare_enum(&mut self, enumeration: &'t EnumDecl) {
        self.open_type(
            DeclKind::Enum,
            &enumeration.name,
            &enumeration.modifiers,
            enumeration.range,
            enumeration.body_start,
        );
        let scope = self.contexts.current();
        let mut next = 0i64;
        for member in &enumeration.members {
            // An initializer that is not a constant leaves the value unknown;
            // the counter then moves on by one.
            let value = match &member.value {
                Some(init) => constant_value(init),
                None => Some(next),
            };
            next = value.unwrap_or(next).wrapping_add(1);

            let mut decl = Declaration::new(member.name.text.clone(), DeclKind::EnumMember, scope, member.name.range);
            decl.range = member.range;
            decl.ty = Ty::Primitive(Primitive::Int);
            decl.storage.is_static = true;
            decl.storage.is_fixed = true;
            decl.enum_value = value;
            self.add_decl(decl);
        }
        self.contexts.close(enumeration.end, enumeration.range.end());
    }

    fn declare_member(&mut self, member: &'t Member, in_interface: bool) {
        match member {
            Member::Class(class) => self.declare_class(class),
            Member::Interface(interface) => self.declare_interface(interface),
            Member::Enum(enumeration) => self.declare_enum(enumeration),
            Member::Function(func) => self.declare_function(func, in_interface),
            Member::Variable(var) => self.declare_fields(var),
        }
    }

    fn declare_function(&mut self, func: &'t FuncDecl, in_interface: bool) {
        let scope = self.contexts.current();
        let mut decl = Declaration::new(func.name.text.clone(), DeclKind::Function, scope, func.name.range);
        decl.range = func.range;
        decl.access = access_of(&func.modifiers);
        decl.storage = storage_of(&func.modifiers);
        if in_interface {
            decl.storage.is_abstract = true;
        }
        let id = self.add_decl(decl);

        let ctx = self.contexts.open(
            OpenContext::new(ContextKind::Function, func.name.text.clone(), func.params_start, func.range.start())
                .owned_by(id),
        );
        let params = func
            .params
            .iter()
            .map(|param| {
                let mut decl = Declaration::new(param.name.text.clone(), DeclKind::Parameter, ctx, param.name.range);
                decl.range = param.range;
                self.add_decl(decl)
            })
            .collect();
        let end = match &func.body {
            Some(body) => body.end,
            None => Some(func.range.end()),
        };
        self.contexts.close(end, func.range.end());

        if let Some(decl) = self.decl_mut(id) {
            decl.inner = Some(ctx);
        }
        self.signatures.push(Signature::Function {
            decl: id,
            node: func,
            params,
        });
        if func.body.is_some() || func.ctor_call.is_some() {
            self.bodies.push(BodyWork::Function { ctx, node: func });
        }
    }

    fn declare_fields(&mut self, var: &'t VarDecl) {
        let scope = self.contexts.current();
        let mut decls = Vec::with_capacity(var.declarators.len());
        for declarator in &var.declarators {
            let mut decl = Declaration::new(declarator.name.text.clone(), DeclKind::Variable, scope, declarator.name.range);
            decl.range = declarator.range;
            decl.access = access_of(&var.modifiers);
            decl.storage = storage_of(&var.modifiers);
            decls.push(self.add_decl(decl));
            if let Some(init) = &declarator.init {
                self.bodies.push(BodyWork::Initializer { ctx: scope, expr: init });
            }
        }
        self.signatures.push(Signature::Variables { decls, ty: &var.ty });
    }

    // ========================================================================
    // IMPORTS
    // ========================================================================

    fn link_imports(&mut self) {
        let file = self.file();
        let mut imports: Vec<ContextId> = self
            .store
            .library_tops()
            .into_iter()
            .filter(|ctx| ctx.file != file)
            .collect();
        for &include in &self.includes {
            if include.file != file && !imports.contains(&include) {
                imports.push(include);
            }
        }
        self.contexts.arena_mut().top_mut().imports = imports;

        let pins = std::mem::take(&mut self.pins);
        let mut pinned: Vec<ContextId> = Vec::new();
        {
            let view = self.store.view_with(self.contexts.arena());
            let resolver = TypeResolver::new(view, ContextId::top(file));
            for pin in pins {
                let Some(path) = resolver
                    .resolve_namespace(pin)
                    .decl()
                    .and_then(|ns| view.decl(ns)?.inner)
                    .and_then(|inner| view.context(inner)?.path.clone())
                else {
                    continue;
                };
                for ctx in view.namespace_contexts(&path, file) {
                    if !pinned.contains(&ctx) {
                        pinned.push(ctx);
                    }
                }
            }
        }

        let top = self.contexts.arena_mut().top_mut();
        pinned.append(&mut top.imports);
        top.imports = pinned;
    }

    // ========================================================================
    // SIGNATURES
    // ========================================================================

    fn resolve_signatures(&mut self) {
        let signatures = std::mem::take(&mut self.signatures);
        let (classes, members): (Vec<_>, Vec<_>) = signatures
            .into_iter()
            .partition(|s| matches!(s, Signature::Class { .. }));

        for signature in classes.into_iter().chain(members) {
            match signature {
                Signature::Class {
                    decl,
                    implicit_root,
                    extends,
                    implements,
                } => self.link_bases(decl, implicit_root, extends, implements),
                Signature::Function { decl, node, params } => self.resolve_function(decl, node, &params),
                Signature::Variables { decls, ty } => {
                    let Some(&first) = decls.first() else {
                        continue;
                    };
                    let resolved = self.resolver(self.decl_context(first)).resolve(ty).ty;
                    for id in decls {
                        if let Some(decl) = self.decl_mut(id) {
                            decl.ty = resolved.clone();
                        }
                    }
                }
            }
        }
    }

    fn link_bases(
        &mut self,
        id: DeclId,
        implicit_root: bool,
        extends: Option<&QualifiedName>,
        implements: &[QualifiedName],
    ) {
        let scope = self.decl_context(id);
        let mut bases = Vec::new();
        {
            let view = self.store.view_with(self.contexts.arena());
            let resolver = TypeResolver::new(view, scope);
            let mut link = |ty: Ty, kind: BaseKind| {
                if matches!(ty, Ty::Structure(_)) {
                    bases.push(BaseClass {
                        ty,
                        kind,
                        access: Access::Public,
                    });
                }
            };
            match extends {
                Some(name) => link(resolver.resolve(name).ty, BaseKind::Superclass),
                None if implicit_root => {
                    if let Some(root) = view.library_class(&self.options.root_class).filter(|&r| r != id) {
                        link(view.structure_type(root), BaseKind::Superclass);
                    }
                }
                None => {}
            }
            for name in implements {
                link(resolver.resolve(name).ty, BaseKind::Interface);
            }
        }
        if let Some(decl) = self.decl_mut(id) {
            decl.bases = bases;
        }
    }

    fn resolve_function(&mut self, id: DeclId, node: &FuncDecl, params: &[DeclId]) {
        let scope = self.decl_context(id);
        let (ret, param_types) = {
            let view = self.store.view_with(self.contexts.arena());
            let ret = match &node.return_type {
                Some(name) => TypeResolver::new(view, scope).allow_void().resolve(name).ty,
                None => match view.context(scope).and_then(|c| c.owner) {
                    Some(class) => view.structure_type(class),
                    None => Ty::Unknown,
                },
            };
            let param_types: Vec<Ty> = node
                .params
                .iter()
                .map(|p| TypeResolver::new(view, scope).resolve(&p.ty).ty)
                .collect();
            (ret, param_types)
        };

        for (&param, ty) in params.iter().zip(&param_types) {
            if let Some(decl) = self.decl_mut(param) {
                decl.ty = ty.clone();
            }
        }
        if let Some(decl) = self.decl_mut(id) {
            decl.ty = Ty::function(ret, param_types);
        }
    }

    // ========================================================================
    // BODIES
    // ========================================================================

    fn declare_bodies(&mut self) {
        let bodies = std::mem::take(&mut self.bodies);
        for work in bodies {
            match work {
                BodyWork::Function { ctx, node } => {
                    self.contexts.enter(ctx);
                    if let Some(call) = &node.ctor_call {
                        for arg in &call.args {
                            self.walk_expr(arg);
                        }
                    }
                    if let Some(body) = &node.body {
                        self.walk_stmts(body);
                    }
                    self.contexts.leave();
                }
                BodyWork::Initializer { ctx, expr } => {
                    self.contexts.enter(ctx);
                    self.walk_expr(expr);
                    self.contexts.leave();
                }
            }
        }
    }

    fn walk_stmts(&mut self, body: &Body) {
        for stmt in &body.stmts {
            self.walk_stmt(stmt);
        }
    }

    fn block(&mut self, label: &'static str, body: &Body) {
        self.contexts
            .open(OpenContext::new(ContextKind::Block, label, body.start, body.start));
        self.walk_stmts(body);
        self.contexts.close(body.end, body.content_end());
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(var) => self.declare_locals(var),
            Stmt::If(s) => {
                self.walk_expr(&s.cond);
                self.block("if", &s.then_body);
                for elif in &s.elifs {
                    self.walk_expr(&elif.cond);
                    self.block("elif", &elif.body);
                }
                if let Some(body) = &s.else_body {
                    self.block("else", body);
                }
            }
            Stmt::Select(s) => {
                self.walk_expr(&s.value);
                for case in &s.cases {
                    for value in &case.values {
                        self.walk_expr(value);
                    }
                    self.block("case", &case.body);
                }
                if let Some(body) = &s.else_body {
                    self.block("else", body);
                }
            }
            Stmt::For(s) => {
                self.walk_expr(&s.var);
                self.walk_expr(&s.from);
                self.walk_expr(&s.to);
                if let Some(step) = &s.step {
                    self.walk_expr(step);
                }
                self.block("for", &s.body);
            }
            Stmt::While(s) => {
                self.walk_expr(&s.cond);
                self.block("while", &s.body);
            }
            Stmt::Try(s) => {
                self.block("try", &s.body);
                for catch in &s.catches {
                    self.catch_block(catch);
                }
            }
            Stmt::Return(Some(expr), _) | Stmt::Throw(Some(expr), _) | Stmt::Expr(expr) => self.walk_expr(expr),
            Stmt::Return(None, _) | Stmt::Throw(None, _) | Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn declare_locals(&mut self, var: &VarDecl) {
        let scope = self.contexts.current();
        let ty = self.resolver(scope).at(var.range.start()).resolve(&var.ty).ty;
        for declarator in &var.declarators {
            let mut decl = Declaration::new(declarator.name.text.clone(), DeclKind::Variable, scope, declarator.name.range);
            decl.range = declarator.range;
            decl.ty = ty.clone();
            self.add_decl(decl);
            if let Some(init) = &declarator.init {
                self.walk_expr(init);
            }
        }
    }

    fn catch_block(&mut self, catch: &CatchClause) {
        let start = catch.body.start;
        let ctx = self
            .contexts
            .open(OpenContext::new(ContextKind::Block, "catch", start, start));
        let ty = self.resolver(ctx).at(start).resolve(&catch.ty).ty;
        let mut decl = Declaration::new(catch.var.text.clone(), DeclKind::Variable, ctx, catch.var.range);
        decl.range = catch.ty.range().cover(catch.var.range);
        decl.ty = ty;
        self.add_decl(decl);
        self.walk_stmts(&catch.body);
        self.contexts.close(catch.body.end, catch.body.content_end());
    }

    /// Expressions only matter here for the `block` closures they contain.
    fn walk_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::This | ExprKind::Super => {}
            ExprKind::Member { object, args, .. } => {
                if let Some(object) = object {
                    self.walk_expr(object);
                }
                for arg in args.iter().flatten() {
                    self.walk_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs);
                self.walk_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.walk_expr(operand),
            ExprKind::Special { expr, .. } => self.walk_expr(expr),
            ExprKind::InlineIf { cond, if_true, if_false } => {
                self.walk_expr(cond);
                self.walk_expr(if_true);
                self.walk_expr(if_false);
            }
            ExprKind::Block { params, body } => {
                let start = expr.range.start();
                let ctx = self
                    .contexts
                    .open(OpenContext::new(ContextKind::Block, "block", start, start));
                for param in params {
                    let ty = self.resolver(ctx).at(param.range.start()).resolve(&param.ty).ty;
                    let mut decl = Declaration::new(param.name.text.clone(), DeclKind::Parameter, ctx, param.name.range);
                    decl.range = param.range;
                    decl.ty = ty;
                    self.add_decl(decl);
                }
                self.walk_stmts(body);
                self.contexts.close(body.end, expr.range.end());
            }
        }
    }
}

fn access_of(modifiers: &Modifiers) -> Access {
    match modifiers.access() {
        Some(Modifier::Protected) => Access::Protected,
        Some(Modifier::Private) => Access::Private,
        _ => Access::Public,
    }
}

fn storage_of(modifiers: &Modifiers) -> StorageFlags {
    StorageFlags {
        is_static: modifiers.has(Modifier::Static),
        is_abstract: modifiers.has(Modifier::Abstract),
        is_fixed: modifiers.has(Modifier::Fixed),
        is_native: modifiers.has(Modifier::Native),
    }
}

/// Integer value of a constant enumeration initializer: an integer or byte
/// literal, optionally negated. Anything else has no value.
fn constant_value(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(value)) => Some(*value),
        ExprKind::Literal(Literal::Byte(value)) => Some(i64::from(*value)),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
            ..
        } => constant_value(operand).map(i64::wrapping_neg),
        _ => None,
    }
}
