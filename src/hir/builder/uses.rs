//! Second pass: uses, expression types and semantic diagnostics.
//!
//! The pass re-walks the tree and finds the contexts the declaration pass
//! created through the syntax node that introduced each of them. Every
//! expression gets a [`Value`]; operators are calls to operator-named
//! functions on the left operand's class. Values of unknown type propagate
//! without further diagnostics.

use crate::base::{FileId, TextRange, TextSize};
use crate::syntax::ast::{
    BinaryOp, Body, ClassDecl, CtorCall, CtorCallKind, EnumDecl, Expr, ExprKind, FuncDecl, Ident,
    InterfaceDecl, Literal, Member, PinDecl, QualifiedName, Script, ScriptItem, SpecialOp, Stmt,
    VarDecl,
};

use super::BuildOptions;
use crate::hir::diagnostics::{codes, Diagnostic, DiagnosticCollector};
use crate::hir::ids::{ContextId, DeclId};
use crate::hir::lookup::LookupMode;
use crate::hir::overload::{describe_call, describe_candidate, resolve_overload, Overload};
use crate::hir::store::SymbolView;
use crate::hir::symbols::{DeclKind, FileSymbols, Use};
use crate::hir::ty::{Primitive, Ty};
use crate::hir::type_resolver::TypeResolver;

/// Everything the pass found, published together afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UseBatch {
    pub uses: Vec<Use>,
    pub diagnostics: Vec<Diagnostic>,
}

/// What an expression evaluates to.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Value {
    ty: Ty,
    kind: ValueKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ValueKind {
    /// An instance; members come from the class of its type.
    Object,
    /// A class, interface or enumeration named in an expression.
    Type(ContextId),
    Namespace(ContextId),
}

impl Value {
    fn object(ty: Ty) -> Self {
        Self {
            ty,
            kind: ValueKind::Object,
        }
    }

    fn unknown() -> Self {
        Self::object(Ty::Unknown)
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CallKind {
    Function,
    Constructor,
}

impl CallKind {
    fn noun(self) -> &'static str {
        match self {
            CallKind::Function => "function",
            CallKind::Constructor => "constructor",
        }
    }
}

pub struct UseBuilder<'a> {
    view: SymbolView<'a>,
    arena: &'a FileSymbols,
    options: &'a BuildOptions,
    uses: Vec<Use>,
    diagnostics: DiagnosticCollector,
}

impl<'a> UseBuilder<'a> {
    /// `view` has to see `arena` as the file's symbols, see
    /// [`SymbolStore::view_with`](crate::hir::SymbolStore::view_with).
    pub fn new(view: SymbolView<'a>, arena: &'a FileSymbols, options: &'a BuildOptions) -> Self {
        Self {
            view,
            arena,
            options,
            uses: Vec::new(),
            diagnostics: DiagnosticCollector::new(arena.file),
        }
    }

    fn file(&self) -> FileId {
        self.arena.file
    }

    pub fn build(mut self, script: &Script) -> UseBatch {
        let top = ContextId::top(self.file());
        let mut scope = top;
        for item in &script.items {
            match item {
                ScriptItem::Requires(_) => {}
                ScriptItem::Pin(pin) => self.pin(pin),
                ScriptItem::Namespace(ns) => {
                    scope = top;
                    for segment in &ns.name.segments {
                        match self.arena.child_at_origin(scope, segment.range.start()) {
                            Some(ctx) => scope = ctx,
                            None => break,
                        }
                    }
                }
                ScriptItem::Class(class) => self.class(scope, class),
                ScriptItem::Interface(interface) => self.interface(scope, interface),
                ScriptItem::Enum(enumeration) => self.enumeration(scope, enumeration),
            }
        }
        tracing::debug!(
            "{}: {} uses, {} diagnostics",
            self.file(),
            self.uses.len(),
            self.diagnostics.diagnostics().len()
        );
        UseBatch {
            uses: self.uses,
            diagnostics: self.diagnostics.take(),
        }
    }

    fn add_use(&mut self, range: TextRange, decl: DeclId) {
        self.uses.push(Use {
            file: self.file(),
            range,
            decl,
        });
    }

    // ========================================================================
    // DECLARATIONS
    // ========================================================================

    fn pin(&mut self, pin: &PinDecl) {
        let resolved = TypeResolver::new(self.view, ContextId::top(self.file())).resolve_namespace(&pin.name);
        self.record_segments(&pin.name, &resolved.segments);
        if let Some(segment) = resolved.failed_at.and_then(|i| pin.name.segments.get(i)) {
            self.diagnostics.unknown(segment.range, "namespace", &segment.text);
        }
    }

    /// Resolve a type name, recording uses and reporting the first segment
    /// that does not resolve.
    fn type_ref(&mut self, ctx: ContextId, name: &QualifiedName, pos: Option<TextSize>, allow_void: bool) -> Ty {
        let mut resolver = TypeResolver::new(self.view, ctx);
        if let Some(pos) = pos {
            resolver = resolver.at(pos);
        }
        if allow_void {
            resolver = resolver.allow_void();
        }
        let resolved = resolver.resolve(name);
        self.record_segments(name, &resolved.segments);
        if let Some(segment) = resolved.failed_at.and_then(|i| name.segments.get(i)) {
            self.diagnostics.unknown(segment.range, "type", &segment.text);
        }
        resolved.ty
    }

    fn record_segments(&mut self, name: &QualifiedName, decls: &[DeclId]) {
        for (segment, &decl) in name.segments.iter().zip(decls) {
            self.add_use(segment.range, decl);
        }
    }

    fn class(&mut self, scope: ContextId, class: &ClassDecl) {
        let Some(ctx) = self.arena.child_at_origin(scope, class.range.start()) else {
            tracing::warn!("{}: no context for class {}", self.file(), class.name.text);
            return;
        };
        if let Some(extends) = &class.extends {
            let ty = self.type_ref(scope, extends, None, false);
            if !ty.is_unknown() && !matches!(ty, Ty::Structure(_)) {
                let found = self.view.type_name(&ty);
                self.diagnostics.wrong_kind(extends.range(), "class", &found);
            }
        }
        for name in &class.implements {
            self.type_ref(scope, name, None, false);
        }
        for member in &class.members {
            self.member(ctx, member);
        }
    }

    fn interface(&mut self, scope: ContextId, interface: &InterfaceDecl) {
        let Some(ctx) = self.arena.child_at_origin(scope, interface.range.start()) else {
            return;
        };
        for name in &interface.implements {
            self.type_ref(scope, name, None, false);
        }
        for member in &interface.members {
            self.member(ctx, member);
        }
    }

    fn enumeration(&mut self, scope: ContextId, enumeration: &EnumDecl) {
        let Some(ctx) = self.arena.child_at_origin(scope, enumeration.range.start()) else {
            return;
        };
        for member in &enumeration.members {
            if let Some(value) = &member.value {
                self.expr(ctx, value);
            }
        }
    }

    fn member(&mut self, class_ctx: ContextId, member: &Member) {
        match member {
            Member::Class(class) => self.class(class_ctx, class),
            Member::Interface(interface) => self.interface(class_ctx, interface),
            Member::Enum(enumeration) => self.enumeration(class_ctx, enumeration),
            Member::Function(func) => self.function(class_ctx, func),
            Member::Variable(var) => self.variables(class_ctx, var, None),
        }
    }

    fn function(&mut self, class_ctx: ContextId, func: &FuncDecl) {
        let Some(ctx) = self.arena.child_at_origin(class_ctx, func.range.start()) else {
            return;
        };
        if let Some(ret) = &func.return_type {
            self.type_ref(class_ctx, ret, None, true);
        }
        for param in &func.params {
            self.type_ref(class_ctx, &param.ty, None, false);
        }
        if let Some(call) = &func.ctor_call {
            self.constructor_call(ctx, call);
        }
        if let Some(body) = &func.body {
            self.stmts(ctx, body);
        }
    }

    /// `super(...)` or `this(...)` after a constructor's parameter list.
    fn constructor_call(&mut self, ctx: ContextId, call: &CtorCall) {
        let args: Vec<Ty> = call.args.iter().map(|arg| self.expr(ctx, arg).ty).collect();
        let resolver = TypeResolver::new(self.view, ctx);
        let (class, keyword) = match call.kind {
            CtorCallKind::Super => (resolver.super_type().0, "super"),
            CtorCallKind::This => (resolver.this_type().0, "this"),
        };
        let Some(class_ctx) = class.and_then(|c| self.view.decl(c)?.inner) else {
            return;
        };
        let candidates = self.view.local_declarations(class_ctx, "new", None, LookupMode::Functions);
        if candidates.is_empty() && args.is_empty() {
            return;
        }
        let owner = self.owner_prefix(Some(class_ctx), ctx);
        self.call(call.keyword, keyword, &owner, candidates, &args, CallKind::Constructor);
    }

    fn variables(&mut self, ctx: ContextId, var: &VarDecl, pos: Option<TextSize>) {
        let ty = self.type_ref(ctx, &var.ty, pos, false);
        for declarator in &var.declarators {
            if let Some(init) = &declarator.init {
                let value = self.expr(ctx, init);
                self.check_assignable(&value.ty, &ty, init.range);
            }
        }
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    fn stmts(&mut self, ctx: ContextId, body: &Body) {
        for stmt in &body.stmts {
            self.stmt(ctx, stmt);
        }
    }

    fn block(&mut self, ctx: ContextId, body: &Body) {
        let inner = self.arena.child_at_origin(ctx, body.start).unwrap_or(ctx);
        self.stmts(inner, body);
    }

    fn stmt(&mut self, ctx: ContextId, stmt: &Stmt) {
        match stmt {
            Stmt::Var(var) => self.variables(ctx, var, Some(var.range.start())),
            Stmt::If(s) => {
                self.condition(ctx, &s.cond);
                self.block(ctx, &s.then_body);
                for elif in &s.elifs {
                    self.condition(ctx, &elif.cond);
                    self.block(ctx, &elif.body);
                }
                if let Some(body) = &s.else_body {
                    self.block(ctx, body);
                }
            }
            Stmt::Select(s) => {
                self.expr(ctx, &s.value);
                for case in &s.cases {
                    for value in &case.values {
                        self.expr(ctx, value);
                    }
                    self.block(ctx, &case.body);
                }
                if let Some(body) = &s.else_body {
                    self.block(ctx, body);
                }
            }
            Stmt::For(s) => {
                let var = self.expr(ctx, &s.var);
                for bound in [Some(&s.from), Some(&s.to), s.step.as_ref()].into_iter().flatten() {
                    let value = self.expr(ctx, bound);
                    self.check_assignable(&value.ty, &var.ty, bound.range);
                }
                self.block(ctx, &s.body);
            }
            Stmt::While(s) => {
                self.condition(ctx, &s.cond);
                self.block(ctx, &s.body);
            }
            Stmt::Try(s) => {
                self.block(ctx, &s.body);
                for catch in &s.catches {
                    let start = catch.body.start;
                    let inner = self.arena.child_at_origin(ctx, start).unwrap_or(ctx);
                    self.type_ref(inner, &catch.ty, Some(start), false);
                    self.stmts(inner, &catch.body);
                }
            }
            Stmt::Return(Some(expr), _) | Stmt::Throw(Some(expr), _) | Stmt::Expr(expr) => {
                self.expr(ctx, expr);
            }
            Stmt::Return(None, _) | Stmt::Throw(None, _) | Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn condition(&mut self, ctx: ContextId, cond: &Expr) {
        let value = self.expr(ctx, cond);
        self.check_assignable(&value.ty, &Ty::Primitive(Primitive::Bool), cond.range);
    }

    fn check_assignable(&mut self, from: &Ty, to: &Ty, range: TextRange) {
        if from.is_unknown() || to.is_unknown() {
            return;
        }
        if !self.view.is_castable(from, to, self.options.cast_limit) {
            let message = format!(
                "Cannot assign object of type {} to {}",
                self.view.type_name(from),
                self.view.type_name(to)
            );
            self.diagnostics.type_mismatch(range, message);
        }
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    fn expr(&mut self, ctx: ContextId, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::Literal(literal) => Value::object(match literal {
                Literal::Byte(_) => Ty::Primitive(Primitive::Byte),
                Literal::Bool(_) => Ty::Primitive(Primitive::Bool),
                Literal::Int(_) => Ty::Primitive(Primitive::Int),
                Literal::Float(_) => Ty::Primitive(Primitive::Float),
                Literal::String(_) => Ty::Primitive(Primitive::String),
                Literal::Null => Ty::Null,
            }),
            ExprKind::This | ExprKind::Super => {
                let resolver = TypeResolver::new(self.view, ctx);
                let (decl, ty) = if matches!(expr.kind, ExprKind::This) {
                    resolver.this_type()
                } else {
                    resolver.super_type()
                };
                if let Some(decl) = decl {
                    self.add_use(expr.range, decl);
                }
                Value::object(ty)
            }
            ExprKind::Member { object, name, args } => {
                self.member_expr(ctx, object.as_deref(), name, args.as_deref())
            }
            ExprKind::Binary {
                op,
                op_range,
                lhs,
                rhs,
            } => {
                let left = self.expr(ctx, lhs);
                let right = self.expr(ctx, rhs);
                if *op == BinaryOp::Assign {
                    self.check_assignable(&right.ty, &left.ty, *op_range);
                    return Value::object(left.ty);
                }
                self.operator_call(ctx, &left, op.function_name(), *op_range, &[right.ty])
            }
            ExprKind::Unary { op, op_range, operand } => {
                let value = self.expr(ctx, operand);
                self.operator_call(ctx, &value, op.function_name(), *op_range, &[])
            }
            ExprKind::Special { op, expr: inner, target } => {
                self.expr(ctx, inner);
                let ty = self.type_ref(ctx, target, Some(expr.range.start()), false);
                match op {
                    SpecialOp::Cast => Value::object(ty),
                    SpecialOp::Castable | SpecialOp::Typeof => Value::object(Ty::Primitive(Primitive::Bool)),
                }
            }
            ExprKind::InlineIf { cond, if_true, if_false } => {
                self.condition(ctx, cond);
                let value = self.expr(ctx, if_true);
                let other = self.expr(ctx, if_false);
                self.check_assignable(&other.ty, &value.ty, if_false.range);
                Value::object(value.ty)
            }
            ExprKind::Block { params, body } => {
                let inner = self.arena.child_at_origin(ctx, expr.range.start()).unwrap_or(ctx);
                for param in params {
                    self.type_ref(inner, &param.ty, Some(param.range.start()), false);
                }
                self.stmts(inner, body);
                let block = self
                    .view
                    .library_class("Block")
                    .map(|id| self.view.structure_type(id))
                    .unwrap_or_default();
                Value::object(block)
            }
        }
    }

    /// Members of a value: its class for objects, the named scope otherwise.
    fn scope_of(&self, value: &Value) -> Option<ContextId> {
        match value.kind {
            ValueKind::Type(ctx) | ValueKind::Namespace(ctx) => Some(ctx),
            ValueKind::Object => self.view.class_context_of(&value.ty),
        }
    }

    fn member_expr(&mut self, ctx: ContextId, object: Option<&Expr>, name: &Ident, args: Option<&[Expr]>) -> Value {
        let (scope, receiver) = match object {
            None => (None, None),
            Some(object) => {
                let value = self.expr(ctx, object);
                match self.scope_of(&value) {
                    Some(scope) => (Some(scope), Some(value)),
                    None => {
                        for arg in args.into_iter().flatten() {
                            self.expr(ctx, arg);
                        }
                        return Value::unknown();
                    }
                }
            }
        };
        let owner = self.owner_prefix(scope, ctx);

        let Some(args) = args else {
            return self.object_ref(ctx, scope, &owner, name);
        };
        let arg_types: Vec<Ty> = args.iter().map(|arg| self.expr(ctx, arg).ty).collect();

        // `Class.new(...)`: constructors are not inherited and yield the class.
        if let (Some(scope), Some(Value { ty, kind: ValueKind::Type(_) })) = (scope, &receiver) {
            if name.text == "new" {
                let candidates = self.view.local_declarations(scope, "new", None, LookupMode::Functions);
                if candidates.is_empty() && arg_types.is_empty() {
                    return Value::object(ty.clone());
                }
                let result = self.call(name.range, &name.text, &owner, candidates, &arg_types, CallKind::Constructor);
                return if result.ty.is_unknown() { result } else { Value::object(ty.clone()) };
            }
        }

        let candidates = match scope {
            None => self.view.lookup_with_auto_this(
                ctx,
                &name.text,
                Some(name.range.start()),
                LookupMode::Functions,
            ),
            Some(scope) => self
                .view
                .members_of(scope, &name.text, LookupMode::Functions, self.file()),
        };
        self.call(name.range, &name.text, &owner, candidates, &arg_types, CallKind::Function)
    }

    /// A name without arguments: a variable, class, namespace or constant.
    fn object_ref(&mut self, ctx: ContextId, scope: Option<ContextId>, owner: &str, name: &Ident) -> Value {
        let found = match scope {
            None => self.view.lookup_with_auto_this(
                ctx,
                &name.text,
                Some(name.range.start()),
                LookupMode::Values,
            ),
            Some(scope) => self
                .view
                .members_of(scope, &name.text, LookupMode::Values, self.file()),
        };
        let Some((id, decl)) = found.last().and_then(|&id| Some((id, self.view.decl(id)?))) else {
            self.diagnostics
                .unknown(name.range, "object", &format!("{owner}{}", name.text));
            return Value::unknown();
        };

        match decl.kind {
            DeclKind::Function => {
                self.diagnostics
                    .wrong_kind(name.range, "object", &format!("function: {owner}{}", name.text));
                Value::unknown()
            }
            DeclKind::Namespace => {
                self.add_use(name.range, id);
                match decl.inner {
                    Some(inner) => Value {
                        ty: Ty::Unknown,
                        kind: ValueKind::Namespace(inner),
                    },
                    None => Value::unknown(),
                }
            }
            DeclKind::Class | DeclKind::Interface | DeclKind::Enum => {
                self.add_use(name.range, id);
                let ty = self.view.structure_type(id);
                match decl.inner {
                    Some(inner) => Value {
                        ty,
                        kind: ValueKind::Type(inner),
                    },
                    None => Value::object(ty),
                }
            }
            DeclKind::EnumMember | DeclKind::Variable | DeclKind::Parameter => {
                self.add_use(name.range, id);
                Value::object(decl.ty.clone())
            }
        }
    }

    fn operator_call(&mut self, ctx: ContextId, operand: &Value, name: &str, range: TextRange, args: &[Ty]) -> Value {
        let Some(scope) = self.scope_of(operand) else {
            return Value::unknown();
        };
        let owner = self.owner_prefix(Some(scope), ctx);
        let candidates = self.view.members_of(scope, name, LookupMode::Functions, self.file());
        self.call(range, name, &owner, candidates, args, CallKind::Function)
    }

    /// Resolve a call among `candidates` and record the use of the chosen
    /// function. The result is its return type.
    fn call(
        &mut self,
        range: TextRange,
        name: &str,
        owner: &str,
        candidates: Vec<DeclId>,
        args: &[Ty],
        kind: CallKind,
    ) -> Value {
        let Some(first) = candidates.first().and_then(|&id| self.view.decl(id)) else {
            self.diagnostics.unknown(range, kind.noun(), &format!("{owner}{name}"));
            return Value::unknown();
        };
        if first.kind != DeclKind::Function {
            self.diagnostics
                .wrong_kind(range, "function", &format!("object: {owner}{name}"));
            return Value::unknown();
        }

        // An argument of unknown type was already reported; pick by arity.
        if args.iter().any(Ty::is_unknown) {
            let pick = candidates
                .iter()
                .copied()
                .find(|&id| self.arity(id) == Some(args.len()))
                .or_else(|| candidates.first().copied());
            return match pick {
                Some(id) => {
                    self.add_use(range, id);
                    Value::object(self.return_type(id))
                }
                None => Value::unknown(),
            };
        }

        match resolve_overload(&self.view, &candidates, args, self.options.cast_limit) {
            Overload::Found(id) => {
                self.add_use(range, id);
                Value::object(self.return_type(id))
            }
            Overload::Ambiguous(found) => {
                let call = describe_call(&self.view, name, args);
                let mut diagnostic = Diagnostic::error(
                    self.file(),
                    range,
                    format!("Ambiguous {} call: found {owner}{call}", kind.noun()),
                )
                .with_code(codes::AMBIGUOUS_CALL);
                for &id in &found {
                    let location = self.view.decl(id).map_or(range, |d| d.name_range);
                    diagnostic = diagnostic.with_related(Diagnostic::hint(
                        id.file,
                        location,
                        format!("Candidate: {}", describe_candidate(&self.view, id)),
                    ));
                }
                self.diagnostics.add(diagnostic);

                let chosen = found[0];
                self.add_use(range, chosen);
                Value::object(self.return_type(chosen))
            }
            Overload::NoMatch => {
                let call = describe_call(&self.view, name, args);
                self.diagnostics.add(
                    Diagnostic::error(
                        self.file(),
                        range,
                        format!("No suitable {} found: expected {owner}{call}", kind.noun()),
                    )
                    .with_code(codes::NO_MATCHING_OVERLOAD),
                );
                Value::unknown()
            }
        }
    }

    fn arity(&self, id: DeclId) -> Option<usize> {
        Some(self.view.decl(id)?.ty.as_function()?.params.len())
    }

    fn return_type(&self, id: DeclId) -> Ty {
        self.view
            .decl(id)
            .and_then(|d| d.ty.as_function())
            .map(|sig| sig.ret.clone())
            .unwrap_or_default()
    }

    /// "Owner." for messages: the class or namespace searched, or the class
    /// enclosing `ctx` at the start of a chain.
    fn owner_prefix(&self, scope: Option<ContextId>, ctx: ContextId) -> String {
        let owner = match scope {
            Some(scope) => self.view.context(scope).and_then(|c| c.owner),
            None => self.view.enclosing_class(ctx),
        };
        owner
            .and_then(|id| self.view.decl(id))
            .map(|decl| format!("{}.", decl.name))
            .unwrap_or_default()
    }
}
