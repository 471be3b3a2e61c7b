//! Declarations, contexts and uses, stored in one arena per file.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::{FileId, TextRange, TextSize};

use super::diagnostics::Diagnostic;
use super::ids::{ContextId, DeclId, LocalContextId, LocalDeclId};
use super::ty::Ty;

// ============================================================================
// DECLARATIONS
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Namespace,
    Class,
    Interface,
    Enum,
    EnumMember,
    Function,
    Variable,
    Parameter,
}

impl DeclKind {
    /// Kinds that may appear in a type position (including namespace prefixes).
    pub fn is_type_like(self) -> bool {
        matches!(
            self,
            DeclKind::Namespace | DeclKind::Class | DeclKind::Interface | DeclKind::Enum
        )
    }

    /// Kinds that denote a value when used in an expression.
    pub fn is_object(self) -> bool {
        matches!(
            self,
            DeclKind::Variable | DeclKind::Parameter | DeclKind::EnumMember
        )
    }

    pub fn display(self) -> &'static str {
        match self {
            DeclKind::Namespace => "namespace",
            DeclKind::Class => "class",
            DeclKind::Interface => "interface",
            DeclKind::Enum => "enumeration",
            DeclKind::EnumMember => "enumeration constant",
            DeclKind::Function => "function",
            DeclKind::Variable => "variable",
            DeclKind::Parameter => "parameter",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct StorageFlags {
    pub is_static: bool,
    pub is_abstract: bool,
    /// `fixed`: final classes, constant members.
    pub is_fixed: bool,
    pub is_native: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Superclass,
    Interface,
}

/// One entry of a class's base list. At most one entry is a superclass, and
/// it comes first; an unresolved `extends` leaves no entry at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseClass {
    pub ty: Ty,
    pub kind: BaseKind,
    pub access: Access,
}

impl BaseClass {
    pub fn superclass(ty: Ty) -> Self {
        Self {
            ty,
            kind: BaseKind::Superclass,
            access: Access::Public,
        }
    }

    pub fn interface(ty: Ty) -> Self {
        Self {
            ty,
            kind: BaseKind::Interface,
            access: Access::Public,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: SmolStr,
    pub kind: DeclKind,
    /// Function declarations carry a [`Ty::Function`].
    pub ty: Ty,
    /// The context this declaration was created in. Never reassigned.
    pub context: ContextId,
    /// The scope this declaration opens (class body, function, namespace).
    pub inner: Option<ContextId>,
    pub range: TextRange,
    pub name_range: TextRange,
    pub access: Access,
    pub storage: StorageFlags,
    pub bases: Vec<BaseClass>,
    pub enum_value: Option<i64>,
}

impl Declaration {
    pub fn new(name: impl Into<SmolStr>, kind: DeclKind, context: ContextId, name_range: TextRange) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: Ty::Unknown,
            context,
            inner: None,
            range: name_range,
            name_range,
            access: Access::Public,
            storage: StorageFlags::default(),
            bases: Vec::new(),
            enum_value: None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == DeclKind::Function && self.name == "new"
    }

    /// The superclass link of a class; never an implemented interface.
    pub fn superclass(&self) -> Option<&Ty> {
        match self.kind {
            DeclKind::Class => self
                .bases
                .iter()
                .find(|b| b.kind == BaseKind::Superclass)
                .map(|b| &b.ty),
            _ => None,
        }
    }

    /// Implemented (or, for interfaces, extended) interface links.
    pub fn interfaces(&self) -> impl Iterator<Item = &Ty> + '_ {
        self.bases
            .iter()
            .filter(|b| b.kind == BaseKind::Interface)
            .map(|b| &b.ty)
    }
}

// ============================================================================
// CONTEXTS
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Global,
    Namespace,
    /// Class, interface and enumeration bodies.
    Type,
    Function,
    Block,
}

impl ContextKind {
    /// Statement-ordered contexts reject forward references.
    pub fn is_ordered(self) -> bool {
        matches!(self, ContextKind::Function | ContextKind::Block)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    pub kind: ContextKind,
    /// Local scope identifier: the owner's name or a block label.
    pub label: SmolStr,
    pub range: TextRange,
    pub parent: Option<ContextId>,
    pub owner: Option<DeclId>,
    /// Local declarations in insertion order. Duplicates are legal.
    pub locals: Vec<DeclId>,
    pub children: Vec<ContextId>,
    /// Imported parent contexts, searched after the parent chain. Only the
    /// top context has any: pinned namespaces, then base-library tops, then
    /// include-path tops.
    pub imports: Vec<ContextId>,
    /// Start of the syntax node that introduced this context.
    pub origin: TextSize,
    /// Dotted path of a namespace context, e.g. `Game.Ui`.
    pub path: Option<SmolStr>,
}

// ============================================================================
// USES
// ============================================================================

/// A resolved reference from a source range to a declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub file: FileId,
    pub range: TextRange,
    pub decl: DeclId,
}

/// How far an analysis went for a file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Features {
    /// Contexts and declarations only.
    Declarations,
    /// Declarations plus uses and their diagnostics.
    #[default]
    AllDeclarationsAndUses,
}

// ============================================================================
// FILE ARENA
// ============================================================================

/// Everything one analysis of a file produced.
#[derive(Clone, Debug)]
pub struct FileSymbols {
    pub file: FileId,
    /// Store generation at publish time, 0 while pending.
    pub generation: u64,
    /// Document revision the analysis read.
    pub revision: u64,
    pub features: Features,
    pub is_library: bool,
    contexts: Vec<Context>,
    decls: Vec<Declaration>,
    pub uses: Vec<Use>,
    pub diagnostics: Vec<Diagnostic>,
    namespaces: IndexMap<SmolStr, Vec<LocalContextId>>,
}

impl FileSymbols {
    /// A fresh arena holding only the (global, parent-less) top context.
    pub fn new(file: FileId, range: TextRange) -> Self {
        Self {
            file,
            generation: 0,
            revision: 0,
            features: Features::default(),
            is_library: false,
            contexts: vec![Context {
                kind: ContextKind::Global,
                label: SmolStr::default(),
                range,
                parent: None,
                owner: None,
                locals: Vec::new(),
                children: Vec::new(),
                imports: Vec::new(),
                origin: range.start(),
                path: None,
            }],
            decls: Vec::new(),
            uses: Vec::new(),
            diagnostics: Vec::new(),
            namespaces: IndexMap::new(),
        }
    }

    pub fn top(&self) -> &Context {
        &self.contexts[0]
    }

    pub fn top_mut(&mut self) -> &mut Context {
        &mut self.contexts[0]
    }

    pub fn context(&self, id: LocalContextId) -> Option<&Context> {
        self.contexts.get(id.index())
    }

    pub fn context_mut(&mut self, id: LocalContextId) -> Option<&mut Context> {
        self.contexts.get_mut(id.index())
    }

    pub fn decl(&self, id: LocalDeclId) -> Option<&Declaration> {
        self.decls.get(id.index())
    }

    pub fn decl_mut(&mut self, id: LocalDeclId) -> Option<&mut Declaration> {
        self.decls.get_mut(id.index())
    }

    pub fn contexts(&self) -> impl Iterator<Item = (ContextId, &Context)> + '_ {
        self.contexts
            .iter()
            .enumerate()
            .map(|(i, c)| (ContextId::new(self.file, LocalContextId::new(i as u32)), c))
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Declaration)> + '_ {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId::new(self.file, LocalDeclId::new(i as u32)), d))
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Append a child context of `parent`.
    pub fn add_context(&mut self, parent: ContextId, mut context: Context) -> ContextId {
        let id = ContextId::new(self.file, LocalContextId::new(self.contexts.len() as u32));
        context.parent = Some(parent);
        if let Some(path) = &context.path {
            self.namespaces.entry(path.clone()).or_default().push(id.local);
        }
        if parent.file == self.file {
            if let Some(p) = self.contexts.get_mut(parent.local.index()) {
                p.children.push(id);
            }
        }
        self.contexts.push(context);
        id
    }

    /// Append a declaration and register it as a local of its context.
    pub fn add_decl(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId::new(self.file, LocalDeclId::new(self.decls.len() as u32));
        if decl.context.file == self.file {
            if let Some(ctx) = self.contexts.get_mut(decl.context.local.index()) {
                ctx.locals.push(id);
            }
        }
        self.decls.push(decl);
        id
    }

    /// Namespace contexts of this file with the given dotted path.
    pub fn namespace_contexts(&self, path: &str) -> impl Iterator<Item = ContextId> + '_ {
        self.namespaces
            .get(path)
            .into_iter()
            .flatten()
            .map(|&local| ContextId::new(self.file, local))
    }

    /// The innermost context whose range contains `offset`.
    pub fn context_at(&self, offset: TextSize) -> ContextId {
        let mut current = ContextId::top(self.file);
        'descend: loop {
            let Some(ctx) = self.context(current.local) else {
                return current;
            };
            for &child in &ctx.children {
                let contains = self
                    .context(child.local)
                    .is_some_and(|c| c.range.contains_inclusive(offset));
                if contains {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// The child of `parent` introduced by the syntax node starting at `origin`.
    pub fn child_at_origin(&self, parent: ContextId, origin: TextSize) -> Option<ContextId> {
        self.context(parent.local)?
            .children
            .iter()
            .copied()
            .find(|c| self.context(c.local).is_some_and(|ctx| ctx.origin == origin))
    }

    /// Compare everything an analysis derives from the text, ignoring the
    /// publish bookkeeping (generation, revision).
    /// Same contexts and declarations, ignoring uses and diagnostics. Handles
    /// into an arena stay valid across a republish exactly when this holds.
    pub fn same_declarations(&self, other: &FileSymbols) -> bool {
        self.file == other.file && self.contexts == other.contexts && self.decls == other.decls
    }

    pub fn same_symbols(&self, other: &FileSymbols) -> bool {
        self.file == other.file
            && self.contexts == other.contexts
            && self.decls == other.decls
            && self.uses == other.uses
            && self.diagnostics == other.diagnostics
    }
}
