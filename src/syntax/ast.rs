//! Syntax tree consumed by the semantic builders.
//!
//! The tree keeps only what resolution needs: names with their ranges,
//! declared type names, bodies with their start and (possibly missing)
//! terminator positions, and expressions.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};

/// An identifier token, also used for operator function names (`+`, `==`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub text: SmolStr,
    pub range: TextRange,
}

impl Ident {
    pub fn new(text: impl Into<SmolStr>, range: TextRange) -> Self {
        Self {
            text: text.into(),
            range,
        }
    }
}

/// A dotted name in type position: `Dragengine.Gui.Widget`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedName {
    pub segments: Vec<Ident>,
}

impl QualifiedName {
    pub fn range(&self) -> TextRange {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.range.cover(last.range),
            _ => TextRange::empty(TextSize::from(0)),
        }
    }

    /// The name as written, segments joined with `.`.
    pub fn path(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn is_void(&self) -> bool {
        self.segments.len() == 1 && self.segments[0].text == "void"
    }
}

// ============================================================================
// SCRIPT ITEMS
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    pub items: Vec<ScriptItem>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptItem {
    Requires(RequiresDecl),
    Pin(PinDecl),
    /// Opens a namespace chain that lasts until the next `namespace` or end of script.
    Namespace(NamespaceDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequiresDecl {
    pub package: SmolStr,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PinDecl {
    pub name: QualifiedName,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamespaceDecl {
    pub name: QualifiedName,
    pub range: TextRange,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Abstract,
    Fixed,
    Native,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub list: Vec<(Modifier, TextRange)>,
}

impl Modifiers {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.list.iter().any(|(m, _)| *m == modifier)
    }

    /// The last access modifier written, if any.
    pub fn access(&self) -> Option<Modifier> {
        self.list
            .iter()
            .rev()
            .map(|(m, _)| *m)
            .find(|m| matches!(m, Modifier::Public | Modifier::Protected | Modifier::Private))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    pub name: Ident,
    pub extends: Option<QualifiedName>,
    pub implements: Vec<QualifiedName>,
    pub members: Vec<Member>,
    /// End of the header line; the class scope starts here.
    pub body_start: TextSize,
    /// Start of the closing `end`, `None` when the script ended first.
    pub end: Option<TextSize>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDecl {
    pub modifiers: Modifiers,
    pub name: Ident,
    pub implements: Vec<QualifiedName>,
    pub members: Vec<Member>,
    pub body_start: TextSize,
    pub end: Option<TextSize>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDecl {
    pub modifiers: Modifiers,
    pub name: Ident,
    pub members: Vec<EnumMember>,
    pub body_start: TextSize,
    pub end: Option<TextSize>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumMember {
    pub name: Ident,
    pub value: Option<Expr>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    Function(FuncDecl),
    Variable(VarDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub modifiers: Modifiers,
    /// `None` only for constructors.
    pub return_type: Option<QualifiedName>,
    pub name: Ident,
    pub params: Vec<Param>,
    pub ctor_call: Option<CtorCall>,
    /// `None` for abstract, native and interface functions.
    pub body: Option<Body>,
    /// Position of the opening parenthesis; the function scope starts here.
    pub params_start: TextSize,
    pub range: TextRange,
}

impl FuncDecl {
    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none() && self.name.text == "new"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: QualifiedName,
    pub name: Ident,
    pub range: TextRange,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CtorCallKind {
    Super,
    This,
}

/// The `super(...)` / `this(...)` chain call written after a constructor header.
#[derive(Clone, Debug, PartialEq)]
pub struct CtorCall {
    pub kind: CtorCallKind,
    pub keyword: TextRange,
    pub args: Vec<Expr>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub modifiers: Modifiers,
    pub ty: QualifiedName,
    pub declarators: Vec<VarDeclarator>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDeclarator {
    pub name: Ident,
    pub init: Option<Expr>,
    pub range: TextRange,
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// A statement list with the position it starts at and the position of its
/// terminating keyword (`end`, `elif`, `else`, `case`, `catch`).
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub stmts: Vec<Stmt>,
    pub start: TextSize,
    pub end: Option<TextSize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    If(IfStmt),
    Select(SelectStmt),
    For(ForStmt),
    While(WhileStmt),
    Try(TryStmt),
    Return(Option<Expr>, TextRange),
    Throw(Option<Expr>, TextRange),
    Break(TextRange),
    Continue(TextRange),
    Expr(Expr),
}

impl Body {
    /// End of the last statement, or the start of an empty body.
    pub fn content_end(&self) -> TextSize {
        self.stmts.last().map_or(self.start, |s| s.range().end())
    }
}

impl Stmt {
    pub fn range(&self) -> TextRange {
        match self {
            Stmt::Var(decl) => decl.range,
            Stmt::If(s) => s.range,
            Stmt::Select(s) => s.range,
            Stmt::For(s) => s.range,
            Stmt::While(s) => s.range,
            Stmt::Try(s) => s.range,
            Stmt::Return(_, range) | Stmt::Throw(_, range) => *range,
            Stmt::Break(range) | Stmt::Continue(range) => *range,
            Stmt::Expr(expr) => expr.range,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_body: Body,
    pub elifs: Vec<ElifClause>,
    pub else_body: Option<Body>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElifClause {
    pub cond: Expr,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStmt {
    pub value: Expr,
    pub cases: Vec<CaseClause>,
    pub else_body: Option<Body>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub values: Vec<Expr>,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub var: Expr,
    pub from: Expr,
    pub to: Expr,
    pub step: Option<Expr>,
    pub downto: bool,
    pub body: Body,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Body,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TryStmt {
    pub body: Body,
    pub catches: Vec<CatchClause>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub ty: QualifiedName,
    pub var: Ident,
    /// Starts at the caught type so the catch variable lives inside the scope.
    pub body: Body,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Byte(u8),
    Bool(bool),
    Int(i64),
    Float(f64),
    String(SmolStr),
    Null,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    This,
    Super,
    /// `name`, `name(args)`, `object.name` or `object.name(args)`.
    Member {
        object: Option<Box<Expr>>,
        name: Ident,
        args: Option<Vec<Expr>>,
    },
    Binary {
        op: BinaryOp,
        op_range: TextRange,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        op_range: TextRange,
        operand: Box<Expr>,
    },
    Special {
        op: SpecialOp,
        expr: Box<Expr>,
        target: QualifiedName,
    },
    InlineIf {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Block {
        params: Vec<Param>,
        body: Body,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    LogicAnd,
    LogicOr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Name of the operator function called for this operator.
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Assign => "=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::ModAssign => "%=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::ShlAssign => "<<=",
            BinaryOp::ShrAssign => ">>=",
            BinaryOp::AndAssign => "&=",
            BinaryOp::OrAssign => "|=",
            BinaryOp::XorAssign => "^=",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn function_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecialOp {
    Cast,
    Castable,
    Typeof,
}
