//! Semantic model: scopes, declarations, types and resolved uses.
//!
//! ## Layers
//!
//! ```text
//! builder        → declaration and use passes over a syntax tree
//!   ↓
//! type_resolver  → qualified type names, this / super
//! overload       → picking among candidate functions
//!   ↓
//! lookup         → name lookup through scopes, imports and inheritance
//!   ↓
//! store          → per-file arenas, pending and published
//!   ↓
//! symbols, ty    → contexts, declarations, uses and the type model
//! ```
//!
//! Everything crossing a file boundary is addressed by handle
//! ([`DeclId`], [`ContextId`]). A handle into a file that has since been
//! re-analysed simply resolves to nothing.

pub mod builder;
mod diagnostics;
mod ids;
mod lookup;
mod overload;
mod store;
mod symbols;
mod ty;
mod type_resolver;

pub use builder::{
    BuildOptions, ContextBuilder, DeclarationBuilder, DeclarationOutcome, OpenContext, UseBatch,
    UseBuilder,
};
pub use diagnostics::{codes, Diagnostic, DiagnosticCollector, Severity};
pub use ids::{ContextId, DeclId, LocalContextId, LocalDeclId};
pub use lookup::LookupMode;
pub use overload::{describe_call, describe_candidate, resolve_overload, Overload};
pub use store::{SymbolStore, SymbolView};
pub use symbols::{
    Access, BaseClass, BaseKind, Context, ContextKind, DeclKind, Declaration, Features, FileSymbols,
    StorageFlags, Use,
};
pub use ty::{FunctionSig, Primitive, Ty};
pub use type_resolver::{ResolvedType, TypeResolver};
