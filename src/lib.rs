//! # dscript-base
//!
//! Semantic resolution for DragonScript: scopes, declarations, types and
//! resolved uses, built per file by analysis jobs against a shared store.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide      → resolve_at, completions, uses_of, diagnostics
//!   ↓
//! project  → documents, include paths, base library, job orchestration
//!   ↓
//! hir      → symbol store, lookup, type resolver, declaration / use builders
//!   ↓
//! syntax   → lexer, parser and syntax tree
//!   ↓
//! base     → primitives (FileId, TextRange, LineIndex)
//! ```
//!
//! One `parking_lot::RwLock` guards the [`SymbolStore`]. Declaration passes
//! write, use passes and IDE queries read.

/// Foundation types: FileId, ranges, line index
pub mod base;

/// Analysis options
pub mod config;

/// Semantic model: store, lookup, types, builders
pub mod hir;

/// IDE queries over published results
pub mod ide;

/// Documents, include paths, base library and the job orchestrator
pub mod project;

/// Lexer, parser and syntax tree
pub mod syntax;

pub use base::{FileId, LineCol, LineIndex, TextRange, TextSize};
pub use config::{AnalysisConfig, ConfigError};
pub use hir::{Declaration, Diagnostic, SymbolStore, Ty, Use};
pub use ide::{Analysis, AnalysisHost};
pub use project::{AnalysisError, JobOutcome, Orchestrator, PublishEvent, PublishListener};
