//! Foundation types for the DragonScript toolchain.
//!
//! This module provides the primitives every other layer builds on:
//! - [`FileId`] - Stable per-document identifiers
//! - [`TextRange`], [`TextSize`] - Byte positions in script text
//! - [`LineCol`], [`LineIndex`] - Line/column conversion for display
//!
//! This module has NO dependencies on other dscript modules.

mod file_id;
mod span;

pub use file_id::FileId;
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
