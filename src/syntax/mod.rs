//! DragonScript syntax: tokens, tree and parser.
//!
//! The semantic layer only consumes [`ast`]; the lexer and parser exist so
//! documents can go from text to tree inside an analysis job.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::base::TextRange;

pub use parser::{ParseOutput, parse};

/// A problem found while tokenizing or parsing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}
