//! Semantic and syntax problem reporting.
//!
//! Problems found while building or resolving a file never abort the
//! analysis. They are collected as [`Diagnostic`]s, published with the
//! file's symbols and replaced wholesale on the next analysis.

use std::sync::Arc;

use crate::base::{FileId, TextRange};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Hint => 4,
        }
    }
}

/// A diagnostic message attached to a source range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: FileId,
    pub range: TextRange,
    pub severity: Severity,
    /// Stable code (e.g. "E0001").
    pub code: Option<&'static str>,
    pub message: Arc<str>,
    /// Follow-up notes, such as one hint per overload candidate.
    pub related: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn error(file: FileId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::with_severity(Severity::Error, file, range, message)
    }

    pub fn warning(file: FileId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::with_severity(Severity::Warning, file, range, message)
    }

    pub fn hint(file: FileId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::with_severity(Severity::Hint, file, range, message)
    }

    fn with_severity(
        severity: Severity,
        file: FileId,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            file,
            range,
            severity,
            code: None,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Set the diagnostic code.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a related diagnostic.
    pub fn with_related(mut self, related: Diagnostic) -> Self {
        self.related.push(related);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable codes for the diagnostics the builders emit.
pub mod codes {
    /// A name, type or object could not be resolved.
    pub const UNKNOWN_NAME: &str = "E0001";
    /// More than one overload or constructor matches.
    pub const AMBIGUOUS_CALL: &str = "E0002";
    /// A value is not castable to the required type.
    pub const TYPE_MISMATCH: &str = "E0003";
    /// No overload or constructor accepts the arguments.
    pub const NO_MATCHING_OVERLOAD: &str = "E0004";
    /// A function was used as an object or the other way round.
    pub const WRONG_KIND: &str = "E0005";

    /// The document could not be parsed.
    pub const SYNTAX: &str = "S0001";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics for one file during a build pass.
#[derive(Clone, Debug)]
pub struct DiagnosticCollector {
    file: FileId,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Report a name that resolved to nothing, e.g. "Unknown type: Foo".
    pub fn unknown(&mut self, range: TextRange, what: &str, name: &str) {
        self.add(
            Diagnostic::error(self.file, range, format!("Unknown {what}: {name}"))
                .with_code(codes::UNKNOWN_NAME),
        );
    }

    /// Report a value whose type is not castable to the required one.
    pub fn type_mismatch(&mut self, range: TextRange, message: String) {
        self.add(Diagnostic::error(self.file, range, message).with_code(codes::TYPE_MISMATCH));
    }

    /// Report a function used as an object or the other way round.
    pub fn wrong_kind(&mut self, range: TextRange, expected: &str, found: &str) {
        self.add(
            Diagnostic::error(
                self.file,
                range,
                format!("Expected {expected} but found {found}"),
            )
            .with_code(codes::WRONG_KIND),
        );
    }

    /// Report a syntax error produced by the parser.
    pub fn syntax(&mut self, range: TextRange, message: &str) {
        self.add(Diagnostic::error(self.file, range, message).with_code(codes::SYNTAX));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn test_diagnostic_builders() {
        let diag = Diagnostic::error(FileId::new(0), range(1, 4), "Ambiguous function call")
            .with_code(codes::AMBIGUOUS_CALL)
            .with_related(Diagnostic::hint(FileId::new(0), range(1, 4), "Candidate: A.f(int)"));

        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code, Some("E0002"));
        assert_eq!(diag.related.len(), 1);
        assert_eq!(diag.related[0].severity, Severity::Hint);
    }

    #[test]
    fn test_collector_messages() {
        let mut collector = DiagnosticCollector::new(FileId::new(3));
        collector.unknown(range(0, 3), "type", "Foo");
        collector.wrong_kind(range(5, 6), "function", "object");
        collector.add(Diagnostic::hint(FileId::new(3), range(0, 0), "note"));

        assert_eq!(collector.error_count(), 2);
        assert!(collector.has_errors());
        let diags = collector.take();
        assert_eq!(&*diags[0].message, "Unknown type: Foo");
        assert_eq!(&*diags[1].message, "Expected function but found object");
        assert!(diags.iter().all(|d| d.file == FileId::new(3)));
        assert!(collector.diagnostics().is_empty());
    }

    #[test]
    fn test_severity_to_lsp() {
        assert_eq!(Severity::Error.to_lsp(), 1);
        assert_eq!(Severity::Warning.to_lsp(), 2);
        assert_eq!(Severity::Hint.to_lsp(), 4);
    }
}
