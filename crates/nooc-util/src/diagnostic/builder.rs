//! Diagnostic builder for fluent diagnostic construction.

use super::{Diagnostic, DiagnosticCode, Handler, Level};
use crate::span::Span;

/// A source code snippet for display in diagnostics.
///
/// Contains the source line affected by the diagnostic, with the column
/// range to highlight and an optional label printed under the carets.
#[derive(Clone, Debug)]
pub struct SourceSnippet {
    /// The source line content
    pub line: String,
    /// Line number (1-based)
    pub line_number: usize,
    /// Column where the issue starts (1-based)
    pub start_column: usize,
    /// Column where the issue ends (1-based)
    pub end_column: usize,
    /// Optional label to display under the highlighted range
    pub label: Option<String>,
}

impl SourceSnippet {
    /// Create a new source snippet.
    pub fn new(
        line: impl Into<String>,
        line_number: usize,
        start_column: usize,
        end_column: usize,
        label: Option<impl Into<String>>,
    ) -> Self {
        Self {
            line: line.into(),
            line_number,
            start_column,
            end_column,
            label: label.map(Into::into),
        }
    }

    /// Create a snippet highlighting a single column.
    pub fn point(line: impl Into<String>, line_number: usize, column: usize) -> Self {
        Self {
            line: line.into(),
            line_number,
            start_column: column,
            end_column: column,
            label: None,
        }
    }

    /// Set the label for this snippet.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Format the snippet for display: the line, then a caret row.
    ///
    /// ```text
    ///   3 | x = 1 + "a"
    ///     |         ^^^ expected Float
    /// ```
    pub fn render(&self) -> String {
        let gutter = format!("{:>4} | ", self.line_number);
        let mut out = format!("{}{}\n", gutter, self.line);
        let pad = " ".repeat(gutter.len() - 2) + "| ";
        let start = self.start_column.max(1);
        let width = (self.end_column.saturating_sub(start)).max(1);
        out.push_str(&pad);
        out.push_str(&" ".repeat(start - 1));
        out.push_str(&"^".repeat(width));
        if let Some(label) = &self.label {
            out.push(' ');
            out.push_str(label);
        }
        out
    }
}

/// Fluent builder for [`Diagnostic`] values.
///
/// # Examples
///
/// ```
/// use nooc_util::diagnostic::{DiagnosticBuilder, DiagnosticCode};
/// use nooc_util::span::Span;
///
/// let diag = DiagnosticBuilder::error("type mismatch")
///     .code(DiagnosticCode::E_TY_MISMATCH)
///     .span(Span::DUMMY)
///     .help("pattern match to narrow the type")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    /// Start building an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::new(Level::Error, message, Span::DUMMY),
        }
    }

    /// Start building a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::new(Level::Warning, message, Span::DUMMY),
        }
    }

    /// Set the diagnostic code.
    pub fn code(mut self, code: DiagnosticCode) -> Self {
        self.diagnostic.code = Some(code);
        self
    }

    /// Set the source span.
    pub fn span(mut self, span: Span) -> Self {
        self.diagnostic.span = span;
        self
    }

    /// Add a note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    /// Add a help suggestion.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic.helps.push(help.into());
        self
    }

    /// Attach a source snippet.
    pub fn snippet(mut self, snippet: SourceSnippet) -> Self {
        self.diagnostic.snippets.push(snippet);
        self
    }

    /// Finish building.
    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }

    /// Finish building and emit through a handler.
    pub fn emit(self, handler: &Handler) {
        handler.emit_diagnostic(self.diagnostic);
    }
}
