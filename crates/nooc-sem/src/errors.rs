//! Typer error taxonomy.
//!
//! Every error carries a source span and, where it helps, the two rendered
//! types involved and a short actionable hint. Errors abort the current
//! top-level statement; the driver decides whether to continue (REPL) or
//! stop (batch).

use nooc_util::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Span, Symbol};
use thiserror::Error;

/// Result alias for typer operations.
pub type TypeResult<T> = Result<T, TypeError>;

/// All the ways a typing run can fail.
#[derive(Debug, Clone, Error)]
pub enum TypeError {
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("cannot construct infinite type: `{var}` occurs in `{ty}`")]
    OccursCheck { var: String, ty: String, span: Span },

    #[error("unknown variable `{name}`")]
    UnknownVariable { name: Symbol, span: Span },

    #[error("unknown trait `{name}`")]
    UnknownTrait { name: Symbol, span: Span },

    #[error("no implementation of `{trait_name}` for `{type_name}`")]
    UnknownImplementation {
        trait_name: Symbol,
        type_name: String,
        span: Span,
    },

    #[error("ambiguous call to `{function}`: both `{first}` and `{second}` define it for this type")]
    AmbiguousTraitResolution {
        function: Symbol,
        first: Symbol,
        second: Symbol,
        span: Span,
    },

    #[error("`{function}` in `implement {trait_name}` takes {found} parameters but is declared with {expected}")]
    ImplementationArityMismatch {
        trait_name: Symbol,
        function: Symbol,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("`{function}` is not declared by trait `{trait_name}`")]
    ImplementationUnknownFunction {
        trait_name: Symbol,
        function: Symbol,
        span: Span,
    },

    #[error("duplicate implementation of `{trait_name}` for `{type_name}`")]
    DuplicateImplementation {
        trait_name: Symbol,
        type_name: Symbol,
        span: Span,
    },

    #[error("pattern does not match the scrutinee: {message}")]
    PatternMismatch { message: String, span: Span },

    #[error("cannot apply `{op}` to the untagged union `{ty}`")]
    UnionOperationRequiresMatch { op: String, ty: String, span: Span },

    #[error("cannot apply `{op}` to a value of type Unknown")]
    UnknownOperationRequiresAdapter { op: String, span: Span },

    #[error("imported file not found: `{path}`")]
    ImportNotFound { path: String, span: Span },

    #[error("imported file `{path}` failed to parse")]
    ImportParseError { path: String, span: Span },

    #[error("imported file `{path}` failed to type: {inner}")]
    ImportTypeError {
        path: String,
        #[source]
        inner: Box<TypeError>,
        span: Span,
    },
}

impl TypeError {
    /// The source span the error points at.
    pub fn span(&self) -> Span {
        match self {
            TypeError::TypeMismatch { span, .. }
            | TypeError::OccursCheck { span, .. }
            | TypeError::UnknownVariable { span, .. }
            | TypeError::UnknownTrait { span, .. }
            | TypeError::UnknownImplementation { span, .. }
            | TypeError::AmbiguousTraitResolution { span, .. }
            | TypeError::ImplementationArityMismatch { span, .. }
            | TypeError::ImplementationUnknownFunction { span, .. }
            | TypeError::DuplicateImplementation { span, .. }
            | TypeError::PatternMismatch { span, .. }
            | TypeError::UnionOperationRequiresMatch { span, .. }
            | TypeError::UnknownOperationRequiresAdapter { span, .. }
            | TypeError::ImportNotFound { span, .. }
            | TypeError::ImportParseError { span, .. }
            | TypeError::ImportTypeError { span, .. } => *span,
        }
    }

    /// A short actionable hint, when one exists.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TypeError::UnionOperationRequiresMatch { .. } => {
                Some("use pattern matching to narrow the type")
            }
            TypeError::UnknownOperationRequiresAdapter { .. } => {
                Some("use an optional accessor like `@field?` to get an Option back out of Unknown")
            }
            TypeError::OccursCheck { .. } => {
                Some("a value cannot contain itself in its own type")
            }
            TypeError::AmbiguousTraitResolution { .. } => {
                Some("rename one of the trait functions or drop one of the implementations")
            }
            TypeError::UnknownVariable { .. } => Some("is the definition above this use?"),
            _ => None,
        }
    }

    /// Diagnostic code for this error kind.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            TypeError::TypeMismatch { .. } => DiagnosticCode::E_TY_MISMATCH,
            TypeError::OccursCheck { .. } => DiagnosticCode::E_TY_OCCURS,
            TypeError::UnknownVariable { .. } => DiagnosticCode::E_TY_UNKNOWN_VAR,
            TypeError::UnknownTrait { .. }
            | TypeError::UnknownImplementation { .. }
            | TypeError::AmbiguousTraitResolution { .. }
            | TypeError::ImplementationArityMismatch { .. }
            | TypeError::ImplementationUnknownFunction { .. }
            | TypeError::DuplicateImplementation { .. } => DiagnosticCode::E_TY_TRAIT,
            TypeError::PatternMismatch { .. } => DiagnosticCode::E_TY_PATTERN,
            TypeError::UnionOperationRequiresMatch { .. } => DiagnosticCode::E_TY_UNION_OP,
            TypeError::UnknownOperationRequiresAdapter { .. } => DiagnosticCode::E_TY_UNKNOWN_OP,
            TypeError::ImportNotFound { .. }
            | TypeError::ImportParseError { .. }
            | TypeError::ImportTypeError { .. } => DiagnosticCode::E_TY_IMPORT,
        }
    }

    /// Convert to a renderable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.to_string())
            .code(self.code())
            .span(self.span());
        if let Some(hint) = self.hint() {
            builder = builder.help(hint);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_error_hint_mentions_pattern_matching() {
        let err = TypeError::UnionOperationRequiresMatch {
            op: "+".into(),
            ty: "String | Float".into(),
            span: Span::DUMMY,
        };
        assert!(err.hint().unwrap().contains("pattern matching"));
    }

    #[test]
    fn test_diagnostic_carries_code_and_help() {
        let err = TypeError::TypeMismatch {
            expected: "Float".into(),
            found: "String".into(),
            span: Span::new(0, 1, 2, 3),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, Some(DiagnosticCode::E_TY_MISMATCH));
        assert!(diag.message.contains("Float"));
        assert!(diag.message.contains("String"));
    }

    #[test]
    fn test_error_span_preserved() {
        let span = Span::new(5, 9, 2, 1);
        let err = TypeError::UnknownVariable {
            name: Symbol::intern("ghost"),
            span,
        };
        assert_eq!(err.span(), span);
    }
}
