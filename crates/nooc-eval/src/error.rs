//! Evaluator errors.

use nooc_util::{Span, Symbol};
use thiserror::Error;

/// Result alias for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// All the ways evaluation can fail at runtime.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// A match fell through every arm (the typer does not require
    /// exhaustiveness, so this is a runtime report)
    #[error("no pattern matched the value")]
    NonExhaustiveMatch { span: Span },

    /// A name survived typing but has no runtime binding; indicates a typer
    /// or prelude bug rather than a user error
    #[error("unbound variable `{name}` at runtime")]
    UnboundVariable { name: Symbol, span: Span },

    /// A trait function could not find an implementation at the call site
    #[error("no implementation of `{function}` for `{type_name}`")]
    NoImplementation {
        function: Symbol,
        type_name: Symbol,
        span: Span,
    },

    /// Catch-all for dynamic failures (bad field access, non-function
    /// application, operator misuse)
    #[error("{message}")]
    Runtime { message: String, span: Span },
}

impl EvalError {
    /// The source span the error points at.
    pub fn span(&self) -> Span {
        match self {
            EvalError::NonExhaustiveMatch { span }
            | EvalError::UnboundVariable { span, .. }
            | EvalError::NoImplementation { span, .. }
            | EvalError::Runtime { span, .. } => *span,
        }
    }
}
