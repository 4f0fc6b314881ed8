//! nooc-par - Parser (Syntactic Analyzer) for Noolang.
//!
//! A hand-written recursive-descent parser with Pratt-style binary operator
//! parsing. The parser consumes the token stream from `nooc-lex` and
//! produces the [`ast`] the typer consumes.
//!
//! # Grammar sketch (EBNF)
//!
//! ```ebnf
//! program    = [ statement { ";" statement } [ ";" ] ] ;
//! statement  = definition | mutation | constraint-def | implement-def
//!            | type-def | expr ;
//! definition = [ "mut" ] ident "=" expr ;
//! mutation   = ident ":=" expr ;
//! expr       = pipe [ ":" type ] ;
//! pipe       = binary { "|" binary } ;            (* x | f  ==  f x *)
//! binary     = application { binop application } ; (* Pratt, precedence *)
//! application= prefix { atom } ;                   (* juxtaposition *)
//! prefix     = lambda | if | match | forget | import | atom ;
//! lambda     = "fn" ident { ident } "=>" expr ;
//! atom       = number | string | ident | accessor | "(" seq ")"
//!            | "{" record-or-tuple-or-unit "}" | "[" list "]" ;
//! ```
//!
//! Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `:` (annotation) | - |
//! | 2 | `\|` (pipe) | Left |
//! | 3 | `==`, `!=`, `<`, `<=`, `>`, `>=` | Left |
//! | 4 | `+`, `-` | Left |
//! | 5 | `*`, `/` | Left |
//! | 6 | application (juxtaposition) | Left |

pub mod ast;
mod expr;
mod items;
mod pattern;
mod types;

pub use ast::*;

use nooc_lex::{Token, TokenKind};
use nooc_util::{DiagnosticBuilder, DiagnosticCode, Handler, Span};

/// Parser for the Noolang language.
///
/// Holds the token stream and a cursor into it. Errors are reported through
/// the [`Handler`]; on a statement-level error the parser synchronizes to
/// the next `;` and continues, so one bad statement does not hide the rest.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    handler: &'a Handler,
}

impl<'a> Parser<'a> {
    /// Create a parser over a token stream (must end with `Eof`).
    pub fn new(tokens: Vec<Token>, handler: &'a Handler) -> Self {
        Self {
            tokens,
            pos: 0,
            handler,
        }
    }

    /// Convenience: lex and parse a source string in one step.
    pub fn parse_source(source: &str, handler: &'a Handler) -> Program {
        let tokens = nooc_lex::Lexer::new(source, handler).tokenize();
        Parser::new(tokens, handler).parse_program()
    }

    /// Parse a whole program: statements separated by `;`.
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.at_eof() {
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
            if self.check(&TokenKind::Semicolon) {
                self.advance();
            } else if !self.at_eof() {
                self.error_at_current("expected `;` between statements");
                self.synchronize();
            }
        }

        statements
    }

    /// Parse one statement: a definition form or a bare expression.
    pub fn parse_statement(&mut self) -> Option<Expr> {
        match self.peek_kind() {
            TokenKind::Constraint => self.parse_constraint_def(),
            TokenKind::Implement => self.parse_implement_def(),
            TokenKind::Type => self.parse_type_def(),
            TokenKind::Mut => self.parse_mut_definition(),
            TokenKind::Ident(_) if self.peek_next_is(&TokenKind::Equals) => {
                self.parse_definition()
            }
            TokenKind::Ident(_) if self.peek_next_is(&TokenKind::ColonEq) => {
                self.parse_mutation()
            }
            _ => self.parse_expr(),
        }
    }

    fn parse_definition(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        let name = self.expect_ident("definition name")?;
        self.expect(&TokenKind::Equals)?;
        let value = self.parse_expr()?;
        let span = start.to(value.span);
        Some(Expr::new(
            ExprKind::Definition {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_mut_definition(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.expect(&TokenKind::Mut)?;
        let name = self.expect_ident("mutable definition name")?;
        self.expect(&TokenKind::Equals)?;
        let value = self.parse_expr()?;
        let span = start.to(value.span);
        Some(Expr::new(
            ExprKind::MutDefinition {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_mutation(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        let name = self.expect_ident("mutation target")?;
        self.expect(&TokenKind::ColonEq)?;
        let value = self.parse_expr()?;
        let span = start.to(value.span);
        Some(Expr::new(
            ExprKind::Mutation {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    // =========================================================================
    // Token stream helpers
    // =========================================================================

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn peek_next_is(&self, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.pos + 1)
            .map(|t| &t.kind == kind)
            .unwrap_or(false)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Consume a specific token or report an error.
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            DiagnosticBuilder::error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.peek_kind().describe()
            ))
            .code(DiagnosticCode::E_PAR_EXPECTED_TOKEN)
            .span(self.peek_span())
            .emit(self.handler);
            None
        }
    }

    /// Consume an identifier or report an error.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Option<nooc_util::Symbol> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = *name;
                self.advance();
                Some(name)
            }
            other => {
                DiagnosticBuilder::error(format!(
                    "expected {}, found {}",
                    what,
                    other.describe()
                ))
                .code(DiagnosticCode::E_PAR_EXPECTED_TOKEN)
                .span(self.peek_span())
                .emit(self.handler);
                None
            }
        }
    }

    pub(crate) fn error_at_current(&self, message: impl Into<String>) {
        let code = if self.at_eof() {
            DiagnosticCode::E_PAR_UNEXPECTED_EOF
        } else {
            DiagnosticCode::E_PAR_UNEXPECTED_TOKEN
        };
        DiagnosticBuilder::error(message)
            .code(code)
            .span(self.peek_span())
            .emit(self.handler);
    }

    /// Skip ahead to the next statement boundary after an error.
    fn synchronize(&mut self) {
        while !self.at_eof() && !self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    pub(crate) fn handler(&self) -> &'a Handler {
        self.handler
    }

    /// True if `symbol` names a constructor or type (uppercase initial).
    pub(crate) fn is_upper(symbol: nooc_util::Symbol) -> bool {
        symbol
            .as_str()
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nooc_util::Symbol;

    fn parse(source: &str) -> Program {
        let handler = Handler::new();
        let program = Parser::parse_source(source, &handler);
        assert!(
            !handler.has_errors(),
            "unexpected parse errors: {:?}",
            handler
                .diagnostics()
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        program
    }

    #[test]
    fn test_parse_definition() {
        let program = parse("x = 1");
        assert_eq!(program.len(), 1);
        match &program[0].kind {
            ExprKind::Definition { name, value } => {
                assert_eq!(*name, Symbol::intern("x"));
                assert_eq!(value.kind, ExprKind::Literal(Literal::Number(1.0)));
            }
            other => panic!("expected definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_statements_in_order() {
        let program = parse("x = 1; y = 2; x + y");
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn test_parse_mut_definition_and_mutation() {
        let program = parse("mut counter = 0; counter := counter + 1");
        assert!(matches!(
            program[0].kind,
            ExprKind::MutDefinition { .. }
        ));
        assert!(matches!(program[1].kind, ExprKind::Mutation { .. }));
    }

    #[test]
    fn test_error_recovery_continues_to_next_statement() {
        let handler = Handler::new();
        let program = Parser::parse_source("x = ; y = 2", &handler);
        assert!(handler.has_errors());
        assert_eq!(program.len(), 1);
        assert!(matches!(program[0].kind, ExprKind::Definition { .. }));
    }

    #[test]
    fn test_trailing_semicolon_ok() {
        let program = parse("x = 1;");
        assert_eq!(program.len(), 1);
    }
}
