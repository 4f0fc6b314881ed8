//! Pattern parsing for match arms.

use nooc_lex::TokenKind;

use crate::ast::*;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parse a pattern. Constructor patterns may take argument patterns by
    /// juxtaposition (`Some x`, `Cons head tail`); arguments themselves must
    /// be atomic (parenthesize nested constructors).
    pub fn parse_pattern(&mut self) -> Option<Pattern> {
        let start = self.peek_span();

        if let TokenKind::Ident(name) = self.peek_kind() {
            let name = *name;
            if Self::is_upper(name) {
                self.advance();
                let mut args = Vec::new();
                while self.starts_pattern_atom() {
                    args.push(self.parse_pattern_atom()?);
                }
                let span = args
                    .last()
                    .map(|p| start.to(p.span))
                    .unwrap_or(start);
                return Some(Pattern::new(PatternKind::Constructor { name, args }, span));
            }
        }

        self.parse_pattern_atom()
    }

    fn starts_pattern_atom(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::Ident(_)
                | TokenKind::Underscore
                | TokenKind::LParen
                | TokenKind::LBrace
        )
    }

    fn parse_pattern_atom(&mut self) -> Option<Pattern> {
        let span = self.peek_span();
        match self.peek_kind().clone() {
            TokenKind::Underscore => {
                self.advance();
                Some(Pattern::new(PatternKind::Wildcard, span))
            }
            TokenKind::Number(n) => {
                self.advance();
                Some(Pattern::new(PatternKind::Literal(Literal::Number(n)), span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Some(Pattern::new(PatternKind::Literal(Literal::String(s)), span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if Self::is_upper(name) {
                    // Nullary constructor in argument position
                    Some(Pattern::new(
                        PatternKind::Constructor {
                            name,
                            args: Vec::new(),
                        },
                        span,
                    ))
                } else {
                    Some(Pattern::new(PatternKind::Variable(name), span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_pattern()?;
                self.expect(&TokenKind::RParen)?;
                Some(inner)
            }
            TokenKind::LBrace => self.parse_braced_pattern(),
            other => {
                self.error_at_current(format!("expected a pattern, found {}", other.describe()));
                None
            }
        }
    }

    /// `{}` unit, `{@f p, ...}` record pattern, `{p, q}` tuple pattern.
    fn parse_braced_pattern(&mut self) -> Option<Pattern> {
        let start = self.peek_span();
        self.advance(); // {

        if self.check(&TokenKind::RBrace) {
            let end = self.peek_span();
            self.advance();
            return Some(Pattern::new(
                PatternKind::Literal(Literal::Unit),
                start.to(end),
            ));
        }

        if matches!(self.peek_kind(), TokenKind::Accessor(_)) {
            let mut fields = Vec::new();
            loop {
                let field = match self.peek_kind() {
                    TokenKind::Accessor(f) => *f,
                    _ => {
                        self.error_at_current("expected `@field` in record pattern");
                        return None;
                    }
                };
                self.advance();
                let pat = self.parse_pattern()?;
                fields.push((field, pat));
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let end = self.peek_span();
            self.expect(&TokenKind::RBrace)?;
            return Some(Pattern::new(
                PatternKind::Record { fields },
                start.to(end),
            ));
        }

        let mut elements = Vec::new();
        loop {
            elements.push(self.parse_pattern()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace)?;
        Some(Pattern::new(
            PatternKind::Tuple { elements },
            start.to(end),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nooc_util::{Handler, Symbol};

    fn parse_pat(source: &str) -> Pattern {
        let handler = Handler::new();
        let tokens = nooc_lex::Lexer::new(source, &handler).tokenize();
        let mut parser = Parser::new(tokens, &handler);
        let pat = parser.parse_pattern().expect("pattern should parse");
        assert!(!handler.has_errors());
        pat
    }

    #[test]
    fn test_wildcard() {
        assert_eq!(parse_pat("_").kind, PatternKind::Wildcard);
    }

    #[test]
    fn test_variable_binding() {
        assert_eq!(
            parse_pat("x").kind,
            PatternKind::Variable(Symbol::intern("x"))
        );
    }

    #[test]
    fn test_constructor_with_args() {
        match parse_pat("Some x").kind {
            PatternKind::Constructor { name, args } => {
                assert_eq!(name, Symbol::intern("Some"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected constructor, got {:?}", other),
        }
    }

    #[test]
    fn test_nullary_constructor() {
        match parse_pat("None").kind {
            PatternKind::Constructor { name, args } => {
                assert_eq!(name, Symbol::intern("None"));
                assert!(args.is_empty());
            }
            other => panic!("expected constructor, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_constructor_needs_parens() {
        match parse_pat("Some (Some x)").kind {
            PatternKind::Constructor { args, .. } => {
                assert!(matches!(
                    args[0].kind,
                    PatternKind::Constructor { .. }
                ));
            }
            other => panic!("expected constructor, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_pattern() {
        assert_eq!(
            parse_pat("42").kind,
            PatternKind::Literal(Literal::Number(42.0))
        );
    }

    #[test]
    fn test_tuple_pattern() {
        match parse_pat("{a, b}").kind {
            PatternKind::Tuple { elements } => assert_eq!(elements.len(), 2),
            other => panic!("expected tuple pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_record_pattern() {
        match parse_pat("{@x a, @y _}").kind {
            PatternKind::Record { fields } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0, Symbol::intern("x"));
            }
            other => panic!("expected record pattern, got {:?}", other),
        }
    }
}
