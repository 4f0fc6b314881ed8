//! Declaration-form parsing: `constraint`, `implement` and `type`
//! definitions.

use nooc_lex::TokenKind;

use crate::ast::*;
use crate::Parser;

impl<'a> Parser<'a> {
    /// `constraint Show a ( show : a -> String; ... )`
    pub(crate) fn parse_constraint_def(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.expect(&TokenKind::Constraint)?;

        let name = self.expect_ident("trait name")?;
        if !Self::is_upper(name) {
            self.error_at_current("trait names must start with an uppercase letter");
        }
        let type_param = self.expect_ident("trait type parameter")?;

        self.expect(&TokenKind::LParen)?;
        let mut functions = Vec::new();
        loop {
            let fn_name = self.expect_ident("trait function name")?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            functions.push((fn_name, ty));
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                if self.check(&TokenKind::RParen) {
                    break;
                }
            } else {
                break;
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RParen)?;

        Some(Expr::new(
            ExprKind::ConstraintDef {
                name,
                type_param,
                functions,
            },
            start.to(end),
        ))
    }

    /// `implement Show Float ( show = toString; ... )`
    pub(crate) fn parse_implement_def(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.expect(&TokenKind::Implement)?;

        let trait_name = self.expect_ident("trait name")?;
        let type_name = self.expect_ident("implementing type name")?;

        self.expect(&TokenKind::LParen)?;
        let mut functions = Vec::new();
        loop {
            let fn_name = self.expect_ident("implementation function name")?;
            self.expect(&TokenKind::Equals)?;
            let body = self.parse_expr()?;
            functions.push((fn_name, body));
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                if self.check(&TokenKind::RParen) {
                    break;
                }
            } else {
                break;
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RParen)?;

        Some(Expr::new(
            ExprKind::ImplementDef {
                trait_name,
                type_name,
                functions,
            },
            start.to(end),
        ))
    }

    /// `type Name a b = alt1 | alt2 | ...`
    ///
    /// The parser records the alternatives as plain type expressions; the
    /// typer decides whether they are variant constructors, union members or
    /// a single alias (that decision needs the type environment).
    pub(crate) fn parse_type_def(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.expect(&TokenKind::Type)?;

        let name = self.expect_ident("type name")?;
        if !Self::is_upper(name) {
            self.error_at_current("type names must start with an uppercase letter");
        }

        let mut params = Vec::new();
        while let TokenKind::Ident(param) = self.peek_kind() {
            let param = *param;
            if Self::is_upper(param) {
                self.error_at_current("type parameters must be lowercase");
                return None;
            }
            params.push(param);
            self.advance();
        }

        self.expect(&TokenKind::Equals)?;

        let mut alts = Vec::new();
        loop {
            // Each alternative is an arrow-free application-level type so
            // that `|` separates alternatives rather than forming a union
            // inside one.
            alts.push(self.parse_type_def_alt()?);
            if self.check(&TokenKind::Pipe) {
                self.advance();
            } else {
                break;
            }
        }
        let end = alts.last().map(|a| a.span).unwrap_or(start);

        Some(Expr::new(
            ExprKind::TypeDef { name, params, alts },
            start.to(end),
        ))
    }

    /// One alternative of a type definition: a head applied to atoms, or a
    /// braced record/tuple type (alias case).
    fn parse_type_def_alt(&mut self) -> Option<TypeExpr> {
        // Reuse the type-atom machinery via a single application-level parse:
        // the union/arrow levels are deliberately skipped here.
        let start = self.peek_span();
        if let TokenKind::Ident(name) = self.peek_kind() {
            let name = *name;
            self.advance();
            let mut args = Vec::new();
            while matches!(
                self.peek_kind(),
                TokenKind::Ident(_) | TokenKind::LBrace | TokenKind::LParen
            ) {
                args.push(self.parse_type_def_atom()?);
            }
            let span = args.last().map(|a| start.to(a.span)).unwrap_or(start);
            let kind = if Self::is_upper(name) {
                TypeExprKind::Named { name, args }
            } else {
                TypeExprKind::Var { name, args }
            };
            return Some(TypeExpr::new(kind, span));
        }
        self.parse_type_def_atom()
    }

    fn parse_type_def_atom(&mut self) -> Option<TypeExpr> {
        match self.peek_kind() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(&TokenKind::RParen)?;
                Some(inner)
            }
            _ => {
                // Identifier or braced type; full `parse_type` would swallow
                // the following `|`, so stay at atom level.
                let span = self.peek_span();
                match self.peek_kind().clone() {
                    TokenKind::Ident(name) => {
                        self.advance();
                        let kind = if Self::is_upper(name) {
                            TypeExprKind::Named {
                                name,
                                args: Vec::new(),
                            }
                        } else {
                            TypeExprKind::Var {
                                name,
                                args: Vec::new(),
                            }
                        };
                        Some(TypeExpr::new(kind, span))
                    }
                    TokenKind::LBrace => self.parse_braced_type(),
                    other => {
                        self.error_at_current(format!(
                            "expected a type alternative, found {}",
                            other.describe()
                        ));
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Program;
    use nooc_util::{Handler, Symbol};

    fn parse(source: &str) -> Program {
        let handler = Handler::new();
        let program = Parser::parse_source(source, &handler);
        assert!(
            !handler.has_errors(),
            "parse errors: {:?}",
            handler
                .diagnostics()
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        program
    }

    #[test]
    fn test_constraint_definition() {
        let program = parse("constraint Show a ( show : a -> String )");
        match &program[0].kind {
            ExprKind::ConstraintDef {
                name,
                type_param,
                functions,
            } => {
                assert_eq!(*name, Symbol::intern("Show"));
                assert_eq!(*type_param, Symbol::intern("a"));
                assert_eq!(functions.len(), 1);
                assert_eq!(functions[0].0, Symbol::intern("show"));
            }
            other => panic!("expected constraint def, got {:?}", other),
        }
    }

    #[test]
    fn test_constraint_with_multiple_functions() {
        let program = parse("constraint Monad m ( pure : a -> m a; bind : m a -> (a -> m b) -> m b )");
        match &program[0].kind {
            ExprKind::ConstraintDef { functions, .. } => assert_eq!(functions.len(), 2),
            other => panic!("expected constraint def, got {:?}", other),
        }
    }

    #[test]
    fn test_implement_definition() {
        let program = parse("implement Show Float ( show = toString )");
        match &program[0].kind {
            ExprKind::ImplementDef {
                trait_name,
                type_name,
                functions,
            } => {
                assert_eq!(*trait_name, Symbol::intern("Show"));
                assert_eq!(*type_name, Symbol::intern("Float"));
                assert_eq!(functions.len(), 1);
            }
            other => panic!("expected implement def, got {:?}", other),
        }
    }

    #[test]
    fn test_variant_type_definition() {
        let program = parse("type Option a = Some a | None");
        match &program[0].kind {
            ExprKind::TypeDef { name, params, alts } => {
                assert_eq!(*name, Symbol::intern("Option"));
                assert_eq!(params.len(), 1);
                assert_eq!(alts.len(), 2);
            }
            other => panic!("expected type def, got {:?}", other),
        }
    }

    #[test]
    fn test_union_type_definition() {
        let program = parse("type U = String | Float");
        match &program[0].kind {
            ExprKind::TypeDef { alts, .. } => {
                assert_eq!(alts.len(), 2);
                assert!(matches!(
                    alts[0].kind,
                    TypeExprKind::Named { .. }
                ));
            }
            other => panic!("expected type def, got {:?}", other),
        }
    }

    #[test]
    fn test_alias_type_definition() {
        let program = parse("type Point = {@x Float, @y Float}");
        match &program[0].kind {
            ExprKind::TypeDef { alts, .. } => {
                assert_eq!(alts.len(), 1);
                assert!(matches!(alts[0].kind, TypeExprKind::Record { .. }));
            }
            other => panic!("expected type def, got {:?}", other),
        }
    }
}
