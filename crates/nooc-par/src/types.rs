//! Type expression parsing.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```ebnf
//! type       = union [ "given" constraint { "," constraint } ] ;
//! union      = arrow { "|" arrow } ;
//! arrow      = app [ "->" arrow ] ;            (* right associative *)
//! app        = ident { type-atom } | type-atom ;
//! type-atom  = ident | "{" record-or-tuple "}" | "(" type ")" ;
//! constraint = ident "implements" ident
//!            | ident "has" "{" accessor type "}" ;
//! ```

use nooc_lex::TokenKind;

use crate::ast::*;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parse a complete type expression, including an optional `given` tail.
    pub fn parse_type(&mut self) -> Option<TypeExpr> {
        let base = self.parse_union_type()?;

        if self.check(&TokenKind::Given) {
            self.advance();
            let mut constraints = Vec::new();
            loop {
                constraints.push(self.parse_constraint_clause()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let span = base.span;
            return Some(TypeExpr::new(
                TypeExprKind::Constrained {
                    base: Box::new(base),
                    constraints,
                },
                span,
            ));
        }

        Some(base)
    }

    fn parse_union_type(&mut self) -> Option<TypeExpr> {
        let first = self.parse_arrow_type()?;

        if !self.check(&TokenKind::Pipe) {
            return Some(first);
        }

        let start = first.span;
        let mut members = vec![first];
        while self.check(&TokenKind::Pipe) {
            self.advance();
            members.push(self.parse_arrow_type()?);
        }
        let span = start.to(members.last().unwrap().span);
        Some(TypeExpr::new(TypeExprKind::Union { members }, span))
    }

    fn parse_arrow_type(&mut self) -> Option<TypeExpr> {
        let param = self.parse_app_type()?;

        if self.check(&TokenKind::Arrow) {
            self.advance();
            let ret = self.parse_arrow_type()?;
            let span = param.span.to(ret.span);
            return Some(TypeExpr::new(
                TypeExprKind::Function {
                    param: Box::new(param),
                    ret: Box::new(ret),
                },
                span,
            ));
        }

        Some(param)
    }

    /// An identifier head optionally applied to type atoms: `Option a`,
    /// `Result e a`, `f a`.
    fn parse_app_type(&mut self) -> Option<TypeExpr> {
        let start = self.peek_span();

        if let TokenKind::Ident(name) = self.peek_kind() {
            let name = *name;
            self.advance();
            let mut args = Vec::new();
            while self.starts_type_atom() {
                args.push(self.parse_type_atom()?);
            }
            let span = args.last().map(|a| start.to(a.span)).unwrap_or(start);
            let kind = if Self::is_upper(name) {
                TypeExprKind::Named { name, args }
            } else {
                TypeExprKind::Var { name, args }
            };
            return Some(TypeExpr::new(kind, span));
        }

        self.parse_type_atom()
    }

    fn starts_type_atom(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Ident(_) | TokenKind::LBrace | TokenKind::LParen
        )
    }

    fn parse_type_atom(&mut self) -> Option<TypeExpr> {
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
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(&TokenKind::RParen)?;
                Some(inner)
            }
            TokenKind::LBrace => self.parse_braced_type(),
            other => {
                self.error_at_current(format!("expected a type, found {}", other.describe()));
                None
            }
        }
    }

    /// `{}` Unit, `{@f T, ...}` record type, `{T, U}` tuple type.
    pub(crate) fn parse_braced_type(&mut self) -> Option<TypeExpr> {
        let start = self.peek_span();
        self.advance(); // {

        if self.check(&TokenKind::RBrace) {
            let end = self.peek_span();
            self.advance();
            return Some(TypeExpr::new(
                TypeExprKind::Named {
                    name: nooc_util::Symbol::intern("Unit"),
                    args: Vec::new(),
                },
                start.to(end),
            ));
        }

        if matches!(self.peek_kind(), TokenKind::Accessor(_)) {
            let mut fields = Vec::new();
            loop {
                let field = match self.peek_kind() {
                    TokenKind::Accessor(f) => *f,
                    _ => {
                        self.error_at_current("expected `@field` in record type");
                        return None;
                    }
                };
                self.advance();
                let ty = self.parse_type()?;
                fields.push((field, ty));
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let end = self.peek_span();
            self.expect(&TokenKind::RBrace)?;
            return Some(TypeExpr::new(
                TypeExprKind::Record { fields },
                start.to(end),
            ));
        }

        let mut elements = Vec::new();
        loop {
            elements.push(self.parse_type()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace)?;
        Some(TypeExpr::new(
            TypeExprKind::Tuple { elements },
            start.to(end),
        ))
    }

    fn parse_constraint_clause(&mut self) -> Option<ConstraintExpr> {
        let var = self.expect_ident("constraint variable")?;

        match self.peek_kind() {
            TokenKind::Implements => {
                self.advance();
                let trait_name = self.expect_ident("trait name")?;
                Some(ConstraintExpr::Implements { var, trait_name })
            }
            TokenKind::Has => {
                self.advance();
                self.expect(&TokenKind::LBrace)?;
                let field = match self.peek_kind() {
                    TokenKind::Accessor(f) => {
                        let f = *f;
                        self.advance();
                        f
                    }
                    other => {
                        self.error_at_current(format!(
                            "expected `@field` in `has` constraint, found {}",
                            other.describe()
                        ));
                        return None;
                    }
                };
                let ty = self.parse_type()?;
                self.expect(&TokenKind::RBrace)?;
                Some(ConstraintExpr::HasField { var, field, ty })
            }
            other => {
                self.error_at_current(format!(
                    "expected `implements` or `has` in constraint, found {}",
                    other.describe()
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nooc_util::{Handler, Symbol};

    fn parse_ty(source: &str) -> TypeExpr {
        let handler = Handler::new();
        let tokens = nooc_lex::Lexer::new(source, &handler).tokenize();
        let mut parser = Parser::new(tokens, &handler);
        let ty = parser.parse_type().expect("type should parse");
        assert!(
            !handler.has_errors(),
            "type errors: {:?}",
            handler
                .diagnostics()
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        ty
    }

    #[test]
    fn test_primitive_name() {
        match parse_ty("Float").kind {
            TypeExprKind::Named { name, args } => {
                assert_eq!(name, Symbol::intern("Float"));
                assert!(args.is_empty());
            }
            other => panic!("expected named, got {:?}", other),
        }
    }

    #[test]
    fn test_parameterized() {
        match parse_ty("Option a").kind {
            TypeExprKind::Named { name, args } => {
                assert_eq!(name, Symbol::intern("Option"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected named, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_right_associative() {
        match parse_ty("a -> b -> c").kind {
            TypeExprKind::Function { ret, .. } => {
                assert!(matches!(ret.kind, TypeExprKind::Function { .. }));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_union() {
        match parse_ty("String | Float").kind {
            TypeExprKind::Union { members } => assert_eq!(members.len(), 2),
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn test_record_type() {
        match parse_ty("{@name String, @age Float}").kind {
            TypeExprKind::Record { fields } => assert_eq!(fields.len(), 2),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_type() {
        match parse_ty("{Float, String}").kind {
            TypeExprKind::Tuple { elements } => assert_eq!(elements.len(), 2),
            other => panic!("expected tuple, got {:?}", other),
        }
    }

    #[test]
    fn test_higher_kinded_var() {
        match parse_ty("f a").kind {
            TypeExprKind::Var { name, args } => {
                assert_eq!(name, Symbol::intern("f"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected var application, got {:?}", other),
        }
    }

    #[test]
    fn test_given_constraints() {
        match parse_ty("a -> b given a implements Show, a has {@name b}").kind {
            TypeExprKind::Constrained { base, constraints } => {
                assert!(matches!(base.kind, TypeExprKind::Function { .. }));
                assert_eq!(constraints.len(), 2);
                assert!(matches!(constraints[0], ConstraintExpr::Implements { .. }));
                assert!(matches!(constraints[1], ConstraintExpr::HasField { .. }));
            }
            other => panic!("expected constrained, got {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_function_argument() {
        // (a -> b) -> List a -> List b
        match parse_ty("(a -> b) -> List a -> List b").kind {
            TypeExprKind::Function { param, .. } => {
                assert!(matches!(param.kind, TypeExprKind::Function { .. }));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }
}
