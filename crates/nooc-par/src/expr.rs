//! Expression parsing using Pratt Parsing (Top-Down Operator Precedence)
//! for binary operators and plain recursive descent for everything else.

use nooc_lex::TokenKind;

use crate::ast::*;
use crate::Parser;

/// Binding power levels for Pratt parsing.
/// Higher numbers = tighter binding (higher precedence).
#[doc(hidden)]
pub mod bp {
    /// Minimum binding power (start of expression)
    pub const MIN: u8 = 0;

    /// Comparison: ==, !=, <, <=, >, >=
    pub const COMPARISON: u8 = 2;

    /// Additive: +, -
    pub const ADDITIVE: u8 = 4;

    /// Multiplicative: *, /
    pub const MULTIPLICATIVE: u8 = 6;
}

impl<'a> Parser<'a> {
    /// Main expression entry point: pipe chain with an optional trailing
    /// type annotation.
    pub fn parse_expr(&mut self) -> Option<Expr> {
        let expr = self.parse_pipe()?;

        if self.check(&TokenKind::Colon) {
            self.advance();
            let annotation = self.parse_type()?;
            let span = expr.span.to(annotation.span);
            return Some(Expr::new(
                ExprKind::Typed {
                    expr: Box::new(expr),
                    annotation,
                },
                span,
            ));
        }

        Some(expr)
    }

    /// Pipe chain: `x | f | g` desugars to `g (f x)`.
    fn parse_pipe(&mut self) -> Option<Expr> {
        let mut expr = self.parse_binary(bp::MIN)?;

        while self.check(&TokenKind::Pipe) {
            self.advance();
            let func = self.parse_binary(bp::MIN)?;
            let span = expr.span.to(func.span);
            expr = Expr::new(
                ExprKind::Application {
                    func: Box::new(func),
                    arg: Box::new(expr),
                },
                span,
            );
        }

        Some(expr)
    }

    /// Pratt parser core for binary operators.
    ///
    /// Left-associative operators get `right_bp = left_bp + 1` so
    /// `a - b - c` parses as `(a - b) - c`.
    fn parse_binary(&mut self, min_bp: u8) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        loop {
            let (op, left_bp) = match self.peek_kind() {
                TokenKind::EqEq => (BinOp::Eq, bp::COMPARISON),
                TokenKind::NotEq => (BinOp::Ne, bp::COMPARISON),
                TokenKind::Lt => (BinOp::Lt, bp::COMPARISON),
                TokenKind::Le => (BinOp::Le, bp::COMPARISON),
                TokenKind::Gt => (BinOp::Gt, bp::COMPARISON),
                TokenKind::Ge => (BinOp::Ge, bp::COMPARISON),
                TokenKind::Plus => (BinOp::Add, bp::ADDITIVE),
                TokenKind::Minus => (BinOp::Sub, bp::ADDITIVE),
                TokenKind::Star => (BinOp::Mul, bp::MULTIPLICATIVE),
                TokenKind::Slash => (BinOp::Div, bp::MULTIPLICATIVE),
                _ => break,
            };
            if left_bp < min_bp {
                break;
            }
            self.advance();
            let right = self.parse_binary(left_bp + 1)?;
            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Some(left)
    }

    /// Prefix forms: lambda, if, match, forget, import, unary minus, or an
    /// application chain of atoms.
    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.peek_kind() {
            TokenKind::Fn => self.parse_lambda(),
            TokenKind::If => self.parse_if(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Forget => {
                let start = self.peek_span();
                self.advance();
                let expr = self.parse_prefix()?;
                let span = start.to(expr.span);
                Some(Expr::new(
                    ExprKind::Forget {
                        expr: Box::new(expr),
                    },
                    span,
                ))
            }
            TokenKind::Import => {
                let start = self.peek_span();
                self.advance();
                match self.peek_kind().clone() {
                    TokenKind::Str(path) => {
                        let span = start.to(self.peek_span());
                        self.advance();
                        Some(Expr::new(ExprKind::Import { path }, span))
                    }
                    other => {
                        self.error_at_current(format!(
                            "expected a string path after `import`, found {}",
                            other.describe()
                        ));
                        None
                    }
                }
            }
            TokenKind::Minus => {
                // Unary minus on a numeric literal only
                let start = self.peek_span();
                self.advance();
                match self.peek_kind() {
                    TokenKind::Number(n) => {
                        let n = *n;
                        let span = start.to(self.peek_span());
                        self.advance();
                        Some(Expr::new(ExprKind::Literal(Literal::Number(-n)), span))
                    }
                    _ => {
                        self.error_at_current("`-` is only a prefix on number literals");
                        None
                    }
                }
            }
            _ => self.parse_application(),
        }
    }

    /// Application by juxtaposition: `f x y` = `(f x) y`.
    fn parse_application(&mut self) -> Option<Expr> {
        let mut expr = self.parse_atom()?;

        while self.starts_atom() {
            let arg = self.parse_atom()?;
            let span = expr.span.to(arg.span);
            expr = Expr::new(
                ExprKind::Application {
                    func: Box::new(expr),
                    arg: Box::new(arg),
                },
                span,
            );
        }

        Some(expr)
    }

    /// True when the current token can begin an application argument.
    fn starts_atom(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::Ident(_)
                | TokenKind::Accessor(_)
                | TokenKind::AccessorOpt(_)
                | TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::LBracket
        )
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        let span = self.peek_span();
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::Number(n)), span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::String(s)), span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Variable(name), span))
            }
            TokenKind::Accessor(field) => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Accessor {
                        field,
                        optional: false,
                    },
                    span,
                ))
            }
            TokenKind::AccessorOpt(field) => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Accessor {
                        field,
                        optional: true,
                    },
                    span,
                ))
            }
            TokenKind::LParen => self.parse_paren_sequence(),
            TokenKind::LBrace => self.parse_braced(),
            TokenKind::LBracket => self.parse_list(),
            other => {
                self.error_at_current(format!("expected an expression, found {}", other.describe()));
                None
            }
        }
    }

    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.advance(); // fn

        let mut params = Vec::new();
        while let TokenKind::Ident(name) = self.peek_kind() {
            params.push(*name);
            self.advance();
        }
        if params.is_empty() {
            self.error_at_current("`fn` needs at least one parameter");
            return None;
        }

        self.expect(&TokenKind::FatArrow)?;
        let body = self.parse_expr()?;
        let span = start.to(body.span);
        Some(Expr::new(
            ExprKind::Function {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_if(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.advance(); // if
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Then)?;
        let then_branch = self.parse_expr()?;
        self.expect(&TokenKind::Else)?;
        let else_branch = self.parse_expr()?;
        let span = start.to(else_branch.span);
        Some(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn parse_match(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.advance(); // match
        let scrutinee = self.parse_pipe()?;
        self.expect(&TokenKind::With)?;
        self.expect(&TokenKind::LParen)?;

        let mut arms = Vec::new();
        loop {
            let arm_start = self.peek_span();
            let pattern = self.parse_pattern()?;
            self.expect(&TokenKind::FatArrow)?;
            let body = self.parse_expr()?;
            let arm_span = arm_start.to(body.span);
            arms.push(MatchArm {
                pattern,
                body,
                span: arm_span,
            });
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
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms,
            },
            start.to(end),
        ))
    }

    /// `( stmt; stmt; ... )` - a parenthesized sequence. A single statement
    /// is just itself; multiple become a `Sequence`.
    fn parse_paren_sequence(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.advance(); // (

        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_statement()?);
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
        let span = start.to(end);

        if exprs.len() == 1 {
            Some(exprs.into_iter().next().unwrap())
        } else {
            Some(Expr::new(ExprKind::Sequence { exprs }, span))
        }
    }

    /// `{}` unit, `{@f v, ...}` record, `{a, b}` tuple.
    fn parse_braced(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.advance(); // {

        if self.check(&TokenKind::RBrace) {
            let end = self.peek_span();
            self.advance();
            return Some(Expr::new(ExprKind::Literal(Literal::Unit), start.to(end)));
        }

        if matches!(self.peek_kind(), TokenKind::Accessor(_)) {
            // Record literal
            let mut fields = Vec::new();
            loop {
                let field = match self.peek_kind() {
                    TokenKind::Accessor(f) => *f,
                    _ => {
                        self.error_at_current("expected `@field` in record literal");
                        return None;
                    }
                };
                self.advance();
                let value = self.parse_expr()?;
                fields.push((field, value));
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let end = self.peek_span();
            self.expect(&TokenKind::RBrace)?;
            return Some(Expr::new(ExprKind::Record { fields }, start.to(end)));
        }

        // Tuple literal
        let mut elements = Vec::new();
        loop {
            elements.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace)?;
        Some(Expr::new(ExprKind::Tuple { elements }, start.to(end)))
    }

    fn parse_list(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        self.advance(); // [

        let mut elements = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expr()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBracket)?;
        Some(Expr::new(ExprKind::List { elements }, start.to(end)))
    }

}
