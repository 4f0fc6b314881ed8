//! nooc-par - AST Node Definitions
//!
//! This module contains all AST node definitions produced by the parser and
//! consumed by the typer and the evaluator. Every node carries a [`Span`].
//!
//! A program is a sequence of top-level statements; statements and
//! expressions are the same syntactic category (a definition `x = e` is an
//! expression of type Unit whose binding scopes over the rest of the
//! sequence).

use nooc_util::{Span, Symbol};

/// AST root - a source file is a list of statements in source order.
pub type Program = Vec<Expr>;

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Literal),

    /// Variable reference
    Variable(Symbol),

    /// Lambda `fn p1 p2 => body`; multi-parameter surface form, typed and
    /// evaluated as nested single-parameter functions
    Function { params: Vec<Symbol>, body: Box<Expr> },

    /// Application by juxtaposition, one argument at a time:
    /// `f x y` parses as `(f x) y`
    Application { func: Box<Expr>, arg: Box<Expr> },

    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `if c then t else e`
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `match scrutinee with (pat => body; ...)`
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },

    /// Record literal `{@x 1, @y 2}`; field order preserved
    Record { fields: Vec<(Symbol, Expr)> },

    /// Tuple literal `{1, "a"}`
    Tuple { elements: Vec<Expr> },

    /// List literal `[1, 2, 3]`
    List { elements: Vec<Expr> },

    /// Accessor `@f` or optional accessor `@f?` as a first-class function
    Accessor { field: Symbol, optional: bool },

    /// Definition `x = e`; binds `x` for the remainder of the sequence
    Definition { name: Symbol, value: Box<Expr> },

    /// Mutable definition `mut x = e`
    MutDefinition { name: Symbol, value: Box<Expr> },

    /// Mutation `x := e`; carries the `mut` effect
    Mutation { name: Symbol, value: Box<Expr> },

    /// Sequence `e1; e2; ...` (parenthesized or top-level)
    Sequence { exprs: Vec<Expr> },

    /// Type annotation `e : T`
    Typed {
        expr: Box<Expr>,
        annotation: TypeExpr,
    },

    /// `constraint Name a ( fn1 : T1; fn2 : T2 )`
    ConstraintDef {
        name: Symbol,
        type_param: Symbol,
        functions: Vec<(Symbol, TypeExpr)>,
    },

    /// `implement Name TypeName ( fn1 = e1; fn2 = e2 )`
    ImplementDef {
        trait_name: Symbol,
        type_name: Symbol,
        functions: Vec<(Symbol, Expr)>,
    },

    /// `type Name a b = alt1 | alt2 | ...`
    ///
    /// Whether the alternatives are variant constructors, union members or
    /// a single alias is decided by the typer (it needs the type
    /// environment); the parser only records the alternatives.
    TypeDef {
        name: Symbol,
        params: Vec<Symbol>,
        alts: Vec<TypeExpr>,
    },

    /// `import "path"` - an expression whose value is the imported module's
    /// final binding environment (a record of its definitions)
    Import { path: String },

    /// `forget e` - erase the type to Unknown
    Forget { expr: Box<Expr> },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// All Noolang numbers are floats
    Number(f64),
    String(String),
    /// `{}`
    Unit,
}

/// Binary operators. The pipe `x | f` is desugared to application by the
/// parser and does not appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// Operator text for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

/// One arm of a match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
    pub span: Span,
}

/// A pattern with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

impl Pattern {
    pub fn new(kind: PatternKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Pattern kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// `_` - matches anything, binds nothing
    Wildcard,

    /// Lowercase identifier - binds the scrutinee
    Variable(Symbol),

    /// Literal pattern
    Literal(Literal),

    /// Constructor pattern `Some x`, `None`, `True`
    Constructor { name: Symbol, args: Vec<Pattern> },

    /// Tuple pattern `{a, b}`
    Tuple { elements: Vec<Pattern> },

    /// Record pattern `{@x a, @y b}`
    Record { fields: Vec<(Symbol, Pattern)> },
}

/// A surface type expression from an annotation, trait signature or type
/// definition. Resolved to an internal type by the typer.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Type expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// Uppercase head with arguments: `Float`, `Option a`, `Result e a`
    Named { name: Symbol, args: Vec<TypeExpr> },

    /// Lowercase head, possibly applied: `a`, `f a` (higher-kinded position)
    Var { name: Symbol, args: Vec<TypeExpr> },

    /// `T -> U` (right associative)
    Function {
        param: Box<TypeExpr>,
        ret: Box<TypeExpr>,
    },

    /// `{T1, T2}`
    Tuple { elements: Vec<TypeExpr> },

    /// `{@f T, ...}`
    Record { fields: Vec<(Symbol, TypeExpr)> },

    /// `T | U`
    Union { members: Vec<TypeExpr> },

    /// `T given a implements Show, a has {@f U}`
    Constrained {
        base: Box<TypeExpr>,
        constraints: Vec<ConstraintExpr>,
    },
}

/// A single clause in a `given` tail.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintExpr {
    /// `a implements Trait`
    Implements { var: Symbol, trait_name: Symbol },

    /// `a has {@field T}`
    HasField {
        var: Symbol,
        field: Symbol,
        ty: TypeExpr,
    },
}
