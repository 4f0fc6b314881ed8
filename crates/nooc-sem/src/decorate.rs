//! The decorated AST.
//!
//! Inference produces a [`TypedExpr`] for every expression: the original
//! node shape plus its inferred type, its effect set, and (on trait
//! function references) the resolved specialization. The evaluator consumes
//! this tree together with the trait registry.
//!
//! `finalize` runs once per top-level statement: it applies the final
//! substitution to every decorated type (so decorated types are stable
//! under further application of the substitution) and stamps trait
//! resolutions that collapsed during inference.

use nooc_par::{BinOp, Literal, Pattern};
use nooc_util::{Span, Symbol};

use crate::effects::EffectSet;
use crate::errors::{TypeError, TypeResult};
use crate::state::InferenceState;
use crate::traits::{type_key, Resolution};
use crate::types::{Type, TypeVarId};

/// An expression decorated with its type and effects.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub span: Span,
    pub ty: Type,
    pub effects: EffectSet,
}

/// One arm of a typed match expression.
#[derive(Debug, Clone)]
pub struct TypedMatchArm {
    pub pattern: Pattern,
    pub body: TypedExpr,
}

/// Decorated expression kinds; mirrors the parser AST with binding and
/// resolution information added.
#[derive(Debug, Clone)]
pub enum TypedExprKind {
    Literal(Literal),

    Variable {
        name: Symbol,
        /// The fresh trait-parameter variable, when this reference
        /// instantiated a trait function scheme
        trait_var: Option<TypeVarId>,
        /// `(trait, type key)` once resolution collapsed; the evaluator
        /// selects the implementation with this
        resolution: Option<(Symbol, Symbol)>,
    },

    Function {
        param: Symbol,
        body: Box<TypedExpr>,
    },

    Application {
        func: Box<TypedExpr>,
        arg: Box<TypedExpr>,
    },

    Binary {
        op: BinOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },

    If {
        cond: Box<TypedExpr>,
        then_branch: Box<TypedExpr>,
        else_branch: Box<TypedExpr>,
    },

    Match {
        scrutinee: Box<TypedExpr>,
        arms: Vec<TypedMatchArm>,
    },

    Record {
        fields: Vec<(Symbol, TypedExpr)>,
    },

    Tuple {
        elements: Vec<TypedExpr>,
    },

    List {
        elements: Vec<TypedExpr>,
    },

    Accessor {
        field: Symbol,
        optional: bool,
    },

    Definition {
        name: Symbol,
        value: Box<TypedExpr>,
    },

    MutDefinition {
        name: Symbol,
        value: Box<TypedExpr>,
    },

    Mutation {
        name: Symbol,
        value: Box<TypedExpr>,
    },

    Sequence {
        exprs: Vec<TypedExpr>,
    },

    /// Registry statements; the registry itself was already updated
    ConstraintDef {
        name: Symbol,
    },
    ImplementDef {
        trait_name: Symbol,
        type_name: Symbol,
    },
    TypeDef {
        name: Symbol,
    },

    /// An import carries the typed module body; evaluating it yields a
    /// record of the module's top-level definitions
    Import {
        path: String,
        program: Vec<TypedExpr>,
        names: Vec<Symbol>,
    },

    Forget {
        expr: Box<TypedExpr>,
    },
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, span: Span, ty: Type, effects: EffectSet) -> Self {
        Self {
            kind,
            span,
            ty,
            effects,
        }
    }
}

/// Apply the final substitution to every decorated type in the tree and
/// stamp collapsed trait resolutions onto variable nodes. A collapsed call
/// whose function name is claimed by two traits for the same type is the
/// ambiguity error.
pub fn finalize(state: &InferenceState, expr: &mut TypedExpr) -> TypeResult<()> {
    expr.ty = state.subst.apply(&expr.ty);

    if let TypedExprKind::Variable {
        name,
        trait_var: Some(var),
        resolution,
    } = &mut expr.kind
    {
        if resolution.is_none() {
            let target = state.subst.walk(*var);
            if let Some(key) = type_key(&target) {
                match state.registry.resolve(*name, key) {
                    Resolution::Found {
                        trait_name,
                        type_name,
                    } => *resolution = Some((trait_name, type_name)),
                    Resolution::Ambiguous { first, second } => {
                        return Err(TypeError::AmbiguousTraitResolution {
                            function: *name,
                            first,
                            second,
                            span: expr.span,
                        })
                    }
                    Resolution::NotFound => {}
                }
            }
        }
    }

    match &mut expr.kind {
        TypedExprKind::Function { body, .. } | TypedExprKind::Forget { expr: body } => {
            finalize(state, body)
        }
        TypedExprKind::Application { func, arg } => {
            finalize(state, func)?;
            finalize(state, arg)
        }
        TypedExprKind::Binary { left, right, .. } => {
            finalize(state, left)?;
            finalize(state, right)
        }
        TypedExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            finalize(state, cond)?;
            finalize(state, then_branch)?;
            finalize(state, else_branch)
        }
        TypedExprKind::Match { scrutinee, arms } => {
            finalize(state, scrutinee)?;
            for arm in arms {
                finalize(state, &mut arm.body)?;
            }
            Ok(())
        }
        TypedExprKind::Record { fields } => {
            for (_, value) in fields {
                finalize(state, value)?;
            }
            Ok(())
        }
        TypedExprKind::Tuple { elements } | TypedExprKind::List { elements } => {
            for element in elements {
                finalize(state, element)?;
            }
            Ok(())
        }
        TypedExprKind::Definition { value, .. }
        | TypedExprKind::MutDefinition { value, .. }
        | TypedExprKind::Mutation { value, .. } => finalize(state, value),
        TypedExprKind::Sequence { exprs } | TypedExprKind::Import { program: exprs, .. } => {
            for e in exprs {
                finalize(state, e)?;
            }
            Ok(())
        }
        TypedExprKind::Literal(_)
        | TypedExprKind::Variable { .. }
        | TypedExprKind::Accessor { .. }
        | TypedExprKind::ConstraintDef { .. }
        | TypedExprKind::ImplementDef { .. }
        | TypedExprKind::TypeDef { .. } => Ok(()),
    }
}
