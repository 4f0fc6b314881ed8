//! The inference driver.
//!
//! Walks the AST bottom-up, producing a decorated [`TypedExpr`] for every
//! expression along with the current substitution and effect sets. The
//! rules follow classic Hindley-Milner let-polymorphism with three
//! Noolang-specific twists:
//!
//! - constraints (traits and structural `has`) are attached to variables
//!   during inference and collapse eagerly when an application binds the
//!   variable to something concrete;
//! - lambdas are never generalized in expression position, only definition
//!   statements generalize;
//! - every expression also gets an effect set, computed as the union of its
//!   children's sets (lambdas reset to empty and carry their body's effects
//!   latently in their function type).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use nooc_par::{BinOp, ConstraintExpr, Expr, ExprKind, Literal, Pattern, PatternKind, TypeExpr,
    TypeExprKind};
use nooc_util::{FxHashMap, Handler, Span, Symbol};

use crate::decorate::{finalize, TypedExpr, TypedExprKind, TypedMatchArm};
use crate::effects::{Effect, EffectSet};
use crate::errors::{TypeError, TypeResult};
use crate::state::{InferenceState, TypeConInfo};
use crate::traits::{TraitDefinition, TraitImplementation};
use crate::types::{Constraint, ConstraintMap, Scheme, Type, TypeVarId};

/// Type a whole program, statement by statement. Stops at the first error
/// (batch behavior; the REPL calls [`infer_statement`] itself to continue
/// past failures).
pub fn infer_program(state: &mut InferenceState, program: &[Expr]) -> TypeResult<Vec<TypedExpr>> {
    program
        .iter()
        .map(|stmt| infer_statement(state, stmt))
        .collect()
}

/// Type one top-level statement: infer, normalize residual constraints,
/// apply the final substitution to the decoration.
pub fn infer_statement(state: &mut InferenceState, stmt: &Expr) -> TypeResult<TypedExpr> {
    let mut typed = infer_expr(state, stmt)?;
    state.normalize_constraints(stmt.span)?;
    finalize(state, &mut typed)?;
    Ok(typed)
}

/// Infer one expression.
pub fn infer_expr(state: &mut InferenceState, expr: &Expr) -> TypeResult<TypedExpr> {
    let span = expr.span;
    match &expr.kind {
        ExprKind::Literal(lit) => {
            let ty = literal_type(lit);
            Ok(TypedExpr::new(
                TypedExprKind::Literal(lit.clone()),
                span,
                ty,
                EffectSet::EMPTY,
            ))
        }

        ExprKind::Variable(name) => infer_variable(state, *name, span),

        ExprKind::Function { params, body } => infer_lambda(state, params, body, span),

        ExprKind::Application { func, arg } => infer_application(state, func, arg, span),

        ExprKind::Binary { op, left, right } => infer_binary(state, *op, left, right, span),

        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond_t = infer_expr(state, cond)?;
            state.unify(&cond_t.ty, &Type::bool(), cond.span)?;
            let then_t = infer_expr(state, then_branch)?;
            let else_t = infer_expr(state, else_branch)?;
            state.unify(&then_t.ty, &else_t.ty, span)?;
            let ty = then_t.ty.clone();
            let effects = cond_t.effects.union(then_t.effects).union(else_t.effects);
            Ok(TypedExpr::new(
                TypedExprKind::If {
                    cond: Box::new(cond_t),
                    then_branch: Box::new(then_t),
                    else_branch: Box::new(else_t),
                },
                span,
                ty,
                effects,
            ))
        }

        ExprKind::Match { scrutinee, arms } => infer_match(state, scrutinee, arms, span),

        ExprKind::Record { fields } => {
            let mut typed_fields = Vec::new();
            let mut field_types = IndexMap::new();
            let mut effects = EffectSet::EMPTY;
            for (name, value) in fields {
                let typed = infer_expr(state, value)?;
                effects = effects.union(typed.effects);
                field_types.insert(*name, typed.ty.clone());
                typed_fields.push((*name, typed));
            }
            Ok(TypedExpr::new(
                TypedExprKind::Record {
                    fields: typed_fields,
                },
                span,
                Type::Record(field_types),
                effects,
            ))
        }

        ExprKind::Tuple { elements } => {
            let mut typed_elems = Vec::new();
            let mut types = Vec::new();
            let mut effects = EffectSet::EMPTY;
            for element in elements {
                let typed = infer_expr(state, element)?;
                effects = effects.union(typed.effects);
                types.push(typed.ty.clone());
                typed_elems.push(typed);
            }
            Ok(TypedExpr::new(
                TypedExprKind::Tuple {
                    elements: typed_elems,
                },
                span,
                Type::Tuple(types),
                effects,
            ))
        }

        ExprKind::List { elements } => {
            let elem_ty = state.fresh_ty();
            let mut typed_elems = Vec::new();
            let mut effects = EffectSet::EMPTY;
            for element in elements {
                let typed = infer_expr(state, element)?;
                state.unify(&elem_ty, &typed.ty, element.span)?;
                effects = effects.union(typed.effects);
                typed_elems.push(typed);
            }
            Ok(TypedExpr::new(
                TypedExprKind::List {
                    elements: typed_elems,
                },
                span,
                Type::List(Box::new(elem_ty)),
                effects,
            ))
        }

        ExprKind::Accessor { field, optional } => {
            let ty = accessor_type(state, *field, *optional);
            Ok(TypedExpr::new(
                TypedExprKind::Accessor {
                    field: *field,
                    optional: *optional,
                },
                span,
                ty,
                EffectSet::EMPTY,
            ))
        }

        ExprKind::Definition { name, value } => infer_definition(state, *name, value, span),

        ExprKind::MutDefinition { name, value } => {
            let value_t = infer_expr(state, value)?;
            // Mutable bindings stay monomorphic (the value restriction).
            let ty = state.subst.apply(&value_t.ty);
            state.define(*name, Scheme::mono(ty.clone()), true);
            let effects = value_t.effects.union(EffectSet::single(Effect::State));
            Ok(TypedExpr::new(
                TypedExprKind::MutDefinition {
                    name: *name,
                    value: Box::new(value_t),
                },
                span,
                ty,
                effects,
            ))
        }

        ExprKind::Mutation { name, value } => {
            let entry = state
                .env
                .lookup(*name)
                .cloned()
                .ok_or(TypeError::UnknownVariable { name: *name, span })?;
            if !entry.mutable {
                return Err(TypeError::TypeMismatch {
                    expected: format!("a mutable binding (`mut {} = ...`)", name),
                    found: format!("immutable `{}`", name),
                    span,
                });
            }
            let value_t = infer_expr(state, value)?;
            state.unify(&entry.scheme.ty, &value_t.ty, span)?;
            let effects = value_t.effects.union(EffectSet::single(Effect::Mut));
            Ok(TypedExpr::new(
                TypedExprKind::Mutation {
                    name: *name,
                    value: Box::new(value_t),
                },
                span,
                Type::Unit,
                effects,
            ))
        }

        ExprKind::Sequence { exprs } => {
            state.env.push_scope();
            let mut typed = Vec::new();
            let mut effects = EffectSet::EMPTY;
            for e in exprs {
                let t = infer_expr(state, e)?;
                effects = effects.union(t.effects);
                typed.push(t);
            }
            state.env.pop_scope();
            let ty = typed
                .last()
                .map(|t| t.ty.clone())
                .unwrap_or(Type::Unit);
            Ok(TypedExpr::new(
                TypedExprKind::Sequence { exprs: typed },
                span,
                ty,
                effects,
            ))
        }

        ExprKind::Typed { expr, annotation } => infer_annotated(state, expr, annotation, span),

        ExprKind::ConstraintDef {
            name,
            type_param,
            functions,
        } => infer_constraint_def(state, *name, *type_param, functions, span),

        ExprKind::ImplementDef {
            trait_name,
            type_name,
            functions,
        } => infer_implement_def(state, *trait_name, *type_name, functions, span),

        ExprKind::TypeDef { name, params, alts } => {
            infer_type_def(state, *name, params, alts, span)
        }

        ExprKind::Import { path } => infer_import(state, path, span),

        ExprKind::Forget { expr } => {
            let inner = infer_expr(state, expr)?;
            let effects = inner.effects;
            Ok(TypedExpr::new(
                TypedExprKind::Forget {
                    expr: Box::new(inner),
                },
                span,
                Type::Unknown,
                effects,
            ))
        }
    }
}

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Number(_) => Type::Float,
        Literal::String(_) => Type::String,
        Literal::Unit => Type::Unit,
    }
}

/// `@f` : `a -> b given a has {@f b}`; `@f?` : `a -> Option b` (total).
fn accessor_type(state: &mut InferenceState, field: Symbol, optional: bool) -> Type {
    let record_var = state.fresh();
    let field_ty = state.fresh_ty();
    if optional {
        Type::func(Type::Var(record_var), Type::option(field_ty))
    } else {
        state.attach(
            record_var,
            Constraint::HasField {
                field,
                ty: field_ty.clone(),
            },
        );
        let mut constraints = ConstraintMap::new();
        constraints.insert(
            record_var,
            vec![Constraint::HasField {
                field,
                ty: field_ty.clone(),
            }],
        );
        Type::Function {
            params: vec![Type::Var(record_var)],
            ret: Box::new(field_ty),
            constraints,
            effects: EffectSet::EMPTY,
        }
    }
}

fn infer_variable(state: &mut InferenceState, name: Symbol, span: Span) -> TypeResult<TypedExpr> {
    if let Some(entry) = state.env.lookup(name).cloned() {
        let ty = state.instantiate(&entry.scheme);
        return Ok(TypedExpr::new(
            TypedExprKind::Variable {
                name,
                trait_var: None,
                resolution: None,
            },
            span,
            ty,
            EffectSet::EMPTY,
        ));
    }

    // Not in the environment: a trait function reference?
    if let Some((def, scheme)) = state
        .registry
        .function_scheme(name)
        .map(|(d, s)| (d.clone(), s.clone()))
    {
        let (ty, mapping) = state.instantiate_with_map(&scheme);
        // The trait parameter is the quantified variable carrying the
        // Implements constraint for this trait.
        let trait_var = scheme
            .constraints
            .iter()
            .find(|(_, cs)| {
                cs.iter().any(|c| {
                    matches!(c, Constraint::Implements { trait_name } if *trait_name == def.name)
                })
            })
            .and_then(|(var, _)| mapping.get(var))
            .copied();
        return Ok(TypedExpr::new(
            TypedExprKind::Variable {
                name,
                trait_var,
                resolution: None,
            },
            span,
            ty,
            EffectSet::EMPTY,
        ));
    }

    Err(TypeError::UnknownVariable { name, span })
}

/// Lambdas desugar to nested single-parameter functions. Each level's
/// function type carries the body's effect set latently; the lambda node
/// itself is pure (effects happen at application time).
fn infer_lambda(
    state: &mut InferenceState,
    params: &[Symbol],
    body: &Expr,
    span: Span,
) -> TypeResult<TypedExpr> {
    let (first, rest) = params
        .split_first()
        .expect("parser guarantees at least one parameter");

    let param_var = state.fresh();
    state.env.push_scope();
    state.define(*first, Scheme::mono(Type::Var(param_var)), false);
    let body_t = if rest.is_empty() {
        infer_expr(state, body)?
    } else {
        infer_lambda(state, rest, body, span)?
    };
    state.env.pop_scope();

    // Collect constraints whose variables appear free in the parameter or
    // return type; they travel with the function value.
    let fn_ty_bare = Type::func(Type::Var(param_var), body_t.ty.clone());
    let mut constraints = ConstraintMap::new();
    for var in state.subst.apply(&fn_ty_bare).free_vars() {
        if let Some(cs) = state.var_constraints.get(&var) {
            constraints.insert(var, cs.clone());
        }
    }

    let ty = Type::Function {
        params: vec![Type::Var(param_var)],
        ret: Box::new(body_t.ty.clone()),
        constraints,
        effects: body_t.effects,
    };

    Ok(TypedExpr::new(
        TypedExprKind::Function {
            param: *first,
            body: Box::new(body_t),
        },
        span,
        ty,
        EffectSet::EMPTY,
    ))
}

fn infer_application(
    state: &mut InferenceState,
    func: &Expr,
    arg: &Expr,
    span: Span,
) -> TypeResult<TypedExpr> {
    // Optional accessor applications are total: they type by inspection of
    // the argument rather than through a `has` constraint.
    if let ExprKind::Accessor {
        field,
        optional: true,
    } = &func.kind
    {
        return infer_optional_access(state, *field, func, arg, span);
    }

    let func_t = infer_expr(state, func)?;
    let arg_t = infer_expr(state, arg)?;

    // `at i unknown` eliminates Unknown into Option Unknown.
    if is_at_partial(func) && state.subst.apply(&arg_t.ty) == Type::Unknown {
        let effects = func_t.effects.union(arg_t.effects);
        return Ok(TypedExpr::new(
            TypedExprKind::Application {
                func: Box::new(func_t),
                arg: Box::new(arg_t),
            },
            span,
            Type::option(Type::Unknown),
            effects,
        ));
    }

    let param_ty = state.fresh_ty();
    let ret_ty = state.fresh_ty();
    let expected = Type::func(param_ty.clone(), ret_ty.clone());
    state.unify(&func_t.ty, &expected, span)?;
    state.unify(&param_ty, &arg_t.ty, arg.span)?;

    // Eager collapse: any constraint whose variable just became concrete is
    // discharged now; failures are this application's type error.
    state.collapse_constraints(span)?;

    // Latent effects of the function being applied
    let latent = match state.subst.apply(&func_t.ty) {
        Type::Function { effects, .. } => effects,
        _ => EffectSet::EMPTY,
    };
    let effects = func_t.effects.union(arg_t.effects).union(latent);

    Ok(TypedExpr::new(
        TypedExprKind::Application {
            func: Box::new(func_t),
            arg: Box::new(arg_t),
        },
        span,
        ret_ty,
        effects,
    ))
}

/// True when `expr` is `at i` (the partial application of the list-index
/// builtin), used for the Unknown elimination special case.
fn is_at_partial(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Application { func, .. } => {
            matches!(&func.kind, ExprKind::Variable(name) if name.as_str() == "at")
        }
        _ => false,
    }
}

/// `@f? x` : Option of the member type when the shape is known, Option of
/// a fresh variable otherwise; on Unknown, `Option Unknown`.
fn infer_optional_access(
    state: &mut InferenceState,
    field: Symbol,
    func: &Expr,
    arg: &Expr,
    span: Span,
) -> TypeResult<TypedExpr> {
    let arg_t = infer_expr(state, arg)?;
    let inner = match state.subst.apply(&arg_t.ty) {
        Type::Unknown => Type::Unknown,
        Type::Record(fields) => fields
            .get(&field)
            .cloned()
            .unwrap_or_else(|| state.fresh_ty()),
        _ => state.fresh_ty(),
    };
    let result = Type::option(inner);
    let func_t = TypedExpr::new(
        TypedExprKind::Accessor {
            field,
            optional: true,
        },
        func.span,
        Type::func(arg_t.ty.clone(), result.clone()),
        EffectSet::EMPTY,
    );
    let effects = arg_t.effects;
    Ok(TypedExpr::new(
        TypedExprKind::Application {
            func: Box::new(func_t),
            arg: Box::new(arg_t),
        },
        span,
        result,
        effects,
    ))
}

fn infer_binary(
    state: &mut InferenceState,
    op: BinOp,
    left: &Expr,
    right: &Expr,
    span: Span,
) -> TypeResult<TypedExpr> {
    let left_t = infer_expr(state, left)?;
    let right_t = infer_expr(state, right)?;

    // Direct operators never apply to untagged unions or Unknown; check
    // before unification so the message names the offending operand type.
    for operand in [&left_t, &right_t] {
        match state.subst.apply(&operand.ty) {
            Type::Union(_) => {
                return Err(TypeError::UnionOperationRequiresMatch {
                    op: op.as_str().into(),
                    ty: state.render(&operand.ty),
                    span,
                })
            }
            Type::Unknown => {
                return Err(TypeError::UnknownOperationRequiresAdapter {
                    op: op.as_str().into(),
                    span,
                })
            }
            _ => {}
        }
    }

    state.unify(&left_t.ty, &right_t.ty, span)?;
    let operand_ty = state.subst.apply(&left_t.ty);

    let ty = match op {
        BinOp::Add => match operand_ty {
            Type::Float => Type::Float,
            Type::String => Type::String,
            Type::Var(_) => {
                // Default numeric
                state.unify(&left_t.ty, &Type::Float, span)?;
                Type::Float
            }
            other => {
                return Err(TypeError::TypeMismatch {
                    expected: "Float or String".into(),
                    found: state.render(&other),
                    span,
                })
            }
        },
        BinOp::Sub | BinOp::Mul | BinOp::Div => match operand_ty {
            Type::Float => Type::Float,
            Type::Var(_) => {
                state.unify(&left_t.ty, &Type::Float, span)?;
                Type::Float
            }
            other => {
                return Err(TypeError::TypeMismatch {
                    expected: "Float".into(),
                    found: state.render(&other),
                    span,
                })
            }
        },
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => match operand_ty {
            Type::Float | Type::String => Type::bool(),
            Type::Var(_) => {
                state.unify(&left_t.ty, &Type::Float, span)?;
                Type::bool()
            }
            other => {
                return Err(TypeError::TypeMismatch {
                    expected: "Float or String".into(),
                    found: state.render(&other),
                    span,
                })
            }
        },
        BinOp::Eq | BinOp::Ne => Type::bool(),
    };

    let effects = left_t.effects.union(right_t.effects);
    Ok(TypedExpr::new(
        TypedExprKind::Binary {
            op,
            left: Box::new(left_t),
            right: Box::new(right_t),
        },
        span,
        ty,
        effects,
    ))
}

fn infer_match(
    state: &mut InferenceState,
    scrutinee: &Expr,
    arms: &[nooc_par::MatchArm],
    span: Span,
) -> TypeResult<TypedExpr> {
    let scrutinee_t = infer_expr(state, scrutinee)?;
    let result_ty = state.fresh_ty();
    let mut effects = scrutinee_t.effects;
    let mut typed_arms = Vec::new();

    for arm in arms {
        state.env.push_scope();
        let pattern_ty = infer_pattern(state, &arm.pattern)?;
        state.unify(&pattern_ty, &scrutinee_t.ty, arm.pattern.span)?;
        let body_t = infer_expr(state, &arm.body)?;
        state.env.pop_scope();
        state.unify(&result_ty, &body_t.ty, arm.body.span)?;
        effects = effects.union(body_t.effects);
        typed_arms.push(TypedMatchArm {
            pattern: arm.pattern.clone(),
            body: body_t,
        });
    }

    Ok(TypedExpr::new(
        TypedExprKind::Match {
            scrutinee: Box::new(scrutinee_t),
            arms: typed_arms,
        },
        span,
        result_ty,
        effects,
    ))
}

/// Infer a pattern's type, binding its variables in the current scope.
fn infer_pattern(state: &mut InferenceState, pattern: &Pattern) -> TypeResult<Type> {
    let span = pattern.span;
    match &pattern.kind {
        PatternKind::Wildcard => Ok(state.fresh_ty()),

        PatternKind::Variable(name) => {
            let ty = state.fresh_ty();
            state.define(*name, Scheme::mono(ty.clone()), false);
            Ok(ty)
        }

        PatternKind::Literal(lit) => Ok(literal_type(lit)),

        PatternKind::Constructor { name, args } => {
            let entry = state.env.lookup(*name).cloned().ok_or_else(|| {
                TypeError::PatternMismatch {
                    message: format!("unknown constructor `{}`", name),
                    span,
                }
            })?;
            let mut ty = state.instantiate(&entry.scheme);
            for arg in args {
                let applied = state.subst.apply(&ty);
                match applied {
                    Type::Function { params, ret, .. } => {
                        let arg_ty = infer_pattern(state, arg)?;
                        state.unify(&params[0], &arg_ty, arg.span)?;
                        ty = *ret;
                    }
                    _ => {
                        return Err(TypeError::PatternMismatch {
                            message: format!("too many arguments to constructor `{}`", name),
                            span,
                        })
                    }
                }
            }
            if matches!(state.subst.apply(&ty), Type::Function { .. }) {
                return Err(TypeError::PatternMismatch {
                    message: format!("constructor `{}` is missing arguments", name),
                    span,
                });
            }
            Ok(ty)
        }

        PatternKind::Tuple { elements } => {
            let mut types = Vec::new();
            for element in elements {
                types.push(infer_pattern(state, element)?);
            }
            Ok(Type::Tuple(types))
        }

        PatternKind::Record { fields } => {
            // Record patterns are exact: they must name every field of the
            // matched record.
            let mut field_types = IndexMap::new();
            for (name, pat) in fields {
                field_types.insert(*name, infer_pattern(state, pat)?);
            }
            Ok(Type::Record(field_types))
        }
    }
}

fn infer_definition(
    state: &mut InferenceState,
    name: Symbol,
    value: &Expr,
    span: Span,
) -> TypeResult<TypedExpr> {
    let value_t = if matches!(value.kind, ExprKind::Function { .. }) {
        // Pre-bind the name in a throwaway scope so the lambda can recurse;
        // the binding is monomorphic during its own inference and must be
        // gone again before generalization (it would otherwise pin the
        // lambda's variables as free-in-env).
        let self_ty = state.fresh_ty();
        state.env.push_scope();
        state.define(name, Scheme::mono(self_ty.clone()), false);
        let result = infer_expr(state, value);
        state.env.pop_scope();
        let value_t = result?;
        state.unify(&self_ty, &value_t.ty, span)?;
        value_t
    } else {
        infer_expr(state, value)?
    };

    let scheme = state.generalize(&value_t.ty);
    state.define(name, scheme, false);

    let ty = value_t.ty.clone();
    let effects = value_t.effects;
    Ok(TypedExpr::new(
        TypedExprKind::Definition {
            name,
            value: Box::new(value_t),
        },
        span,
        ty,
        effects,
    ))
}

fn infer_annotated(
    state: &mut InferenceState,
    expr: &Expr,
    annotation: &TypeExpr,
    span: Span,
) -> TypeResult<TypedExpr> {
    let inner = infer_expr(state, expr)?;

    let mut vars = FxHashMap::default();
    let mut constraints = ConstraintMap::new();
    let ann_ty = resolve_type_expr(state, annotation, &mut vars, &mut constraints)?;
    state.absorb_constraints(&constraints);

    let result_ty = match &ann_ty {
        // Union-member annotation injects the value into the union: the
        // expression's type IS the union; membership is checked but the
        // member is not refined back out.
        Type::Union(_) => {
            let mut trial = state.clone();
            trial.unify(&inner.ty, &ann_ty, span)?;
            ann_ty
        }
        _ => {
            state.unify(&inner.ty, &ann_ty, span)?;
            ann_ty
        }
    };

    Ok(TypedExpr::new(
        inner.kind,
        span,
        result_ty,
        inner.effects,
    ))
}

fn infer_constraint_def(
    state: &mut InferenceState,
    name: Symbol,
    type_param: Symbol,
    functions: &[(Symbol, TypeExpr)],
    span: Span,
) -> TypeResult<TypedExpr> {
    let mut fn_schemes = IndexMap::new();
    for (fn_name, sig) in functions {
        let mut vars = FxHashMap::default();
        let param_var = state.fresh();
        vars.insert(type_param, param_var);

        let mut constraints = ConstraintMap::new();
        let ty = resolve_type_expr(state, sig, &mut vars, &mut constraints)?;
        constraints
            .entry(param_var)
            .or_default()
            .push(Constraint::Implements { trait_name: name });

        fn_schemes.insert(
            *fn_name,
            Scheme {
                vars: vars.values().copied().collect(),
                ty,
                constraints,
            },
        );
    }

    state.registry.add_definition(TraitDefinition {
        name,
        type_param,
        functions: fn_schemes,
    });

    Ok(TypedExpr::new(
        TypedExprKind::ConstraintDef { name },
        span,
        Type::Unit,
        EffectSet::EMPTY,
    ))
}

fn infer_implement_def(
    state: &mut InferenceState,
    trait_name: Symbol,
    type_name: Symbol,
    functions: &[(Symbol, Expr)],
    span: Span,
) -> TypeResult<TypedExpr> {
    // The registry is keyed by resolution keys: `Unit` implementations live
    // under the reserved key `unit`.
    let type_name = if type_name.as_str() == "Unit" {
        Symbol::intern("unit")
    } else {
        type_name
    };

    let mut fn_exprs = IndexMap::new();
    let mut typed_fns = IndexMap::new();
    for (fn_name, body) in functions {
        // Implementation bodies are typed in the current environment; their
        // declared signatures are enforced dynamically by use (the literal
        // arity check happens in the registry).
        let typed = infer_expr(state, body)?;
        fn_exprs.insert(*fn_name, body.clone());
        typed_fns.insert(*fn_name, typed);
    }

    state.registry.add_implementation(
        trait_name,
        TraitImplementation {
            type_name,
            functions: fn_exprs,
            typed_functions: typed_fns,
        },
        span,
    )?;

    Ok(TypedExpr::new(
        TypedExprKind::ImplementDef {
            trait_name,
            type_name,
        },
        span,
        Type::Unit,
        EffectSet::EMPTY,
    ))
}

fn infer_type_def(
    state: &mut InferenceState,
    name: Symbol,
    params: &[Symbol],
    alts: &[TypeExpr],
    span: Span,
) -> TypeResult<TypedExpr> {
    let is_known = |state: &InferenceState, n: Symbol| -> bool {
        matches!(n.as_str(), "Float" | "String" | "Unit" | "Unknown")
            || state.type_cons.contains_key(&n)
    };

    // Union: two or more alternatives, every one an existing type.
    let all_known = alts.len() >= 2
        && alts.iter().all(|alt| match &alt.kind {
            TypeExprKind::Named { name: n, args } => args.is_empty() && is_known(state, *n),
            TypeExprKind::Record { .. } | TypeExprKind::Tuple { .. } => true,
            _ => false,
        });

    if all_known {
        if !params.is_empty() {
            return Err(TypeError::PatternMismatch {
                message: "union types cannot take type parameters".into(),
                span,
            });
        }
        let mut members = Vec::new();
        for alt in alts {
            let mut vars = FxHashMap::default();
            let mut constraints = ConstraintMap::new();
            members.push(resolve_type_expr(state, alt, &mut vars, &mut constraints)?);
        }
        state
            .type_cons
            .insert(name, TypeConInfo::Union { members });
        return Ok(TypedExpr::new(
            TypedExprKind::TypeDef { name },
            span,
            Type::Unit,
            EffectSet::EMPTY,
        ));
    }

    // Alias: a single alternative that is not a new constructor head.
    if alts.len() == 1 {
        let alias_like = match &alts[0].kind {
            TypeExprKind::Named { name: n, .. } => is_known(state, *n),
            TypeExprKind::Var { .. } => true,
            _ => true, // records, tuples, functions, unions
        };
        if alias_like {
            let mut vars = FxHashMap::default();
            let param_vars: Vec<TypeVarId> = params
                .iter()
                .map(|p| {
                    let v = state.fresh();
                    vars.insert(*p, v);
                    v
                })
                .collect();
            let mut constraints = ConstraintMap::new();
            let body = resolve_type_expr(state, &alts[0], &mut vars, &mut constraints)?;
            state.type_cons.insert(
                name,
                TypeConInfo::Alias {
                    params: param_vars,
                    body,
                },
            );
            return Ok(TypedExpr::new(
                TypedExprKind::TypeDef { name },
                span,
                Type::Unit,
                EffectSet::EMPTY,
            ));
        }
    }

    // Variant ADT: alternatives introduce constructors.
    let mut vars = FxHashMap::default();
    let param_types: Vec<Type> = params
        .iter()
        .map(|p| {
            let v = state.fresh();
            vars.insert(*p, v);
            Type::Var(v)
        })
        .collect();
    let result_ty = Type::Con {
        name,
        args: param_types,
    };

    let mut ctor_names = Vec::new();
    // Register the type first so recursive variants can mention it.
    state.type_cons.insert(
        name,
        TypeConInfo::Variant {
            arity: params.len(),
            ctors: Vec::new(),
        },
    );

    for alt in alts {
        let TypeExprKind::Named {
            name: ctor,
            args,
        } = &alt.kind
        else {
            return Err(TypeError::PatternMismatch {
                message: "variant alternatives must be constructor applications".into(),
                span: alt.span,
            });
        };
        let mut ctor_ty = result_ty.clone();
        let mut constraints = ConstraintMap::new();
        for arg in args.iter().rev() {
            let arg_ty = resolve_type_expr(state, arg, &mut vars, &mut constraints)?;
            ctor_ty = Type::func(arg_ty, ctor_ty);
        }
        // Quantify over the declared parameters plus any variables this
        // alternative introduced.
        state.define(
            *ctor,
            Scheme {
                vars: vars.values().copied().collect(),
                ty: ctor_ty,
                constraints,
            },
            false,
        );
        ctor_names.push(*ctor);
    }

    state.type_cons.insert(
        name,
        TypeConInfo::Variant {
            arity: params.len(),
            ctors: ctor_names,
        },
    );

    Ok(TypedExpr::new(
        TypedExprKind::TypeDef { name },
        span,
        Type::Unit,
        EffectSet::EMPTY,
    ))
}

fn infer_import(state: &mut InferenceState, path: &str, span: Span) -> TypeResult<TypedExpr> {
    let file = resolve_import_path(state, path).ok_or_else(|| TypeError::ImportNotFound {
        path: path.to_string(),
        span,
    })?;

    if state.import_stack.contains(&file) {
        // Import cycle: surface as not-found so the chain stops cleanly.
        return Err(TypeError::ImportNotFound {
            path: path.to_string(),
            span,
        });
    }

    let source = std::fs::read_to_string(&file).map_err(|_| TypeError::ImportNotFound {
        path: path.to_string(),
        span,
    })?;

    let handler = Handler::new();
    let program = nooc_par::Parser::parse_source(&source, &handler);
    if handler.has_errors() {
        return Err(TypeError::ImportParseError {
            path: path.to_string(),
            span,
        });
    }

    let saved_base = state.base_dir.clone();
    state.base_dir = file.parent().map(Path::to_path_buf);
    state.import_stack.push(file.clone());
    state.env.push_scope();

    let mut typed_stmts = Vec::new();
    let mut effects = EffectSet::EMPTY;
    for stmt in &program {
        match infer_expr(state, stmt) {
            Ok(t) => {
                effects = effects.union(t.effects);
                typed_stmts.push(t);
            }
            Err(inner) => {
                state.env.pop_scope();
                state.import_stack.pop();
                state.base_dir = saved_base;
                return Err(TypeError::ImportTypeError {
                    path: path.to_string(),
                    inner: Box::new(inner),
                    span,
                });
            }
        }
    }

    // The import's value is a record of the module's top-level definitions.
    let mut names = Vec::new();
    let mut fields = IndexMap::new();
    for stmt in &typed_stmts {
        if let TypedExprKind::Definition { name, .. }
        | TypedExprKind::MutDefinition { name, .. } = &stmt.kind
        {
            if let Some(entry) = state.env.lookup(*name).cloned() {
                let ty = state.instantiate(&entry.scheme);
                fields.insert(*name, ty);
                if !names.contains(name) {
                    names.push(*name);
                }
            }
        }
    }

    state.env.pop_scope();
    state.import_stack.pop();
    state.base_dir = saved_base;

    Ok(TypedExpr::new(
        TypedExprKind::Import {
            path: path.to_string(),
            program: typed_stmts,
            names,
        },
        span,
        Type::Record(fields),
        effects,
    ))
}

/// Resolve `import "p"`: relative to the importing file first, then the
/// working directory; `.noo` is appended when absent.
fn resolve_import_path(state: &InferenceState, path: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    let with_ext = if path.ends_with(".noo") {
        path.to_string()
    } else {
        format!("{}.noo", path)
    };
    if let Some(base) = &state.base_dir {
        candidates.push(base.join(&with_ext));
    }
    candidates.push(PathBuf::from(&with_ext));
    candidates.into_iter().find(|c| c.is_file())
}

/// Resolve a surface type expression to an internal type.
///
/// Lowercase names become fresh variables scoped to `vars` (one annotation
/// or one trait signature shares a scope); constraints from a `given` tail
/// are collected into `constraints` for the caller to attach or to store in
/// a scheme.
pub fn resolve_type_expr(
    state: &mut InferenceState,
    te: &TypeExpr,
    vars: &mut FxHashMap<Symbol, TypeVarId>,
    constraints: &mut ConstraintMap,
) -> TypeResult<Type> {
    let span = te.span;
    match &te.kind {
        TypeExprKind::Named { name, args } => {
            let mut resolved_args = Vec::new();
            for arg in args {
                resolved_args.push(resolve_type_expr(state, arg, vars, constraints)?);
            }
            match name.as_str() {
                "Float" | "String" | "Unit" | "Unknown" if !resolved_args.is_empty() => {
                    Err(TypeError::TypeMismatch {
                        expected: format!("`{}` (which takes no arguments)", name),
                        found: format!("`{}` applied to {} arguments", name, resolved_args.len()),
                        span,
                    })
                }
                "Float" => Ok(Type::Float),
                "String" => Ok(Type::String),
                "Unit" => Ok(Type::Unit),
                "Unknown" => Ok(Type::Unknown),
                _ => match state.type_cons.get(name).cloned() {
                    Some(TypeConInfo::Union { members }) => {
                        if !resolved_args.is_empty() {
                            return Err(TypeError::TypeMismatch {
                                expected: format!(
                                    "`{}` (a union, which takes no arguments)",
                                    name
                                ),
                                found: format!("{} arguments", resolved_args.len()),
                                span,
                            });
                        }
                        Ok(Type::Union(members))
                    }
                    Some(TypeConInfo::Alias { params, body }) => {
                        if params.len() != resolved_args.len() {
                            return Err(TypeError::TypeMismatch {
                                expected: format!("`{}` with {} arguments", name, params.len()),
                                found: format!("{} arguments", resolved_args.len()),
                                span,
                            });
                        }
                        let mut rename = crate::subst::Subst::new();
                        for (param, arg) in params.iter().zip(resolved_args) {
                            rename.insert(*param, arg);
                        }
                        Ok(rename.apply(&body))
                    }
                    Some(info) => {
                        if info.arity() != resolved_args.len() {
                            return Err(TypeError::TypeMismatch {
                                expected: format!("`{}` with {} arguments", name, info.arity()),
                                found: format!("{} arguments", resolved_args.len()),
                                span,
                            });
                        }
                        Ok(Type::Con {
                            name: *name,
                            args: resolved_args,
                        }
                        .normalize_list())
                    }
                    None => Err(TypeError::UnknownVariable { name: *name, span }),
                },
            }
        }

        TypeExprKind::Var { name, args } => {
            let var = *vars.entry(*name).or_insert_with(|| state.fresh());
            if args.is_empty() {
                Ok(Type::Var(var))
            } else {
                let mut resolved = Vec::new();
                for arg in args {
                    resolved.push(resolve_type_expr(state, arg, vars, constraints)?);
                }
                Ok(Type::App {
                    head: var,
                    args: resolved,
                })
            }
        }

        TypeExprKind::Function { param, ret } => {
            let param = resolve_type_expr(state, param, vars, constraints)?;
            let ret = resolve_type_expr(state, ret, vars, constraints)?;
            Ok(Type::func(param, ret))
        }

        TypeExprKind::Tuple { elements } => {
            let mut resolved = Vec::new();
            for element in elements {
                resolved.push(resolve_type_expr(state, element, vars, constraints)?);
            }
            Ok(Type::Tuple(resolved))
        }

        TypeExprKind::Record { fields } => {
            let mut resolved = IndexMap::new();
            for (name, ty) in fields {
                resolved.insert(*name, resolve_type_expr(state, ty, vars, constraints)?);
            }
            Ok(Type::Record(resolved))
        }

        TypeExprKind::Union { members } => {
            let mut resolved = Vec::new();
            for member in members {
                resolved.push(resolve_type_expr(state, member, vars, constraints)?);
            }
            Ok(Type::Union(resolved))
        }

        TypeExprKind::Constrained {
            base,
            constraints: clauses,
        } => {
            let base = resolve_type_expr(state, base, vars, constraints)?;
            for clause in clauses {
                match clause {
                    ConstraintExpr::Implements { var, trait_name } => {
                        if state.registry.definition(*trait_name).is_none() {
                            return Err(TypeError::UnknownTrait {
                                name: *trait_name,
                                span,
                            });
                        }
                        let var = *vars.entry(*var).or_insert_with(|| state.fresh());
                        constraints.entry(var).or_default().push(
                            Constraint::Implements {
                                trait_name: *trait_name,
                            },
                        );
                    }
                    ConstraintExpr::HasField { var, field, ty } => {
                        let payload = resolve_type_expr(state, ty, vars, constraints)?;
                        let var = *vars.entry(*var).or_insert_with(|| state.fresh());
                        constraints.entry(var).or_default().push(
                            Constraint::HasField {
                                field: *field,
                                ty: payload,
                            },
                        );
                    }
                }
            }
            Ok(base)
        }
    }
}
