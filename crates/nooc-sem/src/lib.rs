//! nooc-sem - The Noolang Typer
//!
//! ============================================================================
//! TYPE INFERENCE OVERVIEW
//! ============================================================================
//!
//! This crate is the core of the Noolang implementation: a Hindley-Milner
//! style type inferencer extended with
//!
//! 1. STRUCTURAL CONSTRAINTS ON RECORDS
//!    `@name` is a first-class accessor typed `a -> b given a has {@name b}`.
//!    The `has` constraint travels with the function value and is discharged
//!    when the record argument arrives.
//!
//! 2. A TRAIT (CONSTRAINT) SYSTEM
//!    `constraint Show a (show : a -> String)` declares an interface;
//!    `implement Show Float (show = toString)` associates an implementation
//!    with a type name. Resolution is by the first argument's type key.
//!    Higher-kinded constraints (Functor, Monad) are expressed through
//!    type-level application: `pure 1 : a Float given a implements Monad`.
//!
//! 3. PER-EXPRESSION EFFECT SETS
//!    Every expression carries a subset of
//!    { read, write, state, log, io, rand, ffi, mut }. Effect sets form a
//!    monoid under union; lambdas are pure at definition time and carry
//!    their body's effects latently in their function type.
//!
//! 4. CONSTRAINT DEFERRAL AND COLLAPSE
//!    Constraints attach to type variables. When an application binds a
//!    constrained variable to a concrete type, the constraint collapses:
//!    it is discharged immediately (dropping the `given` tail) or the
//!    application is a type error. Constraints on still-free variables
//!    defer; attaching them to enclosing function types is how
//!    `fn x y => x + y` propagates its operands' constraints outward.
//!
//! ALGORITHM SKETCH:
//! -----------------
//!
//! ```text
//! infer(expr, state):
//!     literal        -> primitive type
//!     variable       -> instantiate(scheme) with fresh variables
//!     fn x => body   -> fresh a; infer body with x:a; a -> body_ty
//!     f x            -> fresh p, r; unify(ty(f), p -> r); unify(p, ty(x));
//!                       collapse constraints; r
//!     x = e          -> generalize(ty(e)) over vars not free in env
//! ```
//!
//! Unification is the only constraint solver: binding a variable discharges
//! or transports its constraints, and there is no separate solving pass.
//!
//! INVARIANTS (checked by the property tests in `edge_cases`):
//! -----------------------------------------------------------
//!
//! - The substitution stays idempotent: apply(s, apply(s, t)) == apply(s, t).
//! - After unify(t1, t2) succeeds, apply(s, t1) == apply(s, t2).
//! - Two uses of a polymorphic name never share fresh variables.
//! - Record field order never affects the inferred type.
//! - Pure expressions have empty effect sets.
//!
//! ============================================================================
//! DATA FLOW
//! ============================================================================
//!
//! ```text
//! parsed AST ──> inference driver ──> decorated AST (types + effects)
//!                    │    ▲                  │
//!                    ▼    │                  ▼
//!               InferenceState          evaluator (nooc-eval)
//!        (substitution, constraints,         ▲
//!         trait registry, env stack) ────────┘ (registry travels along)
//! ```
//!
//! A run is single-threaded and synchronous; all mutable state lives in one
//! [`InferenceState`] passed by reference. Callers abort by dropping the
//! state. There is no incremental recomputation: a run is a pure function
//! of (AST, prelude, prior registry snapshot).

pub mod constraints;
pub mod decorate;
pub mod edge_cases;
pub mod effects;
pub mod errors;
pub mod infer;
pub mod prelude;
pub mod render;
pub mod state;
pub mod subst;
pub mod traits;
pub mod types;
pub mod unify;

pub use decorate::{TypedExpr, TypedExprKind, TypedMatchArm};
pub use effects::{Effect, EffectSet};
pub use errors::{TypeError, TypeResult};
pub use infer::{infer_expr, infer_program, infer_statement};
pub use prelude::prelude_state;
pub use render::{render_type, TypeRenderer};
pub use state::{InferenceState, TypeEnv};
pub use subst::Subst;
pub use traits::{Resolution, TraitRegistry};
pub use types::{Constraint, Scheme, Type, TypeVarId};

use nooc_par::Expr;

/// Type a program against a fresh prelude state.
///
/// Returns the decorated statements and the final state (substitution,
/// trait registry, environment); the evaluator needs the registry, the
/// driver renders types against the substitution.
pub fn typecheck(program: &[Expr]) -> TypeResult<(Vec<TypedExpr>, InferenceState)> {
    typecheck_with_base(program, None)
}

/// Like [`typecheck`], with an import base directory: `import "p"` resolves
/// relative to it before falling back to the working directory.
pub fn typecheck_with_base(
    program: &[Expr],
    base_dir: Option<std::path::PathBuf>,
) -> TypeResult<(Vec<TypedExpr>, InferenceState)> {
    let mut state = prelude_state()?;
    state.base_dir = base_dir;
    let typed = infer_program(&mut state, program)?;
    Ok((typed, state))
}

/// Render the type of a decorated statement against a state.
pub fn rendered_type(state: &InferenceState, typed: &TypedExpr) -> String {
    render_type(&typed.ty, &state.subst, &state.var_constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nooc_util::Handler;

    fn typecheck_source(source: &str) -> TypeResult<(Vec<TypedExpr>, InferenceState)> {
        let handler = Handler::new();
        let program = nooc_par::Parser::parse_source(source, &handler);
        assert!(
            !handler.has_errors(),
            "parse errors in test source: {:?}",
            handler
                .diagnostics()
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        typecheck(&program)
    }

    fn type_of_last(source: &str) -> String {
        let (typed, state) = typecheck_source(source).expect("program should type");
        rendered_type(&state, typed.last().expect("at least one statement"))
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(type_of_last("1"), "Float");
        assert_eq!(type_of_last("\"hi\""), "String");
        assert_eq!(type_of_last("{}"), "Unit");
    }

    #[test]
    fn test_arithmetic_and_string_concat() {
        assert_eq!(type_of_last("1.0 + 2.0"), "Float");
        assert_eq!(type_of_last("\"a\" + \"b\""), "String");
    }

    #[test]
    fn test_mixed_addition_is_mismatch() {
        let err = typecheck_source("1.0 + \"x\"").unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_lambda_and_application() {
        assert_eq!(type_of_last("(fn x => x + 1) 2"), "Float");
        assert_eq!(type_of_last("fn x => x"), "a -> a");
    }

    #[test]
    fn test_map_over_list() {
        assert_eq!(
            type_of_last("map (fn x => x + 1) [1, 2, 3]"),
            "List Float"
        );
    }

    #[test]
    fn test_pure_stays_constrained() {
        assert_eq!(type_of_last("pure 1"), "a Float given a implements Monad");
    }

    #[test]
    fn test_accessor_function_type() {
        assert_eq!(
            type_of_last("fn obj => @name obj"),
            "a -> b given a has {@name b}"
        );
    }

    #[test]
    fn test_accessor_on_record_discharges() {
        assert_eq!(type_of_last("@name {@name \"n\", @age 3}"), "String");
    }

    #[test]
    fn test_user_trait_definition_and_use() {
        let source = "constraint Display a ( display : a -> String ); \
                      implement Display Float ( display = toString ); \
                      display 42";
        assert_eq!(type_of_last(source), "String");
    }

    #[test]
    fn test_union_annotation_keeps_union() {
        assert_eq!(type_of_last("type U = String | Float; x = 1 : U; x"), "String | Float");
    }

    #[test]
    fn test_union_operand_requires_match() {
        let err =
            typecheck_source("type U = String | Float; x = 1 : U; x + 1").unwrap_err();
        assert!(matches!(err, TypeError::UnionOperationRequiresMatch { .. }));
    }

    #[test]
    fn test_union_narrows_through_match() {
        let source = "type U = String | Float; \
                      x = 1 : U; \
                      match x with (s => 0)";
        assert_eq!(type_of_last(source), "Float");
    }

    #[test]
    fn test_forget_and_unknown() {
        assert_eq!(type_of_last("forget 1"), "Unknown");
        let err = typecheck_source("forget 1 + 1").unwrap_err();
        assert!(matches!(
            err,
            TypeError::UnknownOperationRequiresAdapter { .. }
        ));
    }

    #[test]
    fn test_optional_accessor_on_unknown() {
        assert_eq!(type_of_last("@name? (forget {@name 1})"), "Option Unknown");
    }

    #[test]
    fn test_optional_accessor_on_record() {
        assert_eq!(type_of_last("@name? {@name \"n\"}"), "Option String");
    }

    #[test]
    fn test_let_polymorphism() {
        let source = "id = fn x => x; {id 1, id \"s\"}";
        assert_eq!(type_of_last(source), "{Float, String}");
    }

    #[test]
    fn test_if_branches_unify() {
        assert_eq!(type_of_last("if True then 1 else 2"), "Float");
        assert!(typecheck_source("if True then 1 else \"s\"").is_err());
    }

    #[test]
    fn test_match_on_option() {
        let source = "match Some 1 with (Some x => x; None => 0)";
        assert_eq!(type_of_last(source), "Float");
    }

    #[test]
    fn test_variant_definition_and_constructors() {
        let source = "type Shape = Circle Float | Square Float; Circle 1";
        assert_eq!(type_of_last(source), "Shape");
    }

    #[test]
    fn test_parameterized_variant() {
        let source = "type Pair a b = Pair a b; Pair 1 \"s\"";
        assert_eq!(type_of_last(source), "Pair Float String");
    }

    #[test]
    fn test_set_builtin() {
        let source = "set @x {@x 1, @y 2} 5";
        assert_eq!(type_of_last(source), "{@x Float, @y Float}");
    }

    #[test]
    fn test_unknown_variable_error() {
        let err = typecheck_source("ghost").unwrap_err();
        assert!(matches!(err, TypeError::UnknownVariable { .. }));
    }

    #[test]
    fn test_effects_of_builtins() {
        let (typed, _) = typecheck_source("print 1").unwrap();
        assert!(typed[0].effects.contains(Effect::Write));
    }

    #[test]
    fn test_pure_expressions_have_no_effects() {
        let (typed, _) = typecheck_source("1 + 2").unwrap();
        assert!(typed[0].effects.is_empty());
    }

    #[test]
    fn test_effects_through_partial_application() {
        let source = "f = fn x y => print x; g = f 1; g 2";
        let (typed, _) = typecheck_source(source).unwrap();
        // The first two statements perform nothing yet
        assert!(typed[0].effects.is_empty());
        assert!(typed[1].effects.is_empty());
        assert!(typed[2].effects.contains(Effect::Write));
    }

    #[test]
    fn test_mutation_effects() {
        let (typed, _) = typecheck_source("mut c = 0; c := c + 1").unwrap();
        assert!(typed[0].effects.contains(Effect::State));
        assert!(typed[1].effects.contains(Effect::Mut));
    }

    #[test]
    fn test_ref_types() {
        assert_eq!(type_of_last("newRef 1"), "Ref Float");
        assert_eq!(type_of_last("r = newRef 1; readRef r + 1"), "Float");
        assert_eq!(type_of_last("r = newRef \"s\"; writeRef r \"t\""), "String");
        assert!(typecheck_source("r = newRef 1; writeRef r \"t\"").is_err());
    }

    #[test]
    fn test_ref_effects() {
        let (typed, _) =
            typecheck_source("r = newRef 1; readRef r; writeRef r 2").unwrap();
        assert!(typed[0].effects.contains(Effect::State));
        assert!(typed[1].effects.contains(Effect::Read));
        assert!(typed[2].effects.contains(Effect::Write));
    }

    #[test]
    fn test_ref_annotation() {
        assert_eq!(type_of_last("(newRef 1) : Ref Float"), "Ref Float");
    }

    #[test]
    fn test_trait_resolution_is_stamped() {
        let (typed, _) = typecheck_source(
            "constraint Display a ( display : a -> String ); \
             implement Display Float ( display = toString ); \
             display 42",
        )
        .unwrap();
        let app = &typed[2];
        let TypedExprKind::Application { func, .. } = &app.kind else {
            panic!("expected application");
        };
        let TypedExprKind::Variable { resolution, .. } = &func.kind else {
            panic!("expected variable");
        };
        assert_eq!(
            *resolution,
            Some((
                nooc_util::Symbol::intern("Display"),
                nooc_util::Symbol::intern("Float")
            ))
        );
    }

    #[test]
    fn test_annotation_round_trip() {
        // infer, render, re-annotate, re-infer: same type
        for source in ["fn x => x + 1", "[1, 2]", "{@a 1}"] {
            let first = type_of_last(source);
            let annotated = format!("({}) : {}", source, first);
            assert_eq!(type_of_last(&annotated), first, "source: {}", source);
        }
    }

    #[test]
    fn test_recursive_function() {
        let source = "fact = fn n => if n < 1 then 1 else n * fact (n - 1); fact 5";
        assert_eq!(type_of_last(source), "Float");
    }

    #[test]
    fn test_duplicate_implementation_is_error() {
        let err = typecheck_source(
            "implement Show Float ( show = toString )",
        )
        .unwrap_err();
        assert!(matches!(err, TypeError::DuplicateImplementation { .. }));
    }

    #[test]
    fn test_show_unresolved_for_unimplemented_type() {
        let err = typecheck_source("show (fn x => x)").unwrap_err();
        assert!(matches!(err, TypeError::UnknownImplementation { .. }));
    }
}
