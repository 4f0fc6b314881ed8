//! The prelude: built-in types, built-in function schemes, and the stdlib
//! traits every run starts with.
//!
//! Built-in types and native function signatures are installed directly.
//! The trait layer (Show, Functor, Monad and their implementations) is
//! ordinary Noolang source, parsed and typed through the same pipeline as
//! user code, so the prelude exercises exactly the machinery user programs
//! use. A fresh state is built per run; nothing is process-global.

use nooc_util::{Handler, Symbol};

use crate::effects::{Effect, EffectSet};
use crate::errors::{TypeError, TypeResult};
use crate::infer::infer_program;
use crate::state::{InferenceState, TypeConInfo};
use crate::types::{Scheme, Type, TypeVarId};

/// Stdlib traits and implementations, in Noolang.
pub const PRELUDE_SOURCE: &str = r#"
constraint Show a ( show : a -> String );
implement Show Float ( show = toString );
implement Show String ( show = toString );
implement Show Bool ( show = toString );
implement Show Unit ( show = toString );

constraint Functor f ( map : (a -> b) -> f a -> f b );
implement Functor List ( map = listMap );
implement Functor Option ( map = optionMap );
implement Functor Result ( map = resultMap );

constraint Monad m ( pure : a -> m a; bind : m a -> (a -> m b) -> m b );
implement Monad Option ( pure = optionPure; bind = optionBind );
implement Monad List ( pure = listPure; bind = listBind );
implement Monad Result ( pure = resultPure; bind = resultBind )
"#;

/// Names of native functions the evaluator must provide, with their
/// declared effect sets.
pub const BUILTIN_NAMES: &[&str] = &[
    "toString",
    "print",
    "log",
    "random",
    "readLine",
    "newRef",
    "readRef",
    "writeRef",
    "set",
    "at",
    "listMap",
    "optionMap",
    "resultMap",
    "listPure",
    "optionPure",
    "resultPure",
    "listBind",
    "optionBind",
    "resultBind",
];

/// Declared effect set of a native function (empty for pure natives).
pub fn builtin_effects(name: &str) -> EffectSet {
    match name {
        "print" => EffectSet::single(Effect::Write),
        "log" => EffectSet::single(Effect::Log),
        "random" => EffectSet::single(Effect::Rand),
        "readLine" => EffectSet::single(Effect::Read),
        "newRef" => EffectSet::single(Effect::State),
        "readRef" => EffectSet::single(Effect::Read),
        "writeRef" => EffectSet::single(Effect::Write),
        _ => EffectSet::EMPTY,
    }
}

/// Build the inference state every run starts from.
pub fn prelude_state() -> TypeResult<InferenceState> {
    let mut state = InferenceState::empty();
    install_builtin_types(&mut state);
    install_builtin_functions(&mut state);

    let handler = Handler::new();
    let program = nooc_par::Parser::parse_source(PRELUDE_SOURCE, &handler);
    if handler.has_errors() {
        return Err(TypeError::ImportParseError {
            path: "<prelude>".into(),
            span: nooc_util::Span::DUMMY,
        });
    }
    infer_program(&mut state, &program).map_err(|inner| TypeError::ImportTypeError {
        path: "<prelude>".into(),
        inner: Box::new(inner),
        span: nooc_util::Span::DUMMY,
    })?;

    Ok(state)
}

fn sym(s: &str) -> Symbol {
    Symbol::intern(s)
}

/// Register Bool, Option, Result and List, and their constructors.
fn install_builtin_types(state: &mut InferenceState) {
    state.type_cons.insert(
        sym("Bool"),
        TypeConInfo::Variant {
            arity: 0,
            ctors: vec![sym("True"), sym("False")],
        },
    );
    state.type_cons.insert(
        sym("Option"),
        TypeConInfo::Variant {
            arity: 1,
            ctors: vec![sym("Some"), sym("None")],
        },
    );
    // Result e a: error type first, success type second, so that the
    // higher-kinded position (`m a`) maps over the success side.
    state.type_cons.insert(
        sym("Result"),
        TypeConInfo::Variant {
            arity: 2,
            ctors: vec![sym("Ok"), sym("Err")],
        },
    );
    state
        .type_cons
        .insert(sym("List"), TypeConInfo::Builtin { arity: 1 });
    // Ref a: a mutable cell; created by newRef, read and written through
    // the effectful natives below.
    state
        .type_cons
        .insert(sym("Ref"), TypeConInfo::Builtin { arity: 1 });

    // Constructor schemes
    state.define(sym("True"), Scheme::mono(Type::bool()), false);
    state.define(sym("False"), Scheme::mono(Type::bool()), false);

    let a = state.fresh();
    state.define(
        sym("Some"),
        Scheme {
            vars: vec![a],
            ty: Type::func(Type::Var(a), Type::option(Type::Var(a))),
            constraints: Default::default(),
        },
        false,
    );
    let a = state.fresh();
    state.define(
        sym("None"),
        Scheme {
            vars: vec![a],
            ty: Type::option(Type::Var(a)),
            constraints: Default::default(),
        },
        false,
    );

    let (e, a) = (state.fresh(), state.fresh());
    state.define(
        sym("Ok"),
        Scheme {
            vars: vec![e, a],
            ty: Type::func(Type::Var(a), result_ty(e, a)),
            constraints: Default::default(),
        },
        false,
    );
    let (e, a) = (state.fresh(), state.fresh());
    state.define(
        sym("Err"),
        Scheme {
            vars: vec![e, a],
            ty: Type::func(Type::Var(e), result_ty(e, a)),
            constraints: Default::default(),
        },
        false,
    );
}

fn result_ty(e: TypeVarId, a: TypeVarId) -> Type {
    Type::con_args("Result", vec![Type::Var(e), Type::Var(a)])
}

fn ref_ty(a: TypeVarId) -> Type {
    Type::con_args("Ref", vec![Type::Var(a)])
}

/// Register native function schemes. Effectful natives carry their effects
/// in their function type so applications inherit them.
fn install_builtin_functions(state: &mut InferenceState) {
    // toString : a -> String
    let a = state.fresh();
    state.define(
        sym("toString"),
        Scheme {
            vars: vec![a],
            ty: Type::func(Type::Var(a), Type::String),
            constraints: Default::default(),
        },
        false,
    );

    // print : a -> a !write ; log : a -> a !log
    for (name, effect) in [("print", Effect::Write), ("log", Effect::Log)] {
        let a = state.fresh();
        state.define(
            sym(name),
            Scheme {
                vars: vec![a],
                ty: Type::func_eff(Type::Var(a), Type::Var(a), EffectSet::single(effect)),
                constraints: Default::default(),
            },
            false,
        );
    }

    // random : Unit -> Float !rand
    state.define(
        sym("random"),
        Scheme::mono(Type::func_eff(
            Type::Unit,
            Type::Float,
            EffectSet::single(Effect::Rand),
        )),
        false,
    );

    // readLine : Unit -> String !read
    state.define(
        sym("readLine"),
        Scheme::mono(Type::func_eff(
            Type::Unit,
            Type::String,
            EffectSet::single(Effect::Read),
        )),
        false,
    );

    // newRef : a -> Ref a !state
    let a = state.fresh();
    state.define(
        sym("newRef"),
        Scheme {
            vars: vec![a],
            ty: Type::func_eff(Type::Var(a), ref_ty(a), EffectSet::single(Effect::State)),
            constraints: Default::default(),
        },
        false,
    );

    // readRef : Ref a -> a !read
    let a = state.fresh();
    state.define(
        sym("readRef"),
        Scheme {
            vars: vec![a],
            ty: Type::func_eff(ref_ty(a), Type::Var(a), EffectSet::single(Effect::Read)),
            constraints: Default::default(),
        },
        false,
    );

    // writeRef : Ref a -> a -> a, with the write happening (and its effect
    // landing) when the value argument arrives
    let a = state.fresh();
    state.define(
        sym("writeRef"),
        Scheme {
            vars: vec![a],
            ty: Type::func(
                ref_ty(a),
                Type::func_eff(
                    Type::Var(a),
                    Type::Var(a),
                    EffectSet::single(Effect::Write),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );

    // set : (a -> b) -> a -> b -> a
    // The first argument is an accessor; its `has` constraint transports
    // onto `a` during unification, which is what checks the field exists.
    let (a, b) = (state.fresh(), state.fresh());
    state.define(
        sym("set"),
        Scheme {
            vars: vec![a, b],
            ty: Type::func(
                Type::func(Type::Var(a), Type::Var(b)),
                Type::func(
                    Type::Var(a),
                    Type::func(Type::Var(b), Type::Var(a)),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );

    // at : Float -> List a -> Option a
    let a = state.fresh();
    state.define(
        sym("at"),
        Scheme {
            vars: vec![a],
            ty: Type::func(
                Type::Float,
                Type::func(
                    Type::List(Box::new(Type::Var(a))),
                    Type::option(Type::Var(a)),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );

    // Functor natives
    // listMap : (a -> b) -> List a -> List b
    let (a, b) = (state.fresh(), state.fresh());
    state.define(
        sym("listMap"),
        Scheme {
            vars: vec![a, b],
            ty: Type::func(
                Type::func(Type::Var(a), Type::Var(b)),
                Type::func(
                    Type::List(Box::new(Type::Var(a))),
                    Type::List(Box::new(Type::Var(b))),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );
    // optionMap : (a -> b) -> Option a -> Option b
    let (a, b) = (state.fresh(), state.fresh());
    state.define(
        sym("optionMap"),
        Scheme {
            vars: vec![a, b],
            ty: Type::func(
                Type::func(Type::Var(a), Type::Var(b)),
                Type::func(
                    Type::option(Type::Var(a)),
                    Type::option(Type::Var(b)),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );
    // resultMap : (a -> b) -> Result e a -> Result e b
    let (e, a, b) = (state.fresh(), state.fresh(), state.fresh());
    state.define(
        sym("resultMap"),
        Scheme {
            vars: vec![e, a, b],
            ty: Type::func(
                Type::func(Type::Var(a), Type::Var(b)),
                Type::func(result_ty(e, a), result_ty(e, b)),
            ),
            constraints: Default::default(),
        },
        false,
    );

    // Monad natives
    // listPure : a -> List a
    let a = state.fresh();
    state.define(
        sym("listPure"),
        Scheme {
            vars: vec![a],
            ty: Type::func(Type::Var(a), Type::List(Box::new(Type::Var(a)))),
            constraints: Default::default(),
        },
        false,
    );
    // optionPure : a -> Option a
    let a = state.fresh();
    state.define(
        sym("optionPure"),
        Scheme {
            vars: vec![a],
            ty: Type::func(Type::Var(a), Type::option(Type::Var(a))),
            constraints: Default::default(),
        },
        false,
    );
    // resultPure : a -> Result e a
    let (e, a) = (state.fresh(), state.fresh());
    state.define(
        sym("resultPure"),
        Scheme {
            vars: vec![e, a],
            ty: Type::func(Type::Var(a), result_ty(e, a)),
            constraints: Default::default(),
        },
        false,
    );

    // listBind : List a -> (a -> List b) -> List b
    let (a, b) = (state.fresh(), state.fresh());
    state.define(
        sym("listBind"),
        Scheme {
            vars: vec![a, b],
            ty: Type::func(
                Type::List(Box::new(Type::Var(a))),
                Type::func(
                    Type::func(Type::Var(a), Type::List(Box::new(Type::Var(b)))),
                    Type::List(Box::new(Type::Var(b))),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );
    // optionBind : Option a -> (a -> Option b) -> Option b
    let (a, b) = (state.fresh(), state.fresh());
    state.define(
        sym("optionBind"),
        Scheme {
            vars: vec![a, b],
            ty: Type::func(
                Type::option(Type::Var(a)),
                Type::func(
                    Type::func(Type::Var(a), Type::option(Type::Var(b))),
                    Type::option(Type::Var(b)),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );
    // resultBind : Result e a -> (a -> Result e b) -> Result e b
    let (e, a, b) = (state.fresh(), state.fresh(), state.fresh());
    state.define(
        sym("resultBind"),
        Scheme {
            vars: vec![e, a, b],
            ty: Type::func(
                result_ty(e, a),
                Type::func(
                    Type::func(Type::Var(a), result_ty(e, b)),
                    result_ty(e, b),
                ),
            ),
            constraints: Default::default(),
        },
        false,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_builds() {
        let state = prelude_state().expect("prelude must type-check");
        assert!(state.env.lookup(sym("toString")).is_some());
        assert!(state.env.lookup(sym("Some")).is_some());
        assert!(state.registry.is_trait_function(sym("map")));
        assert!(state.registry.is_trait_function(sym("pure")));
        assert!(state.registry.is_trait_function(sym("show")));
    }

    #[test]
    fn test_prelude_implementations_present() {
        let state = prelude_state().unwrap();
        for (trait_name, type_name) in [
            ("Show", "Float"),
            ("Functor", "List"),
            ("Functor", "Option"),
            ("Monad", "Option"),
            ("Monad", "Result"),
        ] {
            assert!(
                state
                    .registry
                    .implementation(sym(trait_name), sym(type_name))
                    .is_some(),
                "missing {} for {}",
                trait_name,
                type_name
            );
        }
    }

    #[test]
    fn test_builtin_effects_declared() {
        assert!(builtin_effects("print").contains(Effect::Write));
        assert!(builtin_effects("log").contains(Effect::Log));
        assert!(builtin_effects("random").contains(Effect::Rand));
        assert!(builtin_effects("newRef").contains(Effect::State));
        assert!(builtin_effects("readRef").contains(Effect::Read));
        assert!(builtin_effects("writeRef").contains(Effect::Write));
        assert!(builtin_effects("toString").is_empty());
    }

    #[test]
    fn test_every_builtin_name_has_a_scheme() {
        let state = prelude_state().unwrap();
        for name in BUILTIN_NAMES {
            assert!(
                state.env.lookup(sym(name)).is_some(),
                "builtin `{}` missing from prelude env",
                name
            );
        }
    }
}
