//! Constraint collapse and normalization.
//!
//! Constraints are attached to variables (the live table in
//! [`InferenceState`]) and to function types (they travel with the value).
//! During unification they merge by variable identity. This module is the
//! "collapse" half: after an application binds variables, every constraint
//! whose variable became a concrete type is discharged immediately; on
//! success the constraint disappears, on failure the application is a type
//! error. Constraints on still-variable variables stay deferred, which is
//! exactly how they propagate across `fn x y => x + y`.
//!
//! Structural `has` constraints and trait `implements` constraints defer
//! identically; neither gets special treatment here.

use nooc_util::Span;

use crate::errors::TypeResult;
use crate::state::InferenceState;
use crate::types::{Constraint, Type, TypeVarId};

impl InferenceState {
    /// Discharge every constraint whose variable is now bound to a concrete
    /// type. Runs to a fixed point: a discharge can unify field types,
    /// which can bind more constrained variables.
    pub fn collapse_constraints(&mut self, span: Span) -> TypeResult<()> {
        loop {
            let mut ready: Vec<(TypeVarId, Vec<Constraint>)> = Vec::new();

            for (var, cs) in &self.var_constraints {
                match self.subst.walk(*var) {
                    // Unbound or variable-headed: still deferred
                    Type::Var(_) => {}
                    Type::App { .. } => {}
                    _ => ready.push((*var, cs.clone())),
                }
            }

            if ready.is_empty() {
                return Ok(());
            }

            for (var, constraints) in ready {
                self.var_constraints.remove(&var);
                let target = self.subst.walk(var);
                for constraint in constraints {
                    self.discharge(constraint, &target, span)?;
                }
            }
        }
    }

    /// Normalize the live table: deduplicate constraints per variable and
    /// collapse `has` constraints sharing a field name by unifying their
    /// right-hand sides.
    pub fn normalize_constraints(&mut self, span: Span) -> TypeResult<()> {
        let vars: Vec<TypeVarId> = self.var_constraints.keys().copied().collect();
        for var in vars {
            let Some(constraints) = self.var_constraints.remove(&var) else {
                continue;
            };
            let mut kept: Vec<Constraint> = Vec::new();
            let mut pending_unify: Vec<(Type, Type)> = Vec::new();

            for c in constraints {
                match &c {
                    Constraint::HasField { field, ty } => {
                        let existing = kept.iter().position(|k| {
                            matches!(k, Constraint::HasField { field: f, .. } if f == field)
                        });
                        match existing {
                            Some(i) => {
                                if let Constraint::HasField { ty: prev, .. } = &kept[i] {
                                    pending_unify.push((prev.clone(), ty.clone()));
                                }
                            }
                            None => kept.push(c),
                        }
                    }
                    _ => {
                        if !kept.contains(&c) {
                            kept.push(c);
                        }
                    }
                }
            }

            if !kept.is_empty() {
                self.var_constraints.insert(var, kept);
            }
            for (a, b) in pending_unify {
                self.unify(&a, &b, span)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{TraitDefinition, TraitImplementation};
    use crate::types::{ConstraintMap, Scheme};
    use indexmap::IndexMap;
    use nooc_util::Symbol;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    fn state_with_show_float() -> InferenceState {
        let mut state = InferenceState::empty();
        let a = state.fresh();
        let mut constraints = ConstraintMap::new();
        constraints.insert(
            a,
            vec![Constraint::Implements {
                trait_name: sym("Show"),
            }],
        );
        let mut functions = IndexMap::new();
        functions.insert(
            sym("show"),
            Scheme {
                vars: vec![a],
                ty: Type::func(Type::Var(a), Type::String),
                constraints,
            },
        );
        state.registry.add_definition(TraitDefinition {
            name: sym("Show"),
            type_param: sym("a"),
            functions,
        });

        let handler = nooc_util::Handler::new();
        let mut program = nooc_par::Parser::parse_source("toString", &handler);
        let mut impl_fns = IndexMap::new();
        impl_fns.insert(sym("show"), program.remove(0));
        state
            .registry
            .add_implementation(
                sym("Show"),
                TraitImplementation {
                    type_name: sym("Float"),
                    functions: impl_fns,
                    typed_functions: IndexMap::new(),
                },
                Span::DUMMY,
            )
            .unwrap();
        state
    }

    #[test]
    fn test_collapse_discharges_satisfied_implements() {
        let mut state = state_with_show_float();
        let v = state.fresh();
        state.attach(
            v,
            Constraint::Implements {
                trait_name: sym("Show"),
            },
        );
        state.subst.insert(v, Type::Float);
        state.collapse_constraints(Span::DUMMY).unwrap();
        assert!(state.var_constraints.is_empty());
    }

    #[test]
    fn test_collapse_errors_on_missing_implementation() {
        let mut state = state_with_show_float();
        let v = state.fresh();
        state.attach(
            v,
            Constraint::Implements {
                trait_name: sym("Show"),
            },
        );
        state.subst.insert(v, Type::Unit);
        assert!(state.collapse_constraints(Span::DUMMY).is_err());
    }

    #[test]
    fn test_collapse_leaves_deferred_constraints() {
        let mut state = state_with_show_float();
        let v = state.fresh();
        state.attach(
            v,
            Constraint::Implements {
                trait_name: sym("Show"),
            },
        );
        // v stays unbound: nothing to do, no error
        state.collapse_constraints(Span::DUMMY).unwrap();
        assert!(state.var_constraints.contains_key(&v));
    }

    #[test]
    fn test_normalize_merges_has_constraints_on_same_field() {
        let mut state = InferenceState::empty();
        let v = state.fresh();
        let t1 = state.fresh_ty();
        let t2 = state.fresh_ty();
        state.attach(
            v,
            Constraint::HasField {
                field: sym("name"),
                ty: t1.clone(),
            },
        );
        // Bypass attach's dedup by pushing a same-field constraint with a
        // different payload directly.
        state.var_constraints.get_mut(&v).unwrap().push(Constraint::HasField {
            field: sym("name"),
            ty: t2.clone(),
        });

        state.normalize_constraints(Span::DUMMY).unwrap();
        assert_eq!(state.var_constraints[&v].len(), 1);
        assert_eq!(state.subst.apply(&t1), state.subst.apply(&t2));
    }
}
