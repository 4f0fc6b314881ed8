//! The unification engine.
//!
//! `unify` makes two types equal under the current substitution, emitting
//! new bindings and discharging or transporting constraints as variables
//! become bound. Unification IS the constraint solver: there is no separate
//! solving pass.
//!
//! Binding order tie-break: the younger variable (higher id) is bound to
//! the older one. This stabilizes displayed names and avoids churn in the
//! substitution.

use nooc_util::Span;

use crate::errors::{TypeError, TypeResult};
use crate::render::TypeRenderer;
use crate::state::InferenceState;
use crate::traits::type_key;
use crate::types::{Constraint, Type, TypeVarId};

impl InferenceState {
    /// Unify two types under the current substitution.
    pub fn unify(&mut self, t1: &Type, t2: &Type, span: Span) -> TypeResult<()> {
        let a = self.subst.apply(t1);
        let b = self.subst.apply(t2);

        match (a, b) {
            // Same primitive
            (Type::Float, Type::Float)
            | (Type::String, Type::String)
            | (Type::Unit, Type::Unit) => Ok(()),

            // Unknown unifies with Unknown only; it is not a top type
            (Type::Unknown, Type::Unknown) => Ok(()),

            // Constrained wrapper: unwrap, absorb, unify bases. Must come
            // before the variable arms so the wrapper's constraints reach
            // the live table rather than being buried in a binding.
            (Type::Constrained { base, constraints }, other)
            | (other, Type::Constrained { base, constraints }) => {
                self.absorb_constraints(&constraints);
                self.unify(&base, &other, span)
            }

            // Two variables: bind the younger to the older
            (Type::Var(v), Type::Var(w)) => {
                if v == w {
                    Ok(())
                } else if v.0 > w.0 {
                    self.bind(v, Type::Var(w), span)
                } else {
                    self.bind(w, Type::Var(v), span)
                }
            }

            // Variable vs anything: bind
            (Type::Var(v), other) | (other, Type::Var(v)) => self.bind(v, other, span),

            // Functions: arities must match; params pairwise, then returns;
            // attached constraints union into the live table
            (
                Type::Function {
                    params: p1,
                    ret: r1,
                    constraints: c1,
                    ..
                },
                Type::Function {
                    params: p2,
                    ret: r2,
                    constraints: c2,
                    ..
                },
            ) => {
                if p1.len() != p2.len() {
                    return Err(self.mismatch(
                        &Type::Function {
                            params: p1,
                            ret: r1,
                            constraints: c1,
                            effects: Default::default(),
                        },
                        &Type::Function {
                            params: p2,
                            ret: r2,
                            constraints: c2,
                            effects: Default::default(),
                        },
                        span,
                    ));
                }
                self.absorb_constraints(&c1);
                self.absorb_constraints(&c2);
                for (a, b) in p1.iter().zip(p2.iter()) {
                    self.unify(a, b, span)?;
                }
                self.unify(&r1, &r2, span)
            }

            // Tuples: arities match, pairwise
            (Type::Tuple(e1), Type::Tuple(e2)) => {
                if e1.len() != e2.len() {
                    return Err(self.mismatch(&Type::Tuple(e1), &Type::Tuple(e2), span));
                }
                for (a, b) in e1.iter().zip(e2.iter()) {
                    self.unify(a, b, span)?;
                }
                Ok(())
            }

            // Records: field sets must be equal; unify field-wise.
            // Row polymorphism is expressed via Has constraints, not here.
            (Type::Record(f1), Type::Record(f2)) => {
                if f1.len() != f2.len() || !f1.keys().all(|k| f2.contains_key(k)) {
                    return Err(self.mismatch(&Type::Record(f1), &Type::Record(f2), span));
                }
                for (name, ty1) in &f1 {
                    let ty2 = &f2[name];
                    self.unify(ty1, ty2, span)?;
                }
                Ok(())
            }

            // Lists (covering the Con("List", _) sugar)
            (Type::List(e1), Type::List(e2)) => self.unify(&e1, &e2, span),
            (Type::List(elem), Type::Con { name, args })
            | (Type::Con { name, args }, Type::List(elem))
                if name.as_str() == "List" && args.len() == 1 =>
            {
                self.unify(&elem, &args[0], span)
            }

            // Nominal types: names and arities equal, args pairwise
            (
                Type::Con {
                    name: n1,
                    args: a1,
                },
                Type::Con {
                    name: n2,
                    args: a2,
                },
            ) => {
                if n1 != n2 || a1.len() != a2.len() {
                    return Err(self.mismatch(
                        &Type::Con { name: n1, args: a1 },
                        &Type::Con { name: n2, args: a2 },
                        span,
                    ));
                }
                for (a, b) in a1.iter().zip(a2.iter()) {
                    self.unify(a, b, span)?;
                }
                Ok(())
            }

            // Type-level applications
            (
                Type::App {
                    head: h1,
                    args: a1,
                },
                Type::App {
                    head: h2,
                    args: a2,
                },
            ) => {
                if a1.len() != a2.len() {
                    return Err(self.mismatch(
                        &Type::App { head: h1, args: a1 },
                        &Type::App { head: h2, args: a2 },
                        span,
                    ));
                }
                if h1 != h2 {
                    self.unify(&Type::Var(h1), &Type::Var(h2), span)?;
                }
                for (a, b) in a1.iter().zip(a2.iter()) {
                    self.unify(a, b, span)?;
                }
                Ok(())
            }

            // `f a` against a concrete constructor application: the head
            // variable captures the constructor, trailing args unify
            (Type::App { head, args }, Type::Con { name, args: cargs })
            | (Type::Con { name, args: cargs }, Type::App { head, args }) => {
                self.unify_app_con(head, args, name, cargs, span)
            }
            (Type::App { head, args }, Type::List(elem))
            | (Type::List(elem), Type::App { head, args }) => {
                let name = nooc_util::Symbol::intern("List");
                self.unify_app_con(head, args, name, vec![*elem], span)
            }

            // Unions: equal as sets, members paired in canonical order
            (Type::Union(m1), Type::Union(m2)) => {
                if m1.len() != m2.len() {
                    return Err(self.mismatch(&Type::Union(m1), &Type::Union(m2), span));
                }
                let mut s1 = m1.clone();
                let mut s2 = m2.clone();
                s1.sort_by_key(canonical_key);
                s2.sort_by_key(canonical_key);
                for (a, b) in s1.iter().zip(s2.iter()) {
                    self.unify(a, b, span)?;
                }
                Ok(())
            }

            // Concrete type vs union: refinement. Succeeds iff the concrete
            // type unifies with exactly one member; that occurrence of the
            // union collapses to the member.
            (Type::Union(members), concrete) | (concrete, Type::Union(members)) => {
                let mut matching = Vec::new();
                for member in &members {
                    let mut trial = self.clone();
                    if trial.unify(member, &concrete, span).is_ok() {
                        matching.push(member.clone());
                    }
                }
                match matching.len() {
                    1 => self.unify(&matching[0], &concrete, span),
                    _ => Err(self.mismatch(&Type::Union(members), &concrete, span)),
                }
            }

            // Everything else fails
            (a, b) => Err(self.mismatch(&a, &b, span)),
        }
    }

    fn unify_app_con(
        &mut self,
        head: TypeVarId,
        args: Vec<Type>,
        name: nooc_util::Symbol,
        cargs: Vec<Type>,
        span: Span,
    ) -> TypeResult<()> {
        if cargs.len() < args.len() {
            return Err(self.mismatch(
                &Type::App {
                    head,
                    args: args.clone(),
                },
                &Type::Con { name, args: cargs },
                span,
            ));
        }
        let split = cargs.len() - args.len();
        let (prefix, suffix) = cargs.split_at(split);
        self.bind(
            head,
            Type::Con {
                name,
                args: prefix.to_vec(),
            },
            span,
        )?;
        for (a, b) in args.iter().zip(suffix.iter()) {
            self.unify(a, b, span)?;
        }
        Ok(())
    }

    /// Bind a variable to a type, with the occurs check and constraint
    /// transport. Constraints on the variable are discharged against the
    /// bound type (or moved onto the variable it resolved to).
    pub fn bind(&mut self, var: TypeVarId, ty: Type, span: Span) -> TypeResult<()> {
        if let Type::Var(w) = ty {
            if w == var {
                return Ok(());
            }
        }

        if self.subst.occurs(var, &ty) {
            let mut renderer = TypeRenderer::new(&self.subst, &self.var_constraints);
            let var_name = renderer.render(&Type::Var(var));
            let ty_name = renderer.render(&ty);
            return Err(TypeError::OccursCheck {
                var: var_name,
                ty: ty_name,
                span,
            });
        }

        let constraints = self.var_constraints.remove(&var).unwrap_or_default();
        self.subst.insert(var, ty.clone());

        let target = self.subst.apply(&ty);
        for constraint in constraints {
            match &target {
                Type::Var(w) => self.attach(*w, constraint),
                Type::App { head, .. } => self.attach(*head, constraint),
                concrete => self.discharge(constraint, concrete, span)?,
            }
        }
        Ok(())
    }

    /// Discharge one constraint against a concrete type.
    pub(crate) fn discharge(
        &mut self,
        constraint: Constraint,
        ty: &Type,
        span: Span,
    ) -> TypeResult<()> {
        match constraint {
            Constraint::Implements { trait_name } => match ty {
                Type::Union(_) => Err(TypeError::UnionOperationRequiresMatch {
                    op: trait_name.to_string(),
                    ty: self.render(ty),
                    span,
                }),
                _ => match type_key(ty) {
                    Some(key) => {
                        if self.registry.implementation(trait_name, key).is_some() {
                            Ok(())
                        } else {
                            Err(TypeError::UnknownImplementation {
                                trait_name,
                                type_name: self.render(ty),
                                span,
                            })
                        }
                    }
                    None => Err(TypeError::UnknownImplementation {
                        trait_name,
                        type_name: self.render(ty),
                        span,
                    }),
                },
            },
            Constraint::HasField { field, ty: want } => match ty {
                Type::Record(fields) => match fields.get(&field).cloned() {
                    Some(found) => self.unify(&want, &found, span),
                    None => Err(TypeError::TypeMismatch {
                        expected: format!("{{@{} {}}}", field, self.render(&want)),
                        found: self.render(ty),
                        span,
                    }),
                },
                Type::Unknown => Err(TypeError::UnknownOperationRequiresAdapter {
                    op: format!("@{}", field),
                    span,
                }),
                Type::Union(_) => Err(TypeError::UnionOperationRequiresMatch {
                    op: format!("@{}", field),
                    ty: self.render(ty),
                    span,
                }),
                Type::Var(w) => {
                    self.attach(*w, Constraint::HasField { field, ty: want });
                    Ok(())
                }
                _ => Err(TypeError::TypeMismatch {
                    expected: format!("{{@{} {}}}", field, self.render(&want)),
                    found: self.render(ty),
                    span,
                }),
            },
            Constraint::HasIndex { index, ty: want } => match ty {
                Type::Tuple(elems) => match elems.get(index).cloned() {
                    Some(found) => self.unify(&want, &found, span),
                    None => Err(TypeError::TypeMismatch {
                        expected: format!("a tuple with at least {} elements", index + 1),
                        found: self.render(ty),
                        span,
                    }),
                },
                Type::Var(w) => {
                    self.attach(*w, Constraint::HasIndex { index, ty: want });
                    Ok(())
                }
                _ => Err(TypeError::TypeMismatch {
                    expected: format!("a tuple with index {}", index),
                    found: self.render(ty),
                    span,
                }),
            },
        }
    }

    /// Render a type against the current state (for error messages).
    pub fn render(&self, ty: &Type) -> String {
        TypeRenderer::new(&self.subst, &self.var_constraints).render(ty)
    }

    /// Build a TypeMismatch with both sides rendered in one naming scope.
    pub(crate) fn mismatch(&self, expected: &Type, found: &Type, span: Span) -> TypeError {
        let mut renderer = TypeRenderer::new(&self.subst, &self.var_constraints);
        TypeError::TypeMismatch {
            expected: renderer.render(expected),
            found: renderer.render(found),
            span,
        }
    }
}

/// Canonical ordering key for union members: rendered member name first,
/// full structural spelling as the tie-break.
fn canonical_key(ty: &Type) -> String {
    match ty {
        Type::Float => "Float".into(),
        Type::String => "String".into(),
        Type::Unit => "Unit".into(),
        Type::Unknown => "Unknown".into(),
        Type::Var(v) => format!("?{}", v.0),
        Type::Con { name, args } => {
            let mut key = name.to_string();
            for arg in args {
                key.push(' ');
                key.push_str(&canonical_key(arg));
            }
            key
        }
        Type::List(elem) => format!("List {}", canonical_key(elem)),
        Type::App { head, args } => {
            let mut key = format!("?{}", head.0);
            for arg in args {
                key.push(' ');
                key.push_str(&canonical_key(arg));
            }
            key
        }
        Type::Tuple(elems) => format!(
            "{{{}}}",
            elems.iter().map(canonical_key).collect::<Vec<_>>().join(",")
        ),
        Type::Record(fields) => {
            let mut keys: Vec<String> = fields
                .iter()
                .map(|(name, ty)| format!("@{} {}", name, canonical_key(ty)))
                .collect();
            keys.sort();
            format!("{{{}}}", keys.join(","))
        }
        Type::Function { params, ret, .. } => format!(
            "({} -> {})",
            params.iter().map(canonical_key).collect::<Vec<_>>().join(","),
            canonical_key(ret)
        ),
        Type::Union(members) => {
            let mut keys: Vec<String> = members.iter().map(canonical_key).collect();
            keys.sort();
            keys.join("|")
        }
        Type::Constrained { base, .. } => canonical_key(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintMap;
    use nooc_util::Symbol;

    fn state() -> InferenceState {
        InferenceState::empty()
    }

    #[test]
    fn test_same_primitives_unify() {
        let mut s = state();
        assert!(s.unify(&Type::Float, &Type::Float, Span::DUMMY).is_ok());
        assert!(s.unify(&Type::String, &Type::String, Span::DUMMY).is_ok());
    }

    #[test]
    fn test_different_primitives_fail() {
        let mut s = state();
        let err = s.unify(&Type::Float, &Type::String, Span::DUMMY).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_only_unifies_with_unknown() {
        let mut s = state();
        assert!(s.unify(&Type::Unknown, &Type::Unknown, Span::DUMMY).is_ok());
        assert!(s.unify(&Type::Unknown, &Type::Float, Span::DUMMY).is_err());
    }

    #[test]
    fn test_var_binds_and_resolves() {
        let mut s = state();
        let v = s.fresh();
        s.unify(&Type::Var(v), &Type::Float, Span::DUMMY).unwrap();
        assert_eq!(s.subst.apply(&Type::Var(v)), Type::Float);
    }

    #[test]
    fn test_younger_binds_to_older() {
        let mut s = state();
        let older = s.fresh();
        let younger = s.fresh();
        s.unify(&Type::Var(younger), &Type::Var(older), Span::DUMMY)
            .unwrap();
        assert!(s.subst.get(younger).is_some());
        assert!(s.subst.get(older).is_none());
    }

    #[test]
    fn test_occurs_check() {
        let mut s = state();
        let v = s.fresh();
        let err = s
            .unify(
                &Type::Var(v),
                &Type::List(Box::new(Type::Var(v))),
                Span::DUMMY,
            )
            .unwrap_err();
        assert!(matches!(err, TypeError::OccursCheck { .. }));
    }

    #[test]
    fn test_unification_makes_sides_equal() {
        let mut s = state();
        let a = s.fresh_ty();
        let b = s.fresh_ty();
        let t1 = Type::func(a.clone(), Type::Float);
        let t2 = Type::func(Type::String, b.clone());
        s.unify(&t1, &t2, Span::DUMMY).unwrap();
        assert_eq!(s.subst.apply(&t1), s.subst.apply(&t2));
    }

    #[test]
    fn test_function_arity_mismatch() {
        let mut s = state();
        let unary = Type::func(Type::Float, Type::Float);
        let binary = Type::Function {
            params: vec![Type::Float, Type::Float],
            ret: Box::new(Type::Float),
            constraints: ConstraintMap::new(),
            effects: Default::default(),
        };
        assert!(s.unify(&unary, &binary, Span::DUMMY).is_err());
    }

    #[test]
    fn test_record_field_sets_must_match() {
        let mut s = state();
        let mut f1 = indexmap::IndexMap::new();
        f1.insert(Symbol::intern("x"), Type::Float);
        let mut f2 = indexmap::IndexMap::new();
        f2.insert(Symbol::intern("y"), Type::Float);
        assert!(s
            .unify(&Type::Record(f1), &Type::Record(f2), Span::DUMMY)
            .is_err());
    }

    #[test]
    fn test_record_field_order_irrelevant() {
        let mut s = state();
        let mut f1 = indexmap::IndexMap::new();
        f1.insert(Symbol::intern("x"), Type::Float);
        f1.insert(Symbol::intern("y"), Type::String);
        let mut f2 = indexmap::IndexMap::new();
        f2.insert(Symbol::intern("y"), Type::String);
        f2.insert(Symbol::intern("x"), Type::Float);
        assert!(s
            .unify(&Type::Record(f1), &Type::Record(f2), Span::DUMMY)
            .is_ok());
    }

    #[test]
    fn test_list_sugar_unifies_with_con_spelling() {
        let mut s = state();
        let sugar = Type::List(Box::new(Type::Float));
        let nominal = Type::con_args("List", vec![Type::Float]);
        assert!(s.unify(&sugar, &nominal, Span::DUMMY).is_ok());
    }

    #[test]
    fn test_app_captures_constructor() {
        // f a  ~  List Float   ==>   f := List, a := Float
        let mut s = state();
        let f = s.fresh();
        let a = s.fresh();
        let app = Type::App {
            head: f,
            args: vec![Type::Var(a)],
        };
        s.unify(&app, &Type::List(Box::new(Type::Float)), Span::DUMMY)
            .unwrap();
        assert_eq!(s.subst.apply(&Type::Var(a)), Type::Float);
        assert_eq!(
            s.subst.apply(&app),
            Type::List(Box::new(Type::Float))
        );
    }

    #[test]
    fn test_app_captures_parameterized_constructor() {
        // f a  ~  Result String Float  ==>  f := Result String, a := Float
        let mut s = state();
        let f = s.fresh();
        let a = s.fresh();
        let app = Type::App {
            head: f,
            args: vec![Type::Var(a)],
        };
        let result = Type::con_args("Result", vec![Type::String, Type::Float]);
        s.unify(&app, &result, Span::DUMMY).unwrap();
        assert_eq!(s.subst.apply(&app), result);
        assert_eq!(s.subst.apply(&Type::Var(a)), Type::Float);
    }

    #[test]
    fn test_union_refinement_single_member() {
        let mut s = state();
        let union = Type::Union(vec![Type::String, Type::Float]);
        assert!(s.unify(&Type::Float, &union, Span::DUMMY).is_ok());
    }

    #[test]
    fn test_union_no_member_fails() {
        let mut s = state();
        let union = Type::Union(vec![Type::String, Type::Float]);
        assert!(s.unify(&Type::Unit, &union, Span::DUMMY).is_err());
    }

    #[test]
    fn test_union_vs_union_as_sets() {
        let mut s = state();
        let u1 = Type::Union(vec![Type::String, Type::Float]);
        let u2 = Type::Union(vec![Type::Float, Type::String]);
        assert!(s.unify(&u1, &u2, Span::DUMMY).is_ok());
    }

    #[test]
    fn test_constraint_transport_on_var_var_bind() {
        let mut s = state();
        let older = s.fresh();
        let younger = s.fresh();
        s.attach(
            younger,
            Constraint::HasField {
                field: Symbol::intern("name"),
                ty: Type::String,
            },
        );
        s.unify(&Type::Var(younger), &Type::Var(older), Span::DUMMY)
            .unwrap();
        assert!(s.var_constraints.contains_key(&older));
        assert!(!s.var_constraints.contains_key(&younger));
    }

    #[test]
    fn test_has_constraint_discharged_against_record() {
        let mut s = state();
        let v = s.fresh();
        let field_ty = s.fresh_ty();
        s.attach(
            v,
            Constraint::HasField {
                field: Symbol::intern("name"),
                ty: field_ty.clone(),
            },
        );
        let mut fields = indexmap::IndexMap::new();
        fields.insert(Symbol::intern("name"), Type::String);
        s.unify(&Type::Var(v), &Type::Record(fields), Span::DUMMY)
            .unwrap();
        assert_eq!(s.subst.apply(&field_ty), Type::String);
    }

    #[test]
    fn test_has_constraint_on_missing_field_fails() {
        let mut s = state();
        let v = s.fresh();
        s.attach(
            v,
            Constraint::HasField {
                field: Symbol::intern("name"),
                ty: Type::String,
            },
        );
        let mut fields = indexmap::IndexMap::new();
        fields.insert(Symbol::intern("age"), Type::Float);
        assert!(s
            .unify(&Type::Var(v), &Type::Record(fields), Span::DUMMY)
            .is_err());
    }

    #[test]
    fn test_has_constraint_against_unknown_needs_adapter() {
        let mut s = state();
        let v = s.fresh();
        s.attach(
            v,
            Constraint::HasField {
                field: Symbol::intern("name"),
                ty: Type::String,
            },
        );
        let err = s.unify(&Type::Var(v), &Type::Unknown, Span::DUMMY).unwrap_err();
        assert!(matches!(
            err,
            TypeError::UnknownOperationRequiresAdapter { .. }
        ));
    }

    #[test]
    fn test_constrained_wrapper_unwraps() {
        let mut s = state();
        let v = s.fresh();
        let mut cm = ConstraintMap::new();
        cm.insert(
            v,
            vec![Constraint::Implements {
                trait_name: Symbol::intern("Show"),
            }],
        );
        let wrapped = Type::Constrained {
            base: Box::new(Type::Var(v)),
            constraints: cm,
        };
        let w = s.fresh();
        s.unify(&wrapped, &Type::Var(w), Span::DUMMY).unwrap();
        // v and w are now the same variable and the constraint survives on
        // whichever is the representative.
        let rep = match s.subst.walk(v) {
            Type::Var(r) => r,
            other => panic!("expected var, got {:?}", other),
        };
        assert!(s.var_constraints.contains_key(&rep));
    }
}
