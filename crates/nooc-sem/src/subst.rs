//! Substitution: the idempotent map from type variables to types.
//!
//! `apply` resolves variable chains all the way down, so the result of one
//! application contains only unbound variables; applying again is the
//! identity. That is the operational form of the idempotence invariant, and
//! the property tests in `edge_cases` check it directly.

use rustc_hash::FxHashMap;

use crate::types::{ConstraintMap, Constraint, Type, TypeVarId};

/// A mapping from variable identity to type.
#[derive(Debug, Clone, Default)]
pub struct Subst {
    map: FxHashMap<TypeVarId, Type>,
}

impl Subst {
    /// The empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Direct binding for `var`, without chain walking.
    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.map.get(&var)
    }

    /// Record a binding. Callers are expected to have run the occurs check;
    /// `InferenceState::bind` is the checked entry point.
    pub fn insert(&mut self, var: TypeVarId, ty: Type) {
        self.map.insert(var, ty);
    }

    /// Walk `var` through the substitution until an unbound variable or a
    /// non-variable type is reached.
    pub fn walk(&self, var: TypeVarId) -> Type {
        let mut current = var;
        loop {
            match self.map.get(&current) {
                Some(Type::Var(next)) => current = *next,
                Some(ty) => return self.apply(ty),
                None => return Type::Var(current),
            }
        }
    }

    /// Apply the substitution to a type, resolving chains fully.
    ///
    /// Short-circuits when the substitution is empty. `App` heads that
    /// resolve to a concrete constructor are normalized into `Con`/`List`.
    pub fn apply(&self, ty: &Type) -> Type {
        if self.is_empty() {
            return ty.clone();
        }
        self.apply_inner(ty)
    }

    fn apply_inner(&self, ty: &Type) -> Type {
        match ty {
            Type::Float | Type::String | Type::Unit | Type::Unknown => ty.clone(),
            Type::Var(v) => self.walk(*v),
            Type::App { head, args } => {
                let args: Vec<Type> = args.iter().map(|a| self.apply_inner(a)).collect();
                match self.walk(*head) {
                    Type::Var(h) => Type::App { head: h, args },
                    Type::Con {
                        name,
                        args: mut head_args,
                    } => {
                        head_args.extend(args);
                        Type::Con {
                            name,
                            args: head_args,
                        }
                        .normalize_list()
                    }
                    // A head bound to a dedicated list with no element slot
                    // cannot absorb arguments; leave variants other than
                    // Var/Con untouched under the original head.
                    other => {
                        debug_assert!(
                            false,
                            "App head bound to non-constructor type {:?}",
                            other
                        );
                        Type::App { head: *head, args }
                    }
                }
            }
            Type::Con { name, args } => Type::Con {
                name: *name,
                args: args.iter().map(|a| self.apply_inner(a)).collect(),
            }
            .normalize_list(),
            Type::List(elem) => Type::List(Box::new(self.apply_inner(elem))),
            Type::Tuple(elems) => {
                Type::Tuple(elems.iter().map(|e| self.apply_inner(e)).collect())
            }
            Type::Union(members) => {
                Type::Union(members.iter().map(|m| self.apply_inner(m)).collect())
            }
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(name, ty)| (*name, self.apply_inner(ty)))
                    .collect(),
            ),
            Type::Function {
                params,
                ret,
                constraints,
                effects,
            } => Type::Function {
                params: params.iter().map(|p| self.apply_inner(p)).collect(),
                ret: Box::new(self.apply_inner(ret)),
                constraints: self.apply_constraints(constraints),
                effects: *effects,
            },
            Type::Constrained { base, constraints } => {
                let base = self.apply_inner(base);
                let constraints = self.apply_constraints(constraints);
                if constraints.is_empty() {
                    base
                } else {
                    Type::Constrained {
                        base: Box::new(base),
                        constraints,
                    }
                }
            }
        }
    }

    /// Apply to a constraint map: payload types are substituted, and a
    /// constrained variable that resolved to another variable is re-keyed
    /// to that variable. Entries whose variable resolved to a concrete type
    /// are kept under their original key until collapse discharges them.
    pub fn apply_constraints(&self, constraints: &ConstraintMap) -> ConstraintMap {
        let mut out = ConstraintMap::new();
        for (var, cs) in constraints {
            let key = match self.walk(*var) {
                Type::Var(v) => v,
                Type::App { head, .. } => head,
                _ => *var,
            };
            let entry: &mut Vec<Constraint> = out.entry(key).or_default();
            for c in cs {
                let applied = self.apply_constraint(c);
                if !entry.contains(&applied) {
                    entry.push(applied);
                }
            }
        }
        out
    }

    fn apply_constraint(&self, c: &Constraint) -> Constraint {
        match c {
            Constraint::Implements { trait_name } => Constraint::Implements {
                trait_name: *trait_name,
            },
            Constraint::HasField { field, ty } => Constraint::HasField {
                field: *field,
                ty: self.apply_inner(ty),
            },
            Constraint::HasIndex { index, ty } => Constraint::HasIndex {
                index: *index,
                ty: self.apply_inner(ty),
            },
        }
    }

    /// Compose: the returned substitution satisfies
    /// `compose(s1, s2).apply(t) == s1.apply(&s2.apply(t))`.
    ///
    /// Bindings of `s2` are rebuilt through `s1` to preserve idempotence.
    pub fn compose(first: &Subst, second: &Subst) -> Subst {
        let mut map = FxHashMap::default();
        for (var, ty) in &second.map {
            map.insert(*var, first.apply(ty));
        }
        for (var, ty) in &first.map {
            map.entry(*var).or_insert_with(|| ty.clone());
        }
        Subst { map }
    }

    /// True if `var` occurs in `ty` after applying this substitution.
    pub fn occurs(&self, var: TypeVarId, ty: &Type) -> bool {
        self.apply(ty).mentions(var)
    }
}
