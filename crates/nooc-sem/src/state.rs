//! The inference state: the only mutable state of a typing run.
//!
//! One [`InferenceState`] owns (a) the fresh-variable counter, (b) the
//! current substitution, (c) the variable-constraint table, (d) the trait
//! registry, and (e) the type environment stack, plus the table of
//! registered type constructors. It is passed by `&mut` through the driver;
//! a run is a pure function of (AST, prelude, prior registry snapshot) and
//! nothing here is process-global.

use std::path::PathBuf;

use indexmap::IndexMap;
use nooc_util::{FxHashMap, FxHashSet, Symbol};

use crate::subst::Subst;
use crate::traits::TraitRegistry;
use crate::types::{Constraint, ConstraintMap, Scheme, Type, TypeVarId};

/// One name binding in the environment.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    pub scheme: Scheme,
    /// Introduced by `mut x = e`; required for `x := e`
    pub mutable: bool,
}

/// Stack of name -> scheme maps; pushed on scope entry, popped on exit.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    scopes: Vec<FxHashMap<Symbol, EnvEntry>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the root scope");
        self.scopes.pop();
    }

    /// Bind in the innermost scope, shadowing outer bindings.
    pub fn insert(&mut self, name: Symbol, entry: EnvEntry) {
        self.scopes
            .last_mut()
            .expect("environment always has a scope")
            .insert(name, entry);
    }

    /// Resolve a name, innermost scope first.
    pub fn lookup(&self, name: Symbol) -> Option<&EnvEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    /// Variables free in the environment after applying `subst`.
    ///
    /// A scheme's quantified variables are bound, not free; everything else
    /// in its type (and constraint payloads) counts.
    pub fn free_vars(&self, subst: &Subst) -> FxHashSet<TypeVarId> {
        let mut out = FxHashSet::default();
        for scope in &self.scopes {
            for entry in scope.values() {
                let applied = subst.apply(&entry.scheme.ty);
                for var in applied.free_vars() {
                    if !entry.scheme.vars.contains(&var) {
                        out.insert(var);
                    }
                }
            }
        }
        out
    }

    /// Names bound in the innermost scope, in no particular order.
    pub fn top_scope_names(&self) -> Vec<Symbol> {
        self.scopes
            .last()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }
}

/// What a registered type-constructor name means.
#[derive(Debug, Clone)]
pub enum TypeConInfo {
    /// Built-in nominal type (Bool, Option, Result, List)
    Builtin { arity: usize },

    /// User variant ADT; constructor names listed for diagnostics
    Variant { arity: usize, ctors: Vec<Symbol> },

    /// Alias; `params` are placeholder variables inside `body`
    Alias { params: Vec<TypeVarId>, body: Type },

    /// Untagged union of resolved member types
    Union { members: Vec<Type> },
}

impl TypeConInfo {
    pub fn arity(&self) -> usize {
        match self {
            TypeConInfo::Builtin { arity } | TypeConInfo::Variant { arity, .. } => *arity,
            TypeConInfo::Alias { params, .. } => params.len(),
            TypeConInfo::Union { .. } => 0,
        }
    }
}

/// The single mutable handle threaded through a typing run.
#[derive(Debug, Clone)]
pub struct InferenceState {
    /// Fresh-variable counter; monotonically unique within a run
    counter: u32,

    /// Current substitution
    pub subst: Subst,

    /// Constraints attached to in-flight type variables
    pub var_constraints: FxHashMap<TypeVarId, Vec<Constraint>>,

    /// Trait registry (prelude traits + user statements)
    pub registry: TraitRegistry,

    /// Type environment stack
    pub env: TypeEnv,

    /// Registered type constructors
    pub type_cons: IndexMap<Symbol, TypeConInfo>,

    /// Directory of the file being typed; `import` resolves relative to it
    pub base_dir: Option<PathBuf>,

    /// Files currently being imported (cycle guard)
    pub import_stack: Vec<PathBuf>,
}

impl InferenceState {
    /// An empty state: no prelude, no registry contents. Tests use this;
    /// real runs go through [`crate::prelude::prelude_state`].
    pub fn empty() -> Self {
        Self {
            counter: 0,
            subst: Subst::new(),
            var_constraints: FxHashMap::default(),
            registry: TraitRegistry::new(),
            env: TypeEnv::new(),
            type_cons: IndexMap::new(),
            base_dir: None,
            import_stack: Vec::new(),
        }
    }

    /// Mint a fresh type variable.
    pub fn fresh(&mut self) -> TypeVarId {
        let id = TypeVarId(self.counter);
        self.counter += 1;
        id
    }

    /// Mint a fresh variable as a type.
    pub fn fresh_ty(&mut self) -> Type {
        Type::Var(self.fresh())
    }

    /// Attach a constraint to a variable (deduplicated).
    pub fn attach(&mut self, var: TypeVarId, constraint: Constraint) {
        let entry = self.var_constraints.entry(var).or_default();
        if !entry.contains(&constraint) {
            entry.push(constraint);
        }
    }

    /// Merge a constraint map into the variable-constraint table.
    pub fn absorb_constraints(&mut self, constraints: &ConstraintMap) {
        for (var, cs) in constraints {
            for c in cs {
                self.attach(*var, c.clone());
            }
        }
    }

    /// Instantiate a scheme: fresh variables for each quantified variable,
    /// constraints re-attached to the fresh variables.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        self.instantiate_with_map(scheme).0
    }

    /// Instantiate and also return the old-to-fresh variable mapping
    /// (used to locate the trait parameter of a trait-function scheme).
    pub fn instantiate_with_map(
        &mut self,
        scheme: &Scheme,
    ) -> (Type, FxHashMap<TypeVarId, TypeVarId>) {
        let mut mapping = FxHashMap::default();
        let mut rename = Subst::new();
        for var in &scheme.vars {
            let fresh = self.fresh();
            mapping.insert(*var, fresh);
            rename.insert(*var, Type::Var(fresh));
        }
        let ty = rename.apply(&scheme.ty);
        for (var, cs) in &scheme.constraints {
            let target = mapping.get(var).copied().unwrap_or(*var);
            for c in cs {
                let c = match c {
                    Constraint::Implements { trait_name } => Constraint::Implements {
                        trait_name: *trait_name,
                    },
                    Constraint::HasField { field, ty } => Constraint::HasField {
                        field: *field,
                        ty: rename.apply(ty),
                    },
                    Constraint::HasIndex { index, ty } => Constraint::HasIndex {
                        index: *index,
                        ty: rename.apply(ty),
                    },
                };
                self.attach(target, c);
            }
        }
        (ty, mapping)
    }

    /// Generalize `ty` over its variables not free in the environment.
    ///
    /// Constraints on generalized variables move out of the state table and
    /// into the scheme, so they are re-instantiated fresh at each use
    /// (invariant: two uses of a polymorphic name never share variables).
    pub fn generalize(&mut self, ty: &Type) -> Scheme {
        let applied = self.subst.apply(ty);
        let env_free = self.env.free_vars(&self.subst);

        let mut vars: Vec<TypeVarId> = Vec::new();
        let mut pending: Vec<TypeVarId> = applied
            .free_vars()
            .into_iter()
            .filter(|v| !env_free.contains(v))
            .collect();

        // Constraint payloads can mention further variables; quantify those
        // too (transitively).
        while let Some(var) = pending.pop() {
            if vars.contains(&var) {
                continue;
            }
            vars.push(var);
            if let Some(cs) = self.var_constraints.get(&var) {
                for c in cs {
                    let payload = match c {
                        Constraint::Implements { .. } => continue,
                        Constraint::HasField { ty, .. } | Constraint::HasIndex { ty, .. } => {
                            self.subst.apply(ty)
                        }
                    };
                    for v in payload.free_vars() {
                        if !env_free.contains(&v) && !vars.contains(&v) {
                            pending.push(v);
                        }
                    }
                }
            }
        }

        let mut constraints = ConstraintMap::new();
        for var in &vars {
            if let Some(cs) = self.var_constraints.remove(var) {
                let applied_cs: Vec<Constraint> = cs
                    .iter()
                    .map(|c| match c {
                        Constraint::Implements { trait_name } => Constraint::Implements {
                            trait_name: *trait_name,
                        },
                        Constraint::HasField { field, ty } => Constraint::HasField {
                            field: *field,
                            ty: self.subst.apply(ty),
                        },
                        Constraint::HasIndex { index, ty } => Constraint::HasIndex {
                            index: *index,
                            ty: self.subst.apply(ty),
                        },
                    })
                    .collect();
                constraints.insert(*var, applied_cs);
            }
        }

        Scheme {
            vars,
            ty: applied,
            constraints,
        }
    }

    /// Bind a name in the innermost scope.
    pub fn define(&mut self, name: Symbol, scheme: Scheme, mutable: bool) {
        self.env.insert(name, EnvEntry { scheme, mutable });
    }
}
