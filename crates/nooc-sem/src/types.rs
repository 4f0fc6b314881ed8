//! Type representation for the Noolang type system.
//!
//! Types are a tagged sum with structural equality everywhere except type
//! variables (identity) and named types (nominal by head name). `List` is
//! kept as a dedicated kind for surface rendering; semantically it is sugar
//! for `Con("List", [elem])` and the unifier treats the two as equal.

use indexmap::IndexMap;
use nooc_util::{define_idx, Symbol};

use crate::effects::EffectSet;

define_idx!(TypeVarId);

/// Map from a constrained variable to its (non-empty) constraint list.
///
/// Insertion order is preserved so rendering is deterministic.
pub type ConstraintMap = IndexMap<TypeVarId, Vec<Constraint>>;

/// A type in the Noolang type system.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// 64-bit float; the only numeric type
    Float,
    /// Immutable string
    String,
    /// Unit type `{}`
    Unit,
    /// Opaque type produced by `forget`; unifies only with itself
    Unknown,

    /// Nominal named type with ordered arguments: `Bool`, `Option a`,
    /// user-defined variants and unions referenced by name
    Con { name: Symbol, args: Vec<Type> },

    /// Dedicated list kind; sugar for `Con("List", [elem])`
    List(Box<Type>),

    /// Ordered tuple
    Tuple(Vec<Type>),

    /// Record; field order irrelevant for equivalence (IndexMap equality
    /// ignores order), preserved for rendering
    Record(IndexMap<Symbol, Type>),

    /// Function type with attached constraints that travel with the value.
    ///
    /// Lambdas and builtin schemes are curried, so `params` holds exactly
    /// one element for those; the representation stays n-ary because
    /// unification and rendering are defined pairwise anyway.
    ///
    /// `effects` is the latent effect set performed when the function is
    /// applied; applications union it into the surrounding expression's
    /// effects. It does not participate in unification success (effect sets
    /// only ever union).
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        constraints: ConstraintMap,
        effects: EffectSet,
    },

    /// A type variable. Attached constraints live in the inference state's
    /// variable-constraint table, keyed by this id.
    Var(TypeVarId),

    /// Type-level application of a variable head: `f a` in a trait
    /// signature. Normalizes to `Con`/`List` once the head is bound to a
    /// concrete constructor.
    App { head: TypeVarId, args: Vec<Type> },

    /// A base type paired with residual constraints on variables that occur
    /// in it; used when a non-function expression carries constraints
    /// (e.g. `pure 1`)
    Constrained {
        base: Box<Type>,
        constraints: ConstraintMap,
    },

    /// Untagged union, nominal only (introduced by `type T = A | B`);
    /// member order is canonicalized at construction
    Union(Vec<Type>),
}

impl Type {
    /// Build a unary (curried) function type with no constraints and no
    /// latent effects.
    pub fn func(param: Type, ret: Type) -> Type {
        Type::Function {
            params: vec![param],
            ret: Box::new(ret),
            constraints: ConstraintMap::new(),
            effects: EffectSet::EMPTY,
        }
    }

    /// Build a unary function type carrying latent effects.
    pub fn func_eff(param: Type, ret: Type, effects: EffectSet) -> Type {
        Type::Function {
            params: vec![param],
            ret: Box::new(ret),
            constraints: ConstraintMap::new(),
            effects,
        }
    }

    /// Build a nominal type with no arguments.
    pub fn con(name: &str) -> Type {
        Type::Con {
            name: Symbol::intern(name),
            args: Vec::new(),
        }
    }

    /// Build a nominal type with arguments.
    pub fn con_args(name: &str, args: Vec<Type>) -> Type {
        Type::Con {
            name: Symbol::intern(name),
            args,
        }
    }

    /// The Bool nominal type.
    pub fn bool() -> Type {
        Type::con("Bool")
    }

    /// `Option t`
    pub fn option(t: Type) -> Type {
        Type::con_args("Option", vec![t])
    }

    /// Convert `Con("List", [t])` to the dedicated list kind; other types
    /// are returned unchanged. Keeps the two spellings interchangeable.
    pub fn normalize_list(self) -> Type {
        match self {
            Type::Con { name, mut args } if name.as_str() == "List" && args.len() == 1 => {
                Type::List(Box::new(args.remove(0)))
            }
            other => other,
        }
    }

    /// Collect the free type variables of this type in first-occurrence
    /// order (the substitution is NOT consulted; apply it first if needed).
    pub fn free_vars(&self) -> Vec<TypeVarId> {
        let mut out = Vec::new();
        self.collect_free_vars(&mut out);
        out
    }

    fn collect_free_vars(&self, out: &mut Vec<TypeVarId>) {
        match self {
            Type::Float | Type::String | Type::Unit | Type::Unknown => {}
            Type::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Type::App { head, args } => {
                if !out.contains(head) {
                    out.push(*head);
                }
                for arg in args {
                    arg.collect_free_vars(out);
                }
            }
            Type::Con { args, .. } => {
                for arg in args {
                    arg.collect_free_vars(out);
                }
            }
            Type::List(elem) => elem.collect_free_vars(out),
            Type::Tuple(elems) | Type::Union(elems) => {
                for elem in elems {
                    elem.collect_free_vars(out);
                }
            }
            Type::Record(fields) => {
                for ty in fields.values() {
                    ty.collect_free_vars(out);
                }
            }
            Type::Function {
                params,
                ret,
                constraints,
                ..
            } => {
                for param in params {
                    param.collect_free_vars(out);
                }
                ret.collect_free_vars(out);
                for (var, cs) in constraints {
                    if !out.contains(var) {
                        out.push(*var);
                    }
                    for c in cs {
                        c.collect_free_vars(out);
                    }
                }
            }
            Type::Constrained { base, constraints } => {
                base.collect_free_vars(out);
                for (var, cs) in constraints {
                    if !out.contains(var) {
                        out.push(*var);
                    }
                    for c in cs {
                        c.collect_free_vars(out);
                    }
                }
            }
        }
    }

    /// True if `var` occurs anywhere in this type.
    pub fn mentions(&self, var: TypeVarId) -> bool {
        self.free_vars().contains(&var)
    }

    /// Strip a `Constrained` wrapper, returning the base and its map.
    pub fn unwrap_constrained(self) -> (Type, ConstraintMap) {
        match self {
            Type::Constrained { base, constraints } => (*base, constraints),
            other => (other, ConstraintMap::new()),
        }
    }
}

/// A constraint on a type variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// The bearer must appear in the trait's implementation map
    Implements { trait_name: Symbol },

    /// The bearer must be a record admitting `field` of type `ty`
    HasField { field: Symbol, ty: Type },

    /// The bearer must be a tuple admitting index `index` of type `ty`
    /// (structural extension; not reachable from surface syntax yet)
    HasIndex { index: usize, ty: Type },
}

impl Constraint {
    fn collect_free_vars(&self, out: &mut Vec<TypeVarId>) {
        match self {
            Constraint::Implements { .. } => {}
            Constraint::HasField { ty, .. } | Constraint::HasIndex { ty, .. } => {
                ty.collect_free_vars(out)
            }
        }
    }

    /// Sort key: `implements` clauses render before `has` clauses.
    pub fn render_rank(&self) -> u8 {
        match self {
            Constraint::Implements { .. } => 0,
            Constraint::HasField { .. } => 1,
            Constraint::HasIndex { .. } => 2,
        }
    }
}

/// A universally quantified type template.
///
/// Created at generalization (definition statements), instantiated with
/// fresh variables at each use. Constraints on quantified variables are
/// carried alongside and re-attached to the fresh variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    /// Quantified variables
    pub vars: Vec<TypeVarId>,
    /// The type template
    pub ty: Type,
    /// Constraints on quantified variables
    pub constraints: ConstraintMap,
}

impl Scheme {
    /// A scheme quantifying nothing.
    pub fn mono(ty: Type) -> Self {
        Self {
            vars: Vec::new(),
            ty,
            constraints: ConstraintMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_equality_ignores_field_order() {
        let mut a = IndexMap::new();
        a.insert(Symbol::intern("x"), Type::Float);
        a.insert(Symbol::intern("y"), Type::String);
        let mut b = IndexMap::new();
        b.insert(Symbol::intern("y"), Type::String);
        b.insert(Symbol::intern("x"), Type::Float);
        assert_eq!(Type::Record(a), Type::Record(b));
    }

    #[test]
    fn test_normalize_list() {
        let sugar = Type::con_args("List", vec![Type::Float]);
        assert_eq!(sugar.normalize_list(), Type::List(Box::new(Type::Float)));
        assert_eq!(Type::Float.normalize_list(), Type::Float);
    }

    #[test]
    fn test_free_vars_first_occurrence_order() {
        let a = TypeVarId(0);
        let b = TypeVarId(1);
        let ty = Type::func(Type::Var(b), Type::Tuple(vec![Type::Var(a), Type::Var(b)]));
        assert_eq!(ty.free_vars(), vec![b, a]);
    }

    #[test]
    fn test_free_vars_in_app_head() {
        let f = TypeVarId(7);
        let ty = Type::App {
            head: f,
            args: vec![Type::Float],
        };
        assert_eq!(ty.free_vars(), vec![f]);
    }

    #[test]
    fn test_mentions() {
        let v = TypeVarId(3);
        assert!(Type::List(Box::new(Type::Var(v))).mentions(v));
        assert!(!Type::Float.mentions(v));
    }

    #[test]
    fn test_constraint_render_rank_orders_implements_first() {
        let implements = Constraint::Implements {
            trait_name: Symbol::intern("Show"),
        };
        let has = Constraint::HasField {
            field: Symbol::intern("x"),
            ty: Type::Float,
        };
        assert!(implements.render_rank() < has.render_rank());
    }
}
