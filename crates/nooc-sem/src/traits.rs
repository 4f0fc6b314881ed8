//! Trait (constraint) registry: definitions, implementations, resolution.
//!
//! The registry is scoped to one typing run. It is initialized from the
//! prelude (Show, Functor, Monad and their stdlib implementations) and
//! extended by user `constraint` / `implement` statements in source order.
//! The evaluator receives the final registry and selects implementations by
//! type name at call sites.

use indexmap::IndexMap;
use nooc_par::{Expr, ExprKind};
use nooc_util::{FxHashMap, Span, Symbol};

use crate::errors::{TypeError, TypeResult};
use crate::types::{Scheme, Type};

/// A trait definition: a name, one type parameter, and function signatures.
///
/// Each function is stored as a [`Scheme`] whose quantified variables
/// include the trait's type parameter; the parameter variable carries an
/// `Implements` constraint in the scheme's constraint map, so instantiating
/// the scheme is all a use site needs.
#[derive(Debug, Clone)]
pub struct TraitDefinition {
    pub name: Symbol,
    pub type_param: Symbol,
    pub functions: IndexMap<Symbol, Scheme>,
}

/// A trait implementation for one concrete type name.
#[derive(Debug, Clone)]
pub struct TraitImplementation {
    pub type_name: Symbol,
    /// Source expressions as written in the `implement` statement
    pub functions: IndexMap<Symbol, Expr>,
    /// The same bodies, typed; the evaluator executes these
    pub typed_functions: IndexMap<Symbol, crate::decorate::TypedExpr>,
}

/// Outcome of resolving a trait function against an argument type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one implementation matched
    Found {
        trait_name: Symbol,
        type_name: Symbol,
    },
    /// No implementation for this type
    NotFound,
    /// Two traits declare the function and both have an implementation for
    /// this type
    Ambiguous { first: Symbol, second: Symbol },
}

/// The process-wide (per typing run) trait registry.
#[derive(Debug, Clone, Default)]
pub struct TraitRegistry {
    /// Trait name -> definition
    definitions: IndexMap<Symbol, TraitDefinition>,
    /// Trait name -> (type name -> implementation)
    implementations: IndexMap<Symbol, IndexMap<Symbol, TraitImplementation>>,
    /// Function name -> traits declaring it
    function_index: FxHashMap<Symbol, Vec<Symbol>>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition and index its functions.
    ///
    /// Redefining an existing trait replaces it and drops its
    /// implementations (REPL convenience; batch programs define each trait
    /// once).
    pub fn add_definition(&mut self, def: TraitDefinition) {
        if let Some(old) = self.definitions.shift_remove(&def.name) {
            for fn_name in old.functions.keys() {
                if let Some(traits) = self.function_index.get_mut(fn_name) {
                    traits.retain(|t| *t != old.name);
                }
            }
            self.implementations.shift_remove(&def.name);
        }
        for fn_name in def.functions.keys() {
            self.function_index
                .entry(*fn_name)
                .or_default()
                .push(def.name);
        }
        self.implementations
            .entry(def.name)
            .or_insert_with(IndexMap::new);
        self.definitions.insert(def.name, def);
    }

    /// Validate and insert an implementation.
    pub fn add_implementation(
        &mut self,
        trait_name: Symbol,
        imp: TraitImplementation,
        span: Span,
    ) -> TypeResult<()> {
        let def = self
            .definitions
            .get(&trait_name)
            .ok_or(TypeError::UnknownTrait {
                name: trait_name,
                span,
            })?;

        for (fn_name, body) in &imp.functions {
            let declared = def.functions.get(fn_name).ok_or_else(|| {
                TypeError::ImplementationUnknownFunction {
                    trait_name,
                    function: *fn_name,
                    span,
                }
            })?;

            // Arity is checked only when it is statically known: a literal
            // function expression. Variable references (aliases to other
            // functions) are accepted as-is.
            if let Some(found) = Self::static_arity(body) {
                let expected = Self::declared_arity(&declared.ty);
                if found != expected {
                    return Err(TypeError::ImplementationArityMismatch {
                        trait_name,
                        function: *fn_name,
                        expected,
                        found,
                        span,
                    });
                }
            }
        }

        let impls = self.implementations.entry(trait_name).or_default();
        if impls.contains_key(&imp.type_name) {
            return Err(TypeError::DuplicateImplementation {
                trait_name,
                type_name: imp.type_name,
                span,
            });
        }
        impls.insert(imp.type_name, imp);
        Ok(())
    }

    /// Curried parameter count of a declared function type.
    fn declared_arity(ty: &Type) -> usize {
        match ty {
            Type::Function { params, ret, .. } => params.len() + Self::declared_arity(ret),
            Type::Constrained { base, .. } => Self::declared_arity(base),
            _ => 0,
        }
    }

    /// Parameter count of a literal function expression, if it is one.
    fn static_arity(expr: &Expr) -> Option<usize> {
        match &expr.kind {
            ExprKind::Function { params, body } => {
                Some(params.len() + Self::static_arity(body).unwrap_or(0))
            }
            _ => None,
        }
    }

    /// Look up a trait definition.
    pub fn definition(&self, name: Symbol) -> Option<&TraitDefinition> {
        self.definitions.get(&name)
    }

    /// Look up an implementation.
    pub fn implementation(
        &self,
        trait_name: Symbol,
        type_name: Symbol,
    ) -> Option<&TraitImplementation> {
        self.implementations.get(&trait_name)?.get(&type_name)
    }

    /// True if any trait declares `fn_name`.
    pub fn is_trait_function(&self, fn_name: Symbol) -> bool {
        self.function_index
            .get(&fn_name)
            .map(|ts| !ts.is_empty())
            .unwrap_or(false)
    }

    /// Traits declaring `fn_name`, in definition order.
    pub fn traits_declaring(&self, fn_name: Symbol) -> &[Symbol] {
        self.function_index
            .get(&fn_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The declared scheme of a trait function. When two traits declare the
    /// same name their signatures are taken from the first; the collision
    /// is only an error if resolution for a concrete type is ambiguous.
    pub fn function_scheme(&self, fn_name: Symbol) -> Option<(&TraitDefinition, &Scheme)> {
        for trait_name in self.traits_declaring(fn_name) {
            if let Some(def) = self.definitions.get(trait_name) {
                if let Some(scheme) = def.functions.get(&fn_name) {
                    return Some((def, scheme));
                }
            }
        }
        None
    }

    /// Resolve `fn_name` against the type key of the first argument.
    pub fn resolve(&self, fn_name: Symbol, type_name: Symbol) -> Resolution {
        let mut found: Option<(Symbol, Symbol)> = None;
        for trait_name in self.traits_declaring(fn_name) {
            if self.implementation(*trait_name, type_name).is_some() {
                if let Some((first, _)) = found {
                    return Resolution::Ambiguous {
                        first,
                        second: *trait_name,
                    };
                }
                found = Some((*trait_name, type_name));
            }
        }
        match found {
            Some((trait_name, type_name)) => Resolution::Found {
                trait_name,
                type_name,
            },
            None => Resolution::NotFound,
        }
    }

    /// True if an implementation of `trait_name` exists for the key of `ty`.
    pub fn satisfies(&self, trait_name: Symbol, ty: &Type) -> bool {
        match type_key(ty) {
            Some(key) => self.implementation(trait_name, key).is_some(),
            None => false,
        }
    }

    /// Iterate all (trait, type, implementation) triples.
    pub fn iter_implementations(
        &self,
    ) -> impl Iterator<Item = (Symbol, Symbol, &TraitImplementation)> {
        self.implementations.iter().flat_map(|(trait_name, by_ty)| {
            by_ty
                .iter()
                .map(move |(type_name, imp)| (*trait_name, *type_name, imp))
        })
    }
}

/// Map a type to its resolution key.
///
/// Primitives use their name, variants their head name, functions map to
/// the reserved key `function`, unit to `unit`. Type parameters inside a
/// variant head are irrelevant. Variables, applications and unions have no
/// key (resolution must wait or the value must be narrowed).
pub fn type_key(ty: &Type) -> Option<Symbol> {
    match ty {
        Type::Float => Some(Symbol::intern("Float")),
        Type::String => Some(Symbol::intern("String")),
        Type::Unit => Some(Symbol::intern("unit")),
        Type::Unknown => Some(Symbol::intern("Unknown")),
        Type::Con { name, .. } => Some(*name),
        Type::List(_) => Some(Symbol::intern("List")),
        Type::Function { .. } => Some(Symbol::intern("function")),
        Type::Tuple(_) => Some(Symbol::intern("tuple")),
        Type::Record(_) => Some(Symbol::intern("record")),
        Type::Constrained { base, .. } => type_key(base),
        Type::Var(_) | Type::App { .. } | Type::Union(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintMap;
    use nooc_par::Parser;
    use nooc_util::Handler;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    fn show_definition() -> TraitDefinition {
        // show : a -> String
        let a = crate::types::TypeVarId(0);
        let mut constraints = ConstraintMap::new();
        constraints.insert(
            a,
            vec![crate::types::Constraint::Implements {
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
        TraitDefinition {
            name: sym("Show"),
            type_param: sym("a"),
            functions,
        }
    }

    fn impl_with(source: &str, type_name: &str) -> TraitImplementation {
        let handler = Handler::new();
        let mut program = Parser::parse_source(source, &handler);
        assert!(!handler.has_errors());
        let mut functions = IndexMap::new();
        functions.insert(sym("show"), program.remove(0));
        TraitImplementation {
            type_name: sym(type_name),
            functions,
            typed_functions: IndexMap::new(),
        }
    }

    #[test]
    fn test_add_and_resolve() {
        let mut reg = TraitRegistry::new();
        reg.add_definition(show_definition());
        reg.add_implementation(sym("Show"), impl_with("toString", "Float"), Span::DUMMY)
            .unwrap();

        assert!(reg.is_trait_function(sym("show")));
        assert_eq!(
            reg.resolve(sym("show"), sym("Float")),
            Resolution::Found {
                trait_name: sym("Show"),
                type_name: sym("Float"),
            }
        );
        assert_eq!(reg.resolve(sym("show"), sym("Bool")), Resolution::NotFound);
    }

    #[test]
    fn test_duplicate_implementation_rejected() {
        let mut reg = TraitRegistry::new();
        reg.add_definition(show_definition());
        reg.add_implementation(sym("Show"), impl_with("toString", "Float"), Span::DUMMY)
            .unwrap();
        let err = reg
            .add_implementation(sym("Show"), impl_with("toString", "Float"), Span::DUMMY)
            .unwrap_err();
        assert!(matches!(err, TypeError::DuplicateImplementation { .. }));
    }

    #[test]
    fn test_unknown_function_rejected() {
        let mut reg = TraitRegistry::new();
        reg.add_definition(show_definition());
        let handler = Handler::new();
        let mut program = Parser::parse_source("toString", &handler);
        let mut functions = IndexMap::new();
        functions.insert(sym("display"), program.remove(0));
        let err = reg
            .add_implementation(
                sym("Show"),
                TraitImplementation {
                    type_name: sym("Float"),
                    functions,
                    typed_functions: IndexMap::new(),
                },
                Span::DUMMY,
            )
            .unwrap_err();
        assert!(matches!(err, TypeError::ImplementationUnknownFunction { .. }));
    }

    #[test]
    fn test_literal_arity_checked() {
        let mut reg = TraitRegistry::new();
        reg.add_definition(show_definition());
        // show is declared with one parameter; a two-parameter literal is
        // rejected, but a variable alias is accepted without a check.
        let err = reg
            .add_implementation(
                sym("Show"),
                impl_with("fn x y => \"both\"", "Float"),
                Span::DUMMY,
            )
            .unwrap_err();
        assert!(matches!(err, TypeError::ImplementationArityMismatch { .. }));

        reg.add_implementation(sym("Show"), impl_with("someAlias", "Float"), Span::DUMMY)
            .unwrap();
    }

    #[test]
    fn test_ambiguous_resolution() {
        let mut reg = TraitRegistry::new();
        reg.add_definition(show_definition());
        // Second trait declaring the same function name
        let mut def2 = show_definition();
        def2.name = sym("Display");
        let mut functions = IndexMap::new();
        for (k, v) in def2.functions {
            functions.insert(k, v);
        }
        reg.add_definition(TraitDefinition {
            name: sym("Display"),
            type_param: sym("a"),
            functions,
        });

        reg.add_implementation(sym("Show"), impl_with("toString", "Float"), Span::DUMMY)
            .unwrap();
        reg.add_implementation(sym("Display"), impl_with("toString", "Float"), Span::DUMMY)
            .unwrap();

        assert!(matches!(
            reg.resolve(sym("show"), sym("Float")),
            Resolution::Ambiguous { .. }
        ));
    }

    #[test]
    fn test_type_key_mapping() {
        assert_eq!(type_key(&Type::Float), Some(sym("Float")));
        assert_eq!(type_key(&Type::Unit), Some(sym("unit")));
        assert_eq!(
            type_key(&Type::option(Type::Float)),
            Some(sym("Option"))
        );
        assert_eq!(
            type_key(&Type::List(Box::new(Type::Float))),
            Some(sym("List"))
        );
        assert_eq!(
            type_key(&Type::func(Type::Float, Type::Float)),
            Some(sym("function"))
        );
        assert_eq!(type_key(&Type::Var(crate::types::TypeVarId(0))), None);
    }
}
