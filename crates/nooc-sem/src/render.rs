//! Type rendering: stable, human-readable type strings.
//!
//! Free variables are assigned `a`, `b`, ... in first-encountered order
//! within one rendered type (with a greek-letter fallback for debugging
//! runs that somehow exceed the alphabet). Residual constraints render as a
//! single `given` tail, `implements` clauses before `has` clauses.

use nooc_util::FxHashMap;

use crate::subst::Subst;
use crate::types::{Constraint, Type, TypeVarId};

/// Renders types with stable variable names.
///
/// One renderer instance scopes one rendered type: variable names are
/// assigned per render call sequence, so two calls on the same renderer
/// share a naming scope (useful for "expected/found" pairs).
pub struct TypeRenderer<'a> {
    subst: &'a Subst,
    var_constraints: &'a FxHashMap<TypeVarId, Vec<Constraint>>,
    names: FxHashMap<TypeVarId, String>,
}

const GREEK: [&str; 8] = ["α", "β", "γ", "δ", "ε", "ζ", "η", "θ"];

impl<'a> TypeRenderer<'a> {
    pub fn new(
        subst: &'a Subst,
        var_constraints: &'a FxHashMap<TypeVarId, Vec<Constraint>>,
    ) -> Self {
        Self {
            subst,
            var_constraints,
            names: FxHashMap::default(),
        }
    }

    /// Render a type including its `given` tail, if any.
    pub fn render(&mut self, ty: &Type) -> String {
        let ty = self.subst.apply(ty);
        let body = self.render_type(&ty, false);

        let clauses = self.constraint_clauses(&ty);
        if clauses.is_empty() {
            body
        } else {
            format!("{} given {}", body, clauses.join(", "))
        }
    }

    /// Render without the `given` tail (used inside clauses).
    fn render_type(&mut self, ty: &Type, atom: bool) -> String {
        match ty {
            Type::Float => "Float".into(),
            Type::String => "String".into(),
            Type::Unit => "Unit".into(),
            Type::Unknown => "Unknown".into(),
            Type::Var(v) => self.var_name(*v),
            Type::Con { name, args } => {
                if args.is_empty() {
                    name.to_string()
                } else {
                    let rendered = format!(
                        "{} {}",
                        name,
                        args.iter()
                            .map(|a| self.render_type(a, true))
                            .collect::<Vec<_>>()
                            .join(" ")
                    );
                    if atom {
                        format!("({})", rendered)
                    } else {
                        rendered
                    }
                }
            }
            Type::List(elem) => {
                let rendered = format!("List {}", self.render_type(elem, true));
                if atom {
                    format!("({})", rendered)
                } else {
                    rendered
                }
            }
            Type::App { head, args } => {
                let rendered = format!(
                    "{} {}",
                    self.var_name(*head),
                    args.iter()
                        .map(|a| self.render_type(a, true))
                        .collect::<Vec<_>>()
                        .join(" ")
                );
                if atom {
                    format!("({})", rendered)
                } else {
                    rendered
                }
            }
            Type::Tuple(elems) => format!(
                "{{{}}}",
                elems
                    .iter()
                    .map(|e| self.render_type(e, false))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Type::Record(fields) => format!(
                "{{{}}}",
                fields
                    .iter()
                    .map(|(name, ty)| format!("@{} {}", name, self.render_type(ty, false)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Type::Function { params, ret, .. } => {
                let mut parts: Vec<String> = params
                    .iter()
                    .map(|p| {
                        let needs_parens = matches!(p, Type::Function { .. });
                        let rendered = self.render_type(p, false);
                        if needs_parens {
                            format!("({})", rendered)
                        } else {
                            rendered
                        }
                    })
                    .collect();
                parts.push(self.render_type(ret, false));
                let rendered = parts.join(" -> ");
                if atom {
                    format!("({})", rendered)
                } else {
                    rendered
                }
            }
            Type::Union(members) => {
                let rendered = members
                    .iter()
                    .map(|m| self.render_type(m, true))
                    .collect::<Vec<_>>()
                    .join(" | ");
                if atom {
                    format!("({})", rendered)
                } else {
                    rendered
                }
            }
            Type::Constrained { base, .. } => self.render_type(base, atom),
        }
    }

    /// Assign (or recall) the display name for a variable.
    fn var_name(&mut self, var: TypeVarId) -> String {
        let resolved = self.subst.walk(var);
        let var = match resolved {
            Type::Var(v) => v,
            other => return self.render_type(&other, true),
        };
        if let Some(name) = self.names.get(&var) {
            return name.clone();
        }
        let index = self.names.len();
        let name = if index < 26 {
            ((b'a' + index as u8) as char).to_string()
        } else if index < 26 + GREEK.len() {
            GREEK[index - 26].to_string()
        } else {
            format!("t{}", index)
        };
        self.names.insert(var, name.clone());
        name
    }

    /// Collect `given` clauses for every constrained variable appearing in
    /// the (already substituted) type, in first-encountered variable order,
    /// `implements` before `has` per variable.
    fn constraint_clauses(&mut self, ty: &Type) -> Vec<String> {
        let mut per_var: Vec<(TypeVarId, Vec<Constraint>)> = Vec::new();

        let mut push = |var: TypeVarId, cs: &[Constraint]| {
            if let Some(entry) = per_var.iter_mut().find(|(v, _)| *v == var) {
                for c in cs {
                    if !entry.1.contains(c) {
                        entry.1.push(c.clone());
                    }
                }
            } else {
                per_var.push((var, cs.to_vec()));
            }
        };

        // Attached maps inside the type itself
        collect_attached(ty, &mut |var, cs| push(var, cs));

        // State-held constraints for free variables of the type
        for var in ty.free_vars() {
            if let Some(cs) = self.var_constraints.get(&var) {
                push(var, cs);
            }
        }

        let mut clauses = Vec::new();
        for (var, mut cs) in per_var {
            // Skip variables that resolved to concrete types; their
            // constraints were discharged by collapse.
            if !matches!(self.subst.walk(var), Type::Var(_)) {
                continue;
            }
            cs.sort_by_key(|c| c.render_rank());
            let name = self.var_name(var);
            for c in cs {
                clauses.push(match c {
                    Constraint::Implements { trait_name } => {
                        format!("{} implements {}", name, trait_name)
                    }
                    Constraint::HasField { field, ty } => {
                        format!("{} has {{@{} {}}}", name, field, self.render_type(&ty, false))
                    }
                    Constraint::HasIndex { index, ty } => {
                        format!("{} has {{{}: {}}}", name, index, self.render_type(&ty, false))
                    }
                });
            }
        }
        clauses
    }
}

fn collect_attached(ty: &Type, push: &mut impl FnMut(TypeVarId, &[Constraint])) {
    match ty {
        Type::Function {
            params,
            ret,
            constraints,
            ..
        } => {
            for (var, cs) in constraints {
                push(*var, cs);
            }
            for p in params {
                collect_attached(p, push);
            }
            collect_attached(ret, push);
        }
        Type::Constrained { base, constraints } => {
            for (var, cs) in constraints {
                push(*var, cs);
            }
            collect_attached(base, push);
        }
        Type::Con { args, .. } => {
            for a in args {
                collect_attached(a, push);
            }
        }
        Type::App { args, .. } => {
            for a in args {
                collect_attached(a, push);
            }
        }
        Type::List(elem) => collect_attached(elem, push),
        Type::Tuple(elems) | Type::Union(elems) => {
            for e in elems {
                collect_attached(e, push);
            }
        }
        Type::Record(fields) => {
            for ty in fields.values() {
                collect_attached(ty, push);
            }
        }
        _ => {}
    }
}

/// One-shot rendering convenience.
pub fn render_type(
    ty: &Type,
    subst: &Subst,
    var_constraints: &FxHashMap<TypeVarId, Vec<Constraint>>,
) -> String {
    TypeRenderer::new(subst, var_constraints).render(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nooc_util::Symbol;

    fn no_constraints() -> FxHashMap<TypeVarId, Vec<Constraint>> {
        FxHashMap::default()
    }

    fn v(n: u32) -> TypeVarId {
        TypeVarId(n)
    }

    #[test]
    fn test_render_primitives() {
        let s = Subst::new();
        let vc = no_constraints();
        assert_eq!(render_type(&Type::Float, &s, &vc), "Float");
        assert_eq!(render_type(&Type::Unknown, &s, &vc), "Unknown");
    }

    #[test]
    fn test_variables_named_in_first_encounter_order() {
        let s = Subst::new();
        let vc = no_constraints();
        // Variable ids are deliberately non-sequential
        let ty = Type::func(Type::Var(v(40)), Type::func(Type::Var(v(7)), Type::Var(v(40))));
        assert_eq!(render_type(&ty, &s, &vc), "a -> b -> a");
    }

    #[test]
    fn test_function_param_parenthesized() {
        let s = Subst::new();
        let vc = no_constraints();
        let ty = Type::func(
            Type::func(Type::Var(v(0)), Type::Var(v(1))),
            Type::List(Box::new(Type::Var(v(0)))),
        );
        assert_eq!(render_type(&ty, &s, &vc), "(a -> b) -> List a");
    }

    #[test]
    fn test_nested_constructor_parenthesized() {
        let s = Subst::new();
        let vc = no_constraints();
        let ty = Type::option(Type::List(Box::new(Type::Float)));
        assert_eq!(render_type(&ty, &s, &vc), "Option (List Float)");
    }

    #[test]
    fn test_record_renders_fields_in_order() {
        let s = Subst::new();
        let vc = no_constraints();
        let mut fields = indexmap::IndexMap::new();
        fields.insert(Symbol::intern("name"), Type::String);
        fields.insert(Symbol::intern("age"), Type::Float);
        assert_eq!(
            render_type(&Type::Record(fields), &s, &vc),
            "{@name String, @age Float}"
        );
    }

    #[test]
    fn test_constrained_app_renders_given_tail() {
        // pure 1 : f Float given f implements Monad
        let s = Subst::new();
        let mut vc = no_constraints();
        vc.insert(
            v(0),
            vec![Constraint::Implements {
                trait_name: Symbol::intern("Monad"),
            }],
        );
        let ty = Type::App {
            head: v(0),
            args: vec![Type::Float],
        };
        assert_eq!(render_type(&ty, &s, &vc), "a Float given a implements Monad");
    }

    #[test]
    fn test_has_constraint_renders_after_implements() {
        let s = Subst::new();
        let mut vc = no_constraints();
        vc.insert(
            v(0),
            vec![
                Constraint::HasField {
                    field: Symbol::intern("name"),
                    ty: Type::Var(v(1)),
                },
                Constraint::Implements {
                    trait_name: Symbol::intern("Show"),
                },
            ],
        );
        let ty = Type::func(Type::Var(v(0)), Type::Var(v(1)));
        assert_eq!(
            render_type(&ty, &s, &vc),
            "a -> b given a implements Show, a has {@name b}"
        );
    }

    #[test]
    fn test_accessor_type_rendering() {
        // fn obj => @name obj : a -> b given a has {@name b}
        let s = Subst::new();
        let mut vc = no_constraints();
        vc.insert(
            v(0),
            vec![Constraint::HasField {
                field: Symbol::intern("name"),
                ty: Type::Var(v(1)),
            }],
        );
        let ty = Type::func(Type::Var(v(0)), Type::Var(v(1)));
        assert_eq!(render_type(&ty, &s, &vc), "a -> b given a has {@name b}");
    }

    #[test]
    fn test_union_rendering() {
        let s = Subst::new();
        let vc = no_constraints();
        let ty = Type::Union(vec![Type::String, Type::Float]);
        assert_eq!(render_type(&ty, &s, &vc), "String | Float");
    }

    #[test]
    fn test_discharged_constraints_not_rendered() {
        let mut s = Subst::new();
        s.insert(v(0), Type::con("List"));
        let mut vc = no_constraints();
        vc.insert(
            v(0),
            vec![Constraint::Implements {
                trait_name: Symbol::intern("Functor"),
            }],
        );
        // After f := List, `f Float` must render with no given tail.
        let applied = Type::App {
            head: v(0),
            args: vec![Type::Float],
        };
        assert_eq!(render_type(&applied, &s, &vc), "List Float");
    }
}
