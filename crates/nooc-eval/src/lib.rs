//! nooc-eval - Tree-walking evaluator for Noolang.
//!
//! Consumes the decorated AST and the trait registry produced by the typer.
//! Trait-function calls resolve to implementations by type name at the call
//! site: the typer's stamped resolution when it collapsed statically, the
//! first argument's runtime type name otherwise (no dictionary passing).
//!
//! Untagged unions carry no runtime tag; `forget` wraps its value in an
//! opaque `Unknown` that only the optional adapters can look inside.
//! Effects are performed here, not tracked; the typer already reported the
//! effect sets.

mod builtins;
mod error;
pub mod value;

pub use error::{EvalError, EvalResult};
pub use value::{Env, Value};

use std::rc::Rc;

use nooc_sem::{InferenceState, TraitRegistry, TypedExpr, TypedExprKind, TypedMatchArm};
use nooc_par::{Literal, Pattern, PatternKind};
use nooc_util::{FxHashMap, Span, Symbol};

use crate::state_tables::ctor_table;

mod state_tables {
    use super::*;
    use nooc_sem::state::TypeConInfo;

    /// Constructor name -> data type head name, from the typer's
    /// type-constructor table.
    pub fn ctor_table(state: &InferenceState) -> FxHashMap<Symbol, Symbol> {
        let mut out = FxHashMap::default();
        for (type_name, info) in &state.type_cons {
            if let TypeConInfo::Variant { ctors, .. } = info {
                for ctor in ctors {
                    out.insert(*ctor, *type_name);
                }
            }
        }
        out
    }
}

/// The interpreter: the trait registry, the constructor table, and the
/// global environment.
pub struct Interpreter {
    registry: TraitRegistry,
    ctor_types: FxHashMap<Symbol, Symbol>,
    globals: Env,
}

impl Interpreter {
    /// Build an interpreter from the typer's final state.
    pub fn new(state: &InferenceState) -> Self {
        Self {
            registry: state.registry.clone(),
            ctor_types: ctor_table(state),
            globals: Env::new(),
        }
    }

    /// Evaluate a typed program; the result is the last statement's value.
    pub fn eval_program(&mut self, program: &[TypedExpr]) -> EvalResult<Value> {
        let env = self.globals.clone();
        let mut last = Value::Unit;
        for stmt in program {
            last = self.eval(stmt, &env)?;
        }
        Ok(last)
    }

    /// Evaluate one statement in the global scope (REPL entry point).
    pub fn eval_statement(&mut self, stmt: &TypedExpr) -> EvalResult<Value> {
        let env = self.globals.clone();
        self.eval(stmt, &env)
    }

    /// Replace the registry (the REPL re-types statements against an
    /// evolving state and the evaluator must see new implementations).
    pub fn update_from(&mut self, state: &InferenceState) {
        self.registry = state.registry.clone();
        self.ctor_types = ctor_table(state);
    }

    /// Evaluate an expression.
    pub fn eval(&self, expr: &TypedExpr, env: &Env) -> EvalResult<Value> {
        let span = expr.span;
        match &expr.kind {
            TypedExprKind::Literal(lit) => Ok(match lit {
                Literal::Number(n) => Value::Float(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Unit => Value::Unit,
            }),

            TypedExprKind::Variable {
                name, resolution, ..
            } => self.eval_variable(*name, resolution.clone(), &expr.ty, env, span),

            TypedExprKind::Function { param, body } => Ok(Value::Closure {
                param: *param,
                body: Rc::new((**body).clone()),
                env: env.clone(),
            }),

            TypedExprKind::Application { func, arg } => {
                let func_v = self.eval(func, env)?;
                let arg_v = self.eval(arg, env)?;
                self.apply(func_v, arg_v, span)
            }

            TypedExprKind::Binary { op, left, right } => {
                let left_v = self.eval(left, env)?;
                let right_v = self.eval(right, env)?;
                self.eval_binary(*op, left_v, right_v, span)
            }

            TypedExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_v = self.eval(cond, env)?;
                match cond_v.as_bool() {
                    Some(true) => self.eval(then_branch, env),
                    Some(false) => self.eval(else_branch, env),
                    None => Err(EvalError::Runtime {
                        message: "if condition was not a Bool".into(),
                        span,
                    }),
                }
            }

            TypedExprKind::Match { scrutinee, arms } => {
                let value = self.eval(scrutinee, env)?;
                self.eval_match(&value, arms, env, span)
            }

            TypedExprKind::Record { fields } => {
                let mut out = indexmap::IndexMap::new();
                for (name, value) in fields {
                    out.insert(*name, self.eval(value, env)?);
                }
                Ok(Value::Record(out))
            }

            TypedExprKind::Tuple { elements } => Ok(Value::Tuple(
                elements
                    .iter()
                    .map(|e| self.eval(e, env))
                    .collect::<EvalResult<_>>()?,
            )),

            TypedExprKind::List { elements } => Ok(Value::List(
                elements
                    .iter()
                    .map(|e| self.eval(e, env))
                    .collect::<EvalResult<_>>()?,
            )),

            TypedExprKind::Accessor { field, optional } => Ok(Value::Accessor {
                field: *field,
                optional: *optional,
            }),

            TypedExprKind::Definition { name, value }
            | TypedExprKind::MutDefinition { name, value } => {
                let v = self.eval(value, env)?;
                env.define(*name, v.clone());
                Ok(v)
            }

            TypedExprKind::Mutation { name, value } => {
                let v = self.eval(value, env)?;
                let cell = env.lookup(*name).ok_or(EvalError::UnboundVariable {
                    name: *name,
                    span,
                })?;
                *cell.borrow_mut() = v;
                Ok(Value::Unit)
            }

            TypedExprKind::Sequence { exprs } => {
                let scope = env.child();
                let mut last = Value::Unit;
                for e in exprs {
                    last = self.eval(e, &scope)?;
                }
                Ok(last)
            }

            TypedExprKind::ConstraintDef { .. }
            | TypedExprKind::ImplementDef { .. }
            | TypedExprKind::TypeDef { .. } => Ok(Value::Unit),

            TypedExprKind::Import { program, names, .. } => {
                let scope = env.child();
                for stmt in program {
                    self.eval(stmt, &scope)?;
                }
                let mut fields = indexmap::IndexMap::new();
                for name in names {
                    if let Some(cell) = scope.lookup(*name) {
                        fields.insert(*name, cell.borrow().clone());
                    }
                }
                Ok(Value::Record(fields))
            }

            TypedExprKind::Forget { expr } => {
                let inner = self.eval(expr, env)?;
                Ok(Value::Unknown(Box::new(inner)))
            }
        }
    }

    fn eval_variable(
        &self,
        name: Symbol,
        resolution: Option<(Symbol, Symbol)>,
        ty: &nooc_sem::Type,
        env: &Env,
        span: Span,
    ) -> EvalResult<Value> {
        if let Some(cell) = env.lookup(name) {
            return Ok(cell.borrow().clone());
        }
        if let Some(native) = builtins::native_arity(name) {
            return Ok(Value::Native {
                name,
                arity: native,
                args: Vec::new(),
            });
        }
        if self.ctor_types.contains_key(&name) || is_builtin_ctor(name) {
            let arity = curried_arity(ty);
            if arity == 0 {
                return Ok(Value::Variant {
                    name,
                    args: Vec::new(),
                });
            }
            return Ok(Value::Ctor {
                name,
                arity,
                args: Vec::new(),
            });
        }
        if self.registry.is_trait_function(name) {
            return Ok(Value::TraitFn { name, resolution });
        }
        Err(EvalError::UnboundVariable { name, span })
    }

    /// Apply one argument to a function value.
    pub fn apply(&self, func: Value, arg: Value, span: Span) -> EvalResult<Value> {
        match func {
            Value::Closure { param, body, env } => {
                let scope = env.child();
                scope.define(param, arg);
                self.eval(&body, &scope)
            }

            Value::Native { name, arity, mut args } => {
                args.push(arg);
                if args.len() == arity {
                    self.call_native(name, args, span)
                } else {
                    Ok(Value::Native { name, arity, args })
                }
            }

            Value::Ctor { name, arity, mut args } => {
                args.push(arg);
                if args.len() == arity {
                    Ok(Value::Variant { name, args })
                } else {
                    Ok(Value::Ctor { name, arity, args })
                }
            }

            Value::Accessor { field, optional } => self.access_field(field, optional, arg, span),

            Value::TraitFn { name, resolution } => {
                let impl_body = self.select_implementation(name, resolution, &arg, span)?;
                let impl_value = self.eval(&impl_body, &self.globals)?;
                self.apply(impl_value, arg, span)
            }

            other => Err(EvalError::Runtime {
                message: format!("`{}` is not a function", other.display()),
                span,
            }),
        }
    }

    fn access_field(
        &self,
        field: Symbol,
        optional: bool,
        value: Value,
        span: Span,
    ) -> EvalResult<Value> {
        match (&value, optional) {
            (Value::Record(fields), false) => {
                fields.get(&field).cloned().ok_or(EvalError::Runtime {
                    message: format!("record has no field @{}", field),
                    span,
                })
            }
            (Value::Record(fields), true) => Ok(match fields.get(&field) {
                Some(v) => Value::some(v.clone()),
                None => Value::none(),
            }),
            (Value::Unknown(inner), true) => match inner.as_ref() {
                Value::Record(fields) => Ok(match fields.get(&field) {
                    Some(v) => Value::some(Value::Unknown(Box::new(v.clone()))),
                    None => Value::none(),
                }),
                _ => Ok(Value::none()),
            },
            _ => Err(EvalError::Runtime {
                message: format!("@{} applied to a non-record value", field),
                span,
            }),
        }
    }

    /// Select the trait implementation body for a call.
    fn select_implementation(
        &self,
        fn_name: Symbol,
        resolution: Option<(Symbol, Symbol)>,
        first_arg: &Value,
        span: Span,
    ) -> EvalResult<TypedExpr> {
        // Statically collapsed resolution wins.
        if let Some((trait_name, type_name)) = resolution {
            if let Some(imp) = self.registry.implementation(trait_name, type_name) {
                if let Some(body) = imp.typed_functions.get(&fn_name) {
                    return Ok(body.clone());
                }
            }
        }

        // Dynamic resolution by the first argument's runtime type name.
        let key = self.runtime_type_name(first_arg);
        match self.registry.resolve(fn_name, key) {
            nooc_sem::Resolution::Found {
                trait_name,
                type_name,
            } => {
                if let Some(imp) = self.registry.implementation(trait_name, type_name) {
                    if let Some(body) = imp.typed_functions.get(&fn_name) {
                        return Ok(body.clone());
                    }
                }
            }
            nooc_sem::Resolution::Ambiguous { first, second } => {
                return Err(EvalError::Runtime {
                    message: format!(
                        "ambiguous call to `{}`: both `{}` and `{}` implement it for `{}`",
                        fn_name, first, second, key
                    ),
                    span,
                })
            }
            nooc_sem::Resolution::NotFound => {}
        }

        // Default instance: a deferred `pure 1` evaluates with the Option
        // implementation when nothing pinned the functor.
        for trait_name in self.registry.traits_declaring(fn_name) {
            if let Some(imp) = self
                .registry
                .implementation(*trait_name, Symbol::intern("Option"))
            {
                if let Some(body) = imp.typed_functions.get(&fn_name) {
                    return Ok(body.clone());
                }
            }
        }

        Err(EvalError::NoImplementation {
            function: fn_name,
            type_name: key,
            span,
        })
    }

    /// Runtime resolution key; user variant constructors map through the
    /// constructor table to their data type's head name.
    fn runtime_type_name(&self, value: &Value) -> Symbol {
        if let Value::Variant { name, .. } = value {
            if let Some(head) = self.ctor_types.get(name) {
                return *head;
            }
        }
        value.type_name()
    }

    fn eval_binary(
        &self,
        op: nooc_par::BinOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> EvalResult<Value> {
        use nooc_par::BinOp;
        match op {
            BinOp::Add => match (left, right) {
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                (l, r) => Err(self.binary_type_error(op, &l, &r, span)),
            },
            BinOp::Sub | BinOp::Mul | BinOp::Div => match (left, right) {
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    _ => a / b,
                })),
                (l, r) => Err(self.binary_type_error(op, &l, &r, span)),
            },
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ordering = match (&left, &right) {
                    (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => None,
                };
                match ordering {
                    Some(ord) => Ok(Value::bool(match op {
                        BinOp::Lt => ord.is_lt(),
                        BinOp::Le => ord.is_le(),
                        BinOp::Gt => ord.is_gt(),
                        _ => ord.is_ge(),
                    })),
                    None => Err(self.binary_type_error(op, &left, &right, span)),
                }
            }
            BinOp::Eq => Ok(Value::bool(left.structural_eq(&right))),
            BinOp::Ne => Ok(Value::bool(!left.structural_eq(&right))),
        }
    }

    fn binary_type_error(
        &self,
        op: nooc_par::BinOp,
        left: &Value,
        right: &Value,
        span: Span,
    ) -> EvalError {
        EvalError::Runtime {
            message: format!(
                "cannot apply `{}` to {} and {}",
                op.as_str(),
                left.display(),
                right.display()
            ),
            span,
        }
    }

    fn eval_match(
        &self,
        value: &Value,
        arms: &[TypedMatchArm],
        env: &Env,
        span: Span,
    ) -> EvalResult<Value> {
        for arm in arms {
            let scope = env.child();
            if self.match_pattern(&arm.pattern, value, &scope) {
                return self.eval(&arm.body, &scope);
            }
        }
        Err(EvalError::NonExhaustiveMatch { span })
    }

    /// Try to match a value against a pattern, binding into `scope`.
    fn match_pattern(&self, pattern: &Pattern, value: &Value, scope: &Env) -> bool {
        match (&pattern.kind, value) {
            (PatternKind::Wildcard, _) => true,
            (PatternKind::Variable(name), v) => {
                scope.define(*name, v.clone());
                true
            }
            (PatternKind::Literal(Literal::Number(n)), Value::Float(v)) => n == v,
            (PatternKind::Literal(Literal::String(s)), Value::String(v)) => s == v,
            (PatternKind::Literal(Literal::Unit), Value::Unit) => true,
            (
                PatternKind::Constructor { name, args },
                Value::Variant {
                    name: vname,
                    args: vargs,
                },
            ) => {
                name == vname
                    && args.len() == vargs.len()
                    && args
                        .iter()
                        .zip(vargs)
                        .all(|(p, v)| self.match_pattern(p, v, scope))
            }
            (PatternKind::Tuple { elements }, Value::Tuple(values)) => {
                elements.len() == values.len()
                    && elements
                        .iter()
                        .zip(values)
                        .all(|(p, v)| self.match_pattern(p, v, scope))
            }
            (PatternKind::Record { fields }, Value::Record(values)) => {
                fields.iter().all(|(name, p)| {
                    values
                        .get(name)
                        .map(|v| self.match_pattern(p, v, scope))
                        .unwrap_or(false)
                })
            }
            _ => false,
        }
    }
}

/// Curried parameter count of a function type.
fn curried_arity(ty: &nooc_sem::Type) -> usize {
    match ty {
        nooc_sem::Type::Function { params, ret, .. } => params.len() + curried_arity(ret),
        nooc_sem::Type::Constrained { base, .. } => curried_arity(base),
        _ => 0,
    }
}

fn is_builtin_ctor(name: Symbol) -> bool {
    matches!(
        name.as_str(),
        "True" | "False" | "Some" | "None" | "Ok" | "Err"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nooc_sem::typecheck;
    use nooc_util::Handler;

    fn run(source: &str) -> Value {
        let handler = Handler::new();
        let program = nooc_par::Parser::parse_source(source, &handler);
        assert!(!handler.has_errors(), "parse failed: {}", source);
        let (typed, state) = typecheck(&program).expect("typecheck failed");
        let mut interp = Interpreter::new(&state);
        interp.eval_program(&typed).expect("evaluation failed")
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("1.0 + 2.0").display(), "3");
        assert_eq!(run("10 - 2 * 3").display(), "4");
        assert_eq!(run("\"a\" + \"b\"").display(), "ab");
    }

    #[test]
    fn test_map_over_list() {
        assert_eq!(run("map (fn x => x + 1) [1, 2, 3]").display(), "[2, 3, 4]");
    }

    #[test]
    fn test_pure_defaults_to_option() {
        assert_eq!(run("pure 1").display(), "Some 1");
    }

    #[test]
    fn test_show_through_trait() {
        let source = "constraint Display a ( display : a -> String ); \
                      implement Display Float ( display = toString ); \
                      display 42";
        assert_eq!(run(source).display(), "42");
    }

    #[test]
    fn test_accessor_and_set() {
        assert_eq!(run("@name {@name \"n\", @age 3}").display(), "n");
        assert_eq!(
            run("set @x {@x 1, @y 2} 5").display(),
            "{@x 5, @y 2}"
        );
    }

    #[test]
    fn test_set_then_get_round_trip() {
        assert_eq!(run("set @f {@f 1} 9 | @f").display(), "9");
    }

    #[test]
    fn test_if_and_match() {
        assert_eq!(run("if 1 < 2 then \"yes\" else \"no\"").display(), "yes");
        assert_eq!(
            run("match Some 5 with (Some x => x + 1; None => 0)").display(),
            "6"
        );
    }

    #[test]
    fn test_match_literal_and_wildcard() {
        assert_eq!(
            run("match 2 with (1 => \"one\"; 2 => \"two\"; _ => \"many\")").display(),
            "two"
        );
    }

    #[test]
    fn test_non_exhaustive_match_errors_at_runtime() {
        let handler = Handler::new();
        let program =
            nooc_par::Parser::parse_source("match None with (Some x => x)", &handler);
        let (typed, state) = typecheck(&program).unwrap();
        let mut interp = Interpreter::new(&state);
        let err = interp.eval_program(&typed).unwrap_err();
        assert!(matches!(err, EvalError::NonExhaustiveMatch { .. }));
    }

    #[test]
    fn test_user_variants() {
        let source = "type Shape = Circle Float | Square Float; \
                      area = fn s => match s with (Circle r => 3 * r * r; Square w => w * w); \
                      area (Circle 2)";
        assert_eq!(run(source).display(), "12");
    }

    #[test]
    fn test_union_narrowing_by_match() {
        let source = "type U = String | Float; \
                      x = 1 : U; \
                      match x with (n => n)";
        assert_eq!(run(source).display(), "1");
    }

    #[test]
    fn test_forget_and_optional_accessor() {
        assert_eq!(run("@name? (forget {@name 7})").display(), "Some <unknown>");
        assert_eq!(run("@ghost? (forget {@name 7})").display(), "None");
        assert_eq!(run("@name? {@name 7}").display(), "Some 7");
    }

    #[test]
    fn test_at_builtin() {
        assert_eq!(run("at 1 [10, 20, 30]").display(), "Some 20");
        assert_eq!(run("at 9 [10, 20, 30]").display(), "None");
    }

    #[test]
    fn test_recursion() {
        let source = "fact = fn n => if n < 1 then 1 else n * fact (n - 1); fact 5";
        assert_eq!(run(source).display(), "120");
    }

    #[test]
    fn test_mutation() {
        assert_eq!(run("mut c = 0; c := c + 5; c").display(), "5");
    }

    #[test]
    fn test_refs_read_write() {
        assert_eq!(run("r = newRef 1; readRef r").display(), "1");
        assert_eq!(run("r = newRef 1; writeRef r 5; readRef r").display(), "5");
        // writeRef returns the written value
        assert_eq!(run("r = newRef 1; writeRef r 5").display(), "5");
    }

    #[test]
    fn test_refs_share_their_cell() {
        assert_eq!(
            run("r = newRef 1; s = r; writeRef s 9; readRef r").display(),
            "9"
        );
    }

    #[test]
    fn test_pipe_application() {
        assert_eq!(run("3 | (fn x => x * 2)").display(), "6");
    }

    #[test]
    fn test_bind_on_option() {
        assert_eq!(
            run("bind (Some 2) (fn x => Some (x + 1))").display(),
            "Some 3"
        );
    }

    #[test]
    fn test_closure_capture() {
        let source = "makeAdder = fn n => fn x => x + n; add3 = makeAdder 3; add3 4";
        assert_eq!(run(source).display(), "7");
    }
}
