//! Runtime values and environments.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use nooc_sem::TypedExpr;
use nooc_util::{FxHashMap, Symbol};

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Float(f64),
    String(String),
    Unit,

    /// Tagged variant value: `True`, `Some 1`, user constructors
    Variant { name: Symbol, args: Vec<Value> },

    Tuple(Vec<Value>),
    Record(IndexMap<Symbol, Value>),
    List(Vec<Value>),

    /// Mutable cell created by `newRef`; cloning shares the cell
    Ref(Rc<RefCell<Value>>),

    /// User closure: one parameter (lambdas are curried), captured env
    Closure {
        param: Symbol,
        body: Rc<TypedExpr>,
        env: Env,
    },

    /// Native function, possibly partially applied
    Native {
        name: Symbol,
        arity: usize,
        args: Vec<Value>,
    },

    /// Constructor awaiting arguments
    Ctor {
        name: Symbol,
        arity: usize,
        args: Vec<Value>,
    },

    /// A trait function reference; the implementation is selected at the
    /// first application (statically stamped resolution preferred)
    TraitFn {
        name: Symbol,
        resolution: Option<(Symbol, Symbol)>,
    },

    /// First-class accessor
    Accessor { field: Symbol, optional: bool },

    /// Opaque value produced by `forget`
    Unknown(Box<Value>),
}

impl Value {
    /// The truth value of a Bool variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Variant { name, args } if args.is_empty() => match name.as_str() {
                "True" => Some(true),
                "False" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Build a Bool variant.
    pub fn bool(b: bool) -> Value {
        Value::Variant {
            name: Symbol::intern(if b { "True" } else { "False" }),
            args: Vec::new(),
        }
    }

    /// `Some v`
    pub fn some(v: Value) -> Value {
        Value::Variant {
            name: Symbol::intern("Some"),
            args: vec![v],
        }
    }

    /// `None`
    pub fn none() -> Value {
        Value::Variant {
            name: Symbol::intern("None"),
            args: Vec::new(),
        }
    }

    /// The runtime type name used for trait resolution: mirrors the typer's
    /// resolution keys (`Float`, `String`, `unit`, variant head, `List`,
    /// `function`, `tuple`, `record`, `Unknown`).
    pub fn type_name(&self) -> Symbol {
        match self {
            Value::Float(_) => Symbol::intern("Float"),
            Value::String(_) => Symbol::intern("String"),
            Value::Unit => Symbol::intern("unit"),
            Value::Variant { name, .. } => match name.as_str() {
                "True" | "False" => Symbol::intern("Bool"),
                "Some" | "None" => Symbol::intern("Option"),
                "Ok" | "Err" => Symbol::intern("Result"),
                _ => variant_head(*name),
            },
            Value::Tuple(_) => Symbol::intern("tuple"),
            Value::Record(_) => Symbol::intern("record"),
            Value::List(_) => Symbol::intern("List"),
            Value::Ref(_) => Symbol::intern("Ref"),
            Value::Closure { .. }
            | Value::Native { .. }
            | Value::Ctor { .. }
            | Value::TraitFn { .. }
            | Value::Accessor { .. } => Symbol::intern("function"),
            Value::Unknown(_) => Symbol::intern("Unknown"),
        }
    }

    /// Structural equality for `==`; functions are never equal.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            (
                Value::Variant { name: n1, args: a1 },
                Value::Variant { name: n2, args: a2 },
            ) => n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| x.structural_eq(y)),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Record(a), Value::Record(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.structural_eq(w)).unwrap_or(false))
            }
            (Value::Unknown(a), Value::Unknown(b)) => a.structural_eq(b),
            // Refs compare by cell identity, not contents
            (Value::Ref(a), Value::Ref(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Render a value the way the REPL and `toString` display it.
    pub fn display(&self) -> String {
        match self {
            Value::Float(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::String(s) => s.clone(),
            Value::Unit => "{}".into(),
            Value::Variant { name, args } => {
                if args.is_empty() {
                    name.to_string()
                } else {
                    let rendered: Vec<String> = args
                        .iter()
                        .map(|a| {
                            let s = a.display();
                            match a {
                                Value::Variant { args, .. } if !args.is_empty() => {
                                    format!("({})", s)
                                }
                                _ => s,
                            }
                        })
                        .collect();
                    format!("{} {}", name, rendered.join(" "))
                }
            }
            Value::Tuple(elems) => format!(
                "{{{}}}",
                elems.iter().map(Value::display).collect::<Vec<_>>().join(", ")
            ),
            Value::Record(fields) => format!(
                "{{{}}}",
                fields
                    .iter()
                    .map(|(k, v)| format!("@{} {}", k, v.display()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::List(elems) => format!(
                "[{}]",
                elems.iter().map(Value::display).collect::<Vec<_>>().join(", ")
            ),
            Value::Ref(cell) => format!("<ref {}>", cell.borrow().display()),
            Value::Closure { .. }
            | Value::Native { .. }
            | Value::Ctor { .. }
            | Value::TraitFn { .. }
            | Value::Accessor { .. } => "<function>".into(),
            Value::Unknown(_) => "<unknown>".into(),
        }
    }
}

fn variant_head(ctor: Symbol) -> Symbol {
    // User constructors resolve to their data type's head name through the
    // interpreter's constructor table; values constructed before that table
    // is consulted carry the head directly (see Interpreter::eval).
    ctor
}

/// A lexical environment: a chain of scopes, values in mutable cells so
/// `x := e` can update bindings captured by closures.
#[derive(Debug, Clone)]
pub struct Env(Rc<Scope>);

#[derive(Debug)]
struct Scope {
    vars: RefCell<FxHashMap<Symbol, Rc<RefCell<Value>>>>,
    parent: Option<Env>,
}

impl Env {
    /// A fresh root environment.
    pub fn new() -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(FxHashMap::default()),
            parent: None,
        }))
    }

    /// A child scope.
    pub fn child(&self) -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(FxHashMap::default()),
            parent: Some(self.clone()),
        }))
    }

    /// Bind (or shadow) a name in this scope.
    pub fn define(&self, name: Symbol, value: Value) {
        self.0
            .vars
            .borrow_mut()
            .insert(name, Rc::new(RefCell::new(value)));
    }

    /// Look up a binding cell, innermost scope first.
    pub fn lookup(&self, name: Symbol) -> Option<Rc<RefCell<Value>>> {
        if let Some(cell) = self.0.vars.borrow().get(&name) {
            return Some(cell.clone());
        }
        self.0.parent.as_ref()?.lookup(name)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
