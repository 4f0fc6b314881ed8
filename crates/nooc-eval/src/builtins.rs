//! Native function implementations.
//!
//! Every name here has a scheme in the typer's prelude; the arity table
//! must stay in step with those schemes (checked by a test against
//! `nooc_sem::prelude::BUILTIN_NAMES`).

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;

use nooc_util::{Span, Symbol};

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use crate::Interpreter;

/// Arity of a native function, if `name` is one.
pub fn native_arity(name: Symbol) -> Option<usize> {
    Some(match name.as_str() {
        "toString" => 1,
        "print" => 1,
        "log" => 1,
        "random" => 1,
        "readLine" => 1,
        "newRef" => 1,
        "readRef" => 1,
        "writeRef" => 2,
        "at" => 2,
        "set" => 3,
        "listMap" => 2,
        "optionMap" => 2,
        "resultMap" => 2,
        "listPure" => 1,
        "optionPure" => 1,
        "resultPure" => 1,
        "listBind" => 2,
        "optionBind" => 2,
        "resultBind" => 2,
        _ => return None,
    })
}

impl Interpreter {
    /// Execute a fully applied native.
    pub(crate) fn call_native(
        &self,
        name: Symbol,
        mut args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        match name.as_str() {
            "toString" => Ok(Value::String(args.remove(0).display())),

            "print" => {
                let value = args.remove(0);
                println!("{}", value.display());
                Ok(value)
            }

            "log" => {
                let value = args.remove(0);
                eprintln!("[log] {}", value.display());
                Ok(value)
            }

            "random" => {
                // Effects are performed, not tracked, at runtime; a clock
                // seed keeps the interpreter free of extra dependencies.
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.subsec_nanos())
                    .unwrap_or(0);
                let mut x = nanos.wrapping_mul(2_654_435_761).wrapping_add(1);
                x ^= x >> 16;
                x = x.wrapping_mul(2_246_822_519);
                x ^= x >> 13;
                Ok(Value::Float(f64::from(x) / f64::from(u32::MAX)))
            }

            "readLine" => {
                let mut line = String::new();
                std::io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .map_err(|e| EvalError::Runtime {
                        message: format!("readLine failed: {}", e),
                        span,
                    })?;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Value::String(line))
            }

            "newRef" => Ok(Value::Ref(Rc::new(RefCell::new(args.remove(0))))),

            "readRef" => match args.remove(0) {
                Value::Ref(cell) => Ok(cell.borrow().clone()),
                _ => Err(EvalError::Runtime {
                    message: "readRef expects a ref".into(),
                    span,
                }),
            },

            "writeRef" => {
                let value = args.remove(1);
                match args.remove(0) {
                    Value::Ref(cell) => {
                        *cell.borrow_mut() = value.clone();
                        Ok(value)
                    }
                    _ => Err(EvalError::Runtime {
                        message: "writeRef expects a ref".into(),
                        span,
                    }),
                }
            }

            "at" => {
                let list = args.remove(1);
                let index = args.remove(0);
                match (index, list) {
                    (Value::Float(i), Value::List(elems)) => {
                        if i >= 0.0 && (i as usize) < elems.len() && i.fract() == 0.0 {
                            Ok(Value::some(elems[i as usize].clone()))
                        } else {
                            Ok(Value::none())
                        }
                    }
                    _ => Err(EvalError::Runtime {
                        message: "at expects a number and a list".into(),
                        span,
                    }),
                }
            }

            "set" => {
                let value = args.remove(2);
                let record = args.remove(1);
                let accessor = args.remove(0);
                match (accessor, record) {
                    (Value::Accessor { field, .. }, Value::Record(mut fields)) => {
                        if !fields.contains_key(&field) {
                            return Err(EvalError::Runtime {
                                message: format!("record has no field @{}", field),
                                span,
                            });
                        }
                        fields.insert(field, value);
                        Ok(Value::Record(fields))
                    }
                    _ => Err(EvalError::Runtime {
                        message: "set expects an accessor and a record".into(),
                        span,
                    }),
                }
            }

            "listMap" => {
                let list = args.remove(1);
                let func = args.remove(0);
                match list {
                    Value::List(elems) => {
                        let mut out = Vec::with_capacity(elems.len());
                        for elem in elems {
                            out.push(self.apply(func.clone(), elem, span)?);
                        }
                        Ok(Value::List(out))
                    }
                    _ => Err(EvalError::Runtime {
                        message: "listMap expects a list".into(),
                        span,
                    }),
                }
            }

            "optionMap" => {
                let option = args.remove(1);
                let func = args.remove(0);
                match option {
                    Value::Variant { name, mut args } if name.as_str() == "Some" => {
                        let mapped = self.apply(func, args.remove(0), span)?;
                        Ok(Value::some(mapped))
                    }
                    none @ Value::Variant { .. } => Ok(none),
                    _ => Err(EvalError::Runtime {
                        message: "optionMap expects an Option".into(),
                        span,
                    }),
                }
            }

            "resultMap" => {
                let result = args.remove(1);
                let func = args.remove(0);
                match result {
                    Value::Variant { name, mut args } if name.as_str() == "Ok" => {
                        let mapped = self.apply(func, args.remove(0), span)?;
                        Ok(Value::Variant {
                            name,
                            args: vec![mapped],
                        })
                    }
                    err @ Value::Variant { .. } => Ok(err),
                    _ => Err(EvalError::Runtime {
                        message: "resultMap expects a Result".into(),
                        span,
                    }),
                }
            }

            "listPure" => Ok(Value::List(vec![args.remove(0)])),

            "optionPure" => Ok(Value::some(args.remove(0))),

            "resultPure" => Ok(Value::Variant {
                name: Symbol::intern("Ok"),
                args: vec![args.remove(0)],
            }),

            "listBind" => {
                let func = args.remove(1);
                let list = args.remove(0);
                match list {
                    Value::List(elems) => {
                        let mut out = Vec::new();
                        for elem in elems {
                            match self.apply(func.clone(), elem, span)? {
                                Value::List(mut inner) => out.append(&mut inner),
                                _ => {
                                    return Err(EvalError::Runtime {
                                        message: "listBind's function must return a list".into(),
                                        span,
                                    })
                                }
                            }
                        }
                        Ok(Value::List(out))
                    }
                    _ => Err(EvalError::Runtime {
                        message: "listBind expects a list".into(),
                        span,
                    }),
                }
            }

            "optionBind" => {
                let func = args.remove(1);
                let option = args.remove(0);
                match option {
                    Value::Variant { name, mut args } if name.as_str() == "Some" => {
                        self.apply(func, args.remove(0), span)
                    }
                    none @ Value::Variant { .. } => Ok(none),
                    _ => Err(EvalError::Runtime {
                        message: "optionBind expects an Option".into(),
                        span,
                    }),
                }
            }

            "resultBind" => {
                let func = args.remove(1);
                let result = args.remove(0);
                match result {
                    Value::Variant { name, mut args } if name.as_str() == "Ok" => {
                        self.apply(func, args.remove(0), span)
                    }
                    err @ Value::Variant { .. } => Ok(err),
                    _ => Err(EvalError::Runtime {
                        message: "resultBind expects a Result".into(),
                        span,
                    }),
                }
            }

            other => Err(EvalError::Runtime {
                message: format!("unknown native function `{}`", other),
                span,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The arity table must cover exactly the prelude's native schemes.
    #[test]
    fn test_arities_cover_prelude_builtins() {
        for name in nooc_sem::prelude::BUILTIN_NAMES {
            assert!(
                native_arity(Symbol::intern(name)).is_some(),
                "missing native implementation for `{}`",
                name
            );
        }
    }

    #[test]
    fn test_unknown_name_has_no_arity() {
        assert!(native_arity(Symbol::intern("not_a_builtin")).is_none());
    }
}
