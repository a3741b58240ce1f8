use std::{
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    ast::{FunctionDecl, Typed},
    env::Scope,
    types::Type,
};

/// A runtime value. `'p` is the lifetime of the program being run.
#[derive(Clone)]
pub enum Value<'p> {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    None,
    Function(Closure<'p>),
}

/// A user function bound to the scope it was declared in.
///
/// The scope owns the closure, so the closure only keeps a weak handle to it.
#[derive(Clone)]
pub struct Closure<'p> {
    pub decl: &'p FunctionDecl<Typed>,
    pub scope: Weak<Scope<'p>>,
}

impl<'p> Value<'p> {
    pub fn str(s: &str) -> Value<'p> {
        Value::Str(Rc::from(s))
    }

    /// Converts an `int` into a `float` if `ty` asks for it. Everything else
    /// is returned as is.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn widen_to(self, ty: Type) -> Value<'p> {
        match (self, ty) {
            (Value::Int(i), Type::Float) => Value::Float(i as f64),
            (value, _) => value,
        }
    }

    /// Numeric view of the value, widening integers.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(i) => Some(i as f64),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            // Whole floats keep their fractional part, so `2.0` never prints
            // as `2`.
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::None => f.write_str("None"),
            Value::Function(_) => f.write_str("<function>"),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::None => f.write_str("None"),
            Value::Function(closure) => closure.fmt(f),
        }
    }
}

impl fmt::Debug for Closure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.decl.name.name)
            .field("arity", &self.decl.params.len())
            .field("live_scope", &(self.scope.strong_count() > 0))
            .finish()
    }
}

impl PartialEq for Value<'_> {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::eq(a.decl, b.decl) && Weak::ptr_eq(&a.scope, &b.scope)
            }
            _ => false,
        }
    }
}
