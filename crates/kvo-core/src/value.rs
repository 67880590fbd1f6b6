//! Dynamic property values.
//!
//! [`Value`] is what properties hold and what key paths resolve to. Object
//! graphs are built from two reference variants:
//!
//! - [`Value::Object`]: an observable source (`Rc<dyn Observable>`).
//! - [`Value::Record`]: a plain, read-only field map.
//!
//! Everything else (null and scalars) is opaque: reading a property from it
//! yields `Null`.
//!
//! # Identity
//!
//! [`Value::same`] is the identity test used when deciding whether a chain
//! link needs to re-point. References compare by allocation, scalars by
//! value, strings by contents. `Float(NaN)` is never the same as itself.

use std::fmt;
use std::rc::Rc;

use crate::object::Object;
use crate::observable::Observable;
use crate::record::Record;

/// A property value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent or missing.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Plain field map. Readable, never observed.
    Record(Rc<Record>),
    /// Observable source.
    Object(Rc<dyn Observable>),
}

/// How a value can serve as the source for a property read.
///
/// This is the call-site classification chains use instead of probing for
/// capabilities at runtime.
#[derive(Clone, Copy)]
pub enum Source<'a> {
    /// Supports reads and live observation.
    Observable(&'a dyn Observable),
    /// Supports reads only.
    Plain(&'a Record),
    /// Supports neither. Every read yields `Null`.
    Opaque,
}

impl Value {
    /// Wrap any shared observable.
    #[must_use]
    pub fn object(source: Rc<dyn Observable>) -> Self {
        Self::Object(source)
    }

    /// Classify this value as a read source.
    #[must_use]
    pub fn source(&self) -> Source<'_> {
        match self {
            Self::Object(obj) => Source::Observable(obj.as_ref()),
            Self::Record(rec) => Source::Plain(rec),
            _ => Source::Opaque,
        }
    }

    /// Read `property` from this value, following [`Value::source`].
    #[must_use]
    pub fn get(&self, property: &str) -> Value {
        match self.source() {
            Source::Observable(obj) => obj.get(property),
            Source::Plain(rec) => rec.get(property),
            Source::Opaque => Value::Null,
        }
    }

    /// Identity comparison.
    #[must_use]
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => Rc::ptr_eq(a, b),
            // Compare data pointers only; vtable pointers for the same type
            // are not guaranteed unique.
            (Self::Object(a), Self::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The observable behind this value, if it is one.
    #[must_use]
    pub fn as_observable(&self) -> Option<&Rc<dyn Observable>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(rec) => Some(rec),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(n) => write!(f, "Int({n})"),
            Self::Float(n) => write!(f, "Float({n})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Record(rec) => f
                .debug_struct("Record")
                .field("fields", &rec.fields().collect::<Vec<_>>())
                .finish(),
            // Objects may form cycles; print identity only.
            Self::Object(obj) => write!(f, "Object({:p})", Rc::as_ptr(obj).cast::<()>()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Record> for Value {
    fn from(rec: Record) -> Self {
        Self::Record(Rc::new(rec))
    }
}

impl From<Rc<Record>> for Value {
    fn from(rec: Rc<Record>) -> Self {
        Self::Record(rec)
    }
}

impl From<Rc<Object>> for Value {
    fn from(obj: Rc<Object>) -> Self {
        Self::Object(obj)
    }
}

impl From<&Rc<Object>> for Value {
    fn from(obj: &Rc<Object>) -> Self {
        Self::Object(Rc::clone(obj) as Rc<dyn Observable>)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}
