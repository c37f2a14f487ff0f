//! Attribute values used as bucket keys
//!
//! Values have a deterministic total order across kinds:
//! Bool < Int < Float < Text < Ref. Within a kind the natural order applies;
//! floats use `OrderedFloat` so NaN and signed zero sort consistently.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::TryFromIntError;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Declared kind of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// String
    Text,
    /// Identity reference to a nested record
    Ref,
    /// Heterogeneous values; ordering mismatches surface at query time
    Mixed,
}

impl ValueKind {
    /// Whether values of this kind have a natural ordering usable by a
    /// sorted index without an explicit comparator.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, ValueKind::Ref)
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Ref => "ref",
            ValueKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared reference to a nested record, compared by identity.
#[derive(Clone)]
pub struct BeanRef(Arc<dyn Any + Send + Sync>);

impl BeanRef {
    /// Wrap a shared record
    pub fn new<T: Any + Send + Sync>(bean: Arc<T>) -> Self {
        BeanRef(bean)
    }

    /// Borrow the referenced record as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        &*self.0
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for BeanRef {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for BeanRef {}

impl Hash for BeanRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl PartialOrd for BeanRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeanRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

impl fmt::Debug for BeanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanRef({:#x})", self.address())
    }
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value with total ordering
    Float(OrderedFloat<f64>),
    /// String value
    Text(String),
    /// Nested record reached at the end of a path
    Ref(BeanRef),
}

impl Value {
    /// Create a float value
    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    /// Create a text value
    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(v.into())
    }

    /// Concrete kind of this value (never `Mixed`)
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Ref(_) => ValueKind::Ref,
        }
    }

    /// Returns the integer if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `Text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the float if this is a `Float`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(v.0),
            _ => None,
        }
    }

    /// Returns the bool if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the nested record reference if this is a `Ref`
    pub fn as_ref_bean(&self) -> Option<&BeanRef> {
        match self {
            Value::Ref(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v.0),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Ref(v) => write!(f, "{:?}", v),
        }
    }
}

macro_rules! int_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_value {
    ($($t:ty),*) => {
        $(
            impl TryFrom<$t> for Value {
                type Error = TryFromIntError;

                fn try_from(v: $t) -> Result<Self, Self::Error> {
                    i64::try_from(v).map(Value::Int)
                }
            }
        )*
    };
}

// Integers wider than `i64` convert only when they fit. Readers of such
// attributes return `i64::try_from(n).ok()`, which reads as absent on overflow.
wide_int_value!(u64, usize, isize, i128, u128);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<BeanRef> for Value {
    fn from(v: BeanRef) -> Self {
        Value::Ref(v)
    }
}
