//! Value conversion traits
//!
//! `FromValue` / `ToValue` map between [`Value`] and Rust types. Conversions
//! are exact: an `Int` does not convert to `i64`.

use crate::error::Raised;
use crate::types::ObjectRef;
use crate::value::Value;

/// Conversion failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type mismatch: expected {expected}, got {got}")]
pub struct TypeMismatch {
    /// Requested type
    pub expected: String,
    /// Actual runtime type
    pub got: String,
}

impl TypeMismatch {
    fn new(expected: &str, value: &Value) -> Self {
        Self {
            expected: expected.to_string(),
            got: value.type_name(),
        }
    }
}

/// Convert from a [`Value`] to a Rust type.
pub trait FromValue: Sized {
    /// Convert, returning an error if the type doesn't match
    fn from_value(value: Value) -> Result<Self, TypeMismatch>;
}

/// Convert from a Rust type to a [`Value`].
pub trait ToValue {
    /// Convert to a Value
    fn to_value(self) -> Value;
}

macro_rules! impl_primitive {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(TypeMismatch::new($name, &other)),
                }
            }
        }

        impl ToValue for $ty {
            fn to_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_primitive!(bool, Bool, "bool");
impl_primitive!(i32, Int, "int");
impl_primitive!(i64, Long, "long");
impl_primitive!(f64, Double, "double");
impl_primitive!(String, Str, "string");
impl_primitive!(ObjectRef, Object, "object");

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        Ok(value)
    }
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

// Null maps to None
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        self.map_or(Value::Null, ToValue::to_value)
    }
}

// Unit type (for void methods)
impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Null => Ok(()),
            other => Err(TypeMismatch::new("void", &other)),
        }
    }
}

impl ToValue for () {
    fn to_value(self) -> Value {
        Value::Null
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

/// Read argument `index` as `T` inside a method implementation.
///
/// A missing or mistyped argument is raised as an `IllegalArgumentException`.
pub fn arg<T: FromValue>(args: &[Value], index: usize) -> Result<T, Raised> {
    let value = args.get(index).cloned().ok_or_else(|| {
        Raised::exception(
            "IllegalArgumentException",
            format!("missing argument {}", index),
        )
    })?;
    T::from_value(value).map_err(|e| {
        Raised::exception("IllegalArgumentException", format!("argument {}: {}", index, e))
    })
}
