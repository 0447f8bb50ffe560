//! Value — dynamically typed argument, receiver and result values
//!
//! Everything that crosses the invocation boundary is a [`Value`]. Primitive
//! values are stored inline; instances are shared [`ObjectRef`] handles that
//! carry their runtime type.
//!
//! ```text
//! Null        absent reference (also the result of a void method)
//! Bool        bool
//! Int         i32
//! Long        i64
//! Double      f64
//! Str         owned string
//! Object      ObjectRef (type descriptor + opaque payload)
//! ```

use crate::types::ObjectRef;

/// A dynamically typed value passed to or returned from a method.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Null reference
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// String
    Str(String),
    /// Instance of a described type
    Object(ObjectRef),
}

impl Value {
    // ========================================================================
    // Type checks
    // ========================================================================

    /// Check if value is null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is an object reference
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    // ========================================================================
    // Extraction
    // ========================================================================

    /// Get as bool if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32 if this is an int
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64 if this is a long
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the object handle if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Runtime type name, used in diagnostics.
    ///
    /// Objects report the name of their concrete type.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Long(_) => "long".to_string(),
            Value::Double(_) => "double".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Object(obj) => obj.class().name().to_string(),
        }
    }
}

/// Objects compare by identity, everything else by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}
