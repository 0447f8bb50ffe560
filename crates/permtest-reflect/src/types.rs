//! Type and method descriptors
//!
//! This is the metadata the invoker resolves against. Types are declared
//! once with [`TypeBuilder`] and are immutable afterwards, so a descriptor
//! can be shared across threads behind an `Arc`.
//!
//! Method lookup follows public-member semantics: [`TypeDescriptor::get_method`]
//! only sees public methods, searches the declared methods first and then
//! walks the superclass chain.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Raised;
use crate::value::Value;

// ============================================================================
// ParamType
// ============================================================================

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// bool
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// String
    Str,
    /// Instance of the named type or one of its subtypes
    Object(String),
    /// Top type
    Any,
    /// No value (return types only)
    Void,
}

impl ParamType {
    /// Object type by name
    pub fn object(type_name: impl Into<String>) -> Self {
        ParamType::Object(type_name.into())
    }

    /// Reference types accept null
    pub fn is_reference(&self) -> bool {
        matches!(self, ParamType::Str | ParamType::Object(_) | ParamType::Any)
    }

    /// Check if a value is assignable to this declared type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Void, _) => false,
            (ParamType::Any, _) => true,
            (ty, Value::Null) => ty.is_reference(),
            (ParamType::Bool, Value::Bool(_))
            | (ParamType::Int, Value::Int(_))
            | (ParamType::Long, Value::Long(_))
            | (ParamType::Double, Value::Double(_))
            | (ParamType::Str, Value::Str(_)) => true,
            (ParamType::Object(name), Value::Object(obj)) => obj.is_instance_of(name),
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Bool => write!(f, "bool"),
            ParamType::Int => write!(f, "int"),
            ParamType::Long => write!(f, "long"),
            ParamType::Double => write!(f, "double"),
            ParamType::Str => write!(f, "string"),
            ParamType::Object(name) => write!(f, "{}", name),
            ParamType::Any => write!(f, "any"),
            ParamType::Void => write!(f, "void"),
        }
    }
}

// ============================================================================
// MethodDescriptor
// ============================================================================

/// Method implementation: receiver (absent for static methods) and arguments.
pub type MethodHandler =
    Arc<dyn Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, Raised> + Send + Sync>;

/// A method declared on a type
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<ParamType>,
    returns: ParamType,
    is_public: bool,
    is_static: bool,
    handler: MethodHandler,
}

impl MethodDescriptor {
    /// Create a public instance method
    pub fn new(
        name: impl Into<String>,
        params: &[ParamType],
        returns: ParamType,
        handler: impl Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params: params.to_vec(),
            returns,
            is_public: true,
            is_static: false,
            handler: Arc::new(handler),
        }
    }

    /// Mark as static method
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Hide from public lookup
    pub fn non_public(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Declared return type
    pub fn returns(&self) -> &ParamType {
        &self.returns
    }

    /// Whether the method is public
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Whether the method is static
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Exact match on name and declared parameter types
    pub fn matches(&self, name: &str, signature: &[ParamType]) -> bool {
        self.name == name && self.params == signature
    }

    pub(crate) fn call(&self, receiver: Option<&ObjectRef>, args: &[Value]) -> Result<Value, Raised> {
        (self.handler)(receiver, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("is_public", &self.is_public)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TypeDescriptor
// ============================================================================

/// A described type: name, visibility, superclass and methods.
#[derive(Debug)]
pub struct TypeDescriptor {
    name: String,
    is_public: bool,
    superclass: Option<Arc<TypeDescriptor>>,
    /// Overloads grouped by method name
    methods: FxHashMap<String, Vec<MethodDescriptor>>,
}

impl TypeDescriptor {
    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the type is public
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<&Arc<TypeDescriptor>> {
        self.superclass.as_ref()
    }

    /// Find a method declared directly on this type, public or not.
    pub fn get_declared_method(&self, name: &str, signature: &[ParamType]) -> Option<&MethodDescriptor> {
        self.methods
            .get(name)?
            .iter()
            .find(|m| m.matches(name, signature))
    }

    /// Find a public method by exact name and signature, including inherited
    /// ones. Returns the declaring type together with the method.
    pub fn get_method(
        &self,
        name: &str,
        signature: &[ParamType],
    ) -> Option<(&TypeDescriptor, &MethodDescriptor)> {
        let mut current = Some(self);
        while let Some(ty) = current {
            if let Some(method) = ty.get_declared_method(name, signature) {
                if method.is_public() {
                    return Some((ty, method));
                }
            }
            current = ty.superclass.as_deref();
        }
        None
    }

    /// Check if this type is `type_name` or inherits from it
    pub fn is_subclass_of(&self, type_name: &str) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty.name == type_name {
                return true;
            }
            current = ty.superclass.as_deref();
        }
        false
    }

    /// All methods declared directly on this type
    pub fn declared_methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values().flatten()
    }

    /// Number of methods declared directly on this type
    pub fn method_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }
}

// ============================================================================
// TypeBuilder
// ============================================================================

/// Builder for [`TypeDescriptor`]s.
///
/// Declaring a second method with the same name and signature replaces the
/// first.
pub struct TypeBuilder {
    name: String,
    is_public: bool,
    superclass: Option<Arc<TypeDescriptor>>,
    methods: FxHashMap<String, Vec<MethodDescriptor>>,
}

impl TypeBuilder {
    /// Start a public type with no superclass
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_public: true,
            superclass: None,
            methods: FxHashMap::default(),
        }
    }

    /// Set the superclass
    pub fn superclass(mut self, parent: Arc<TypeDescriptor>) -> Self {
        self.superclass = Some(parent);
        self
    }

    /// Mark the type as non-public
    pub fn non_public(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        let overloads = self.methods.entry(method.name().to_string()).or_default();
        overloads.retain(|m| m.params() != method.params());
        overloads.push(method);
        self
    }

    /// Add a public static method
    pub fn static_method(
        self,
        name: impl Into<String>,
        params: &[ParamType],
        returns: ParamType,
        handler: impl Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDescriptor::new(name, params, returns, handler).as_static())
    }

    /// Add a public instance method
    pub fn instance_method(
        self,
        name: impl Into<String>,
        params: &[ParamType],
        returns: ParamType,
        handler: impl Fn(Option<&ObjectRef>, &[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDescriptor::new(name, params, returns, handler))
    }

    /// Finish the type
    pub fn build(self) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            name: self.name,
            is_public: self.is_public,
            superclass: self.superclass,
            methods: self.methods,
        })
    }
}

// ============================================================================
// ObjectRef
// ============================================================================

/// Shared handle to an instance of a described type.
///
/// The payload is opaque to the invoker; methods recover it with
/// [`ObjectRef::downcast`].
#[derive(Clone)]
pub struct ObjectRef {
    class: Arc<TypeDescriptor>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Create an instance of `class` holding `payload`
    pub fn new<T: Any + Send + Sync>(class: Arc<TypeDescriptor>, payload: T) -> Self {
        Self {
            class,
            payload: Arc::new(payload),
        }
    }

    /// Runtime type of the instance
    pub fn class(&self) -> &Arc<TypeDescriptor> {
        &self.class
    }

    /// Check if the instance's type is `type_name` or a subtype of it
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        self.class.is_subclass_of(type_name)
    }

    /// Borrow the payload as `T`
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::as_ptr(&self.payload) as *const () == Arc::as_ptr(&other.payload) as *const ()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:p})", self.class.name(), Arc::as_ptr(&self.payload))
    }
}
