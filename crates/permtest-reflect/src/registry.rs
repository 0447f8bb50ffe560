//! Type registry
//!
//! Name-based lookup of [`TypeDescriptor`]s, so a harness can address types
//! the way it names them (e.g. "android.net.wifi.WifiManager") and have a
//! missing type reported as an unexpected failure rather than a crash.

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{InvokeResult, ReflectError};
use crate::invoke::invoke_reflection_call;
use crate::types::{ObjectRef, ParamType, TypeDescriptor};
use crate::value::Value;

/// Registry of type descriptors indexed by name
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type under its own name, returning any type it replaced
    pub fn register(&mut self, ty: Arc<TypeDescriptor>) -> Option<Arc<TypeDescriptor>> {
        debug!("registering type {}", ty.name());
        self.types.insert(ty.name().to_string(), ty)
    }

    /// Look up a type by name
    pub fn for_name(&self, name: &str) -> Result<Arc<TypeDescriptor>, ReflectError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| ReflectError::ClassNotFound(name.to_string()))
    }

    /// Get a type by name without an error
    pub fn get(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    /// Check if a type is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Get the number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up `type_name` and invoke a method on it.
    ///
    /// An unknown type is an unexpected failure, same as an unknown method.
    pub fn invoke_by_name(
        &self,
        type_name: &str,
        method_name: &str,
        receiver: Option<&ObjectRef>,
        signature: &[ParamType],
        args: &[Value],
    ) -> InvokeResult<Value> {
        let target = self.for_name(type_name)?;
        invoke_reflection_call(&target, method_name, receiver, signature, args)
    }
}
