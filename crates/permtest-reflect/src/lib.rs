//! permtest-reflect - normalized reflective invocation for permission tests
//!
//! A permission test probes a guarded operation and needs to tell two things
//! apart: the operation was correctly refused, or the test itself is broken.
//! This crate invokes a method by name and exact signature on a described
//! type and reports exactly one of:
//!
//! - the method's return value,
//! - [`InvokeError::SecurityDenial`]: the method raised a
//!   [`SecurityException`], passed through unchanged,
//! - [`InvokeError::UnexpectedFailure`]: anything else, with the original
//!   failure kept as the source.
//!
//! # Example
//!
//! ```ignore
//! use permtest_reflect::{invoke_reflection_call, arg, ParamType, TypeBuilder, Value};
//!
//! let ty = TypeBuilder::new("Probe")
//!     .static_method("getX", &[ParamType::Int], ParamType::Int, |_, args| {
//!         Ok(Value::Int(arg::<i32>(args, 0)? * 2))
//!     })
//!     .build();
//!
//! let x = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Int(21)])?;
//! assert_eq!(x, Value::Int(42));
//! ```

#![warn(missing_docs)]

pub mod convert;
pub mod error;
pub mod invoke;
pub mod permissions;
pub mod registry;
pub mod types;
pub mod value;

pub use convert::{arg, FromValue, ToValue, TypeMismatch};
pub use error::{
    ConfigError, InvokeError, InvokeResult, Raised, ReflectError, SecurityException,
    UnexpectedTestFailure,
};
pub use invoke::{invoke_reflection_call, ReflectiveInvoker};
pub use permissions::{GateConfig, PermissionGate, PermissionsSection};
pub use registry::TypeRegistry;
pub use types::{MethodDescriptor, MethodHandler, ObjectRef, ParamType, TypeBuilder, TypeDescriptor};
pub use value::Value;
