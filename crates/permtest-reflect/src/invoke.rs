//! Normalized reflective invocation
//!
//! Resolves a public method by exact name and signature, invokes it, and
//! folds every failure into one of two outcomes:
//!
//! | Failure                                  | Outcome                         |
//! |------------------------------------------|---------------------------------|
//! | callee raised `SecurityException`        | `SecurityDenial`, unchanged     |
//! | class/method not found                   | `UnexpectedFailure` (wrapped)   |
//! | declaring type not public                | `UnexpectedFailure` (wrapped)   |
//! | arity, argument type, receiver mismatch  | `UnexpectedFailure` (wrapped)   |
//! | callee raised anything else, or panicked | `UnexpectedFailure` (wrapped)   |
//!
//! Only the immediate failure raised by the callee is inspected for a
//! denial. A denial buried in a cause chain is reported as unexpected.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};

use crate::convert::FromValue;
use crate::error::{format_signature, InvokeError, InvokeResult, Raised, ReflectError};
use crate::types::{MethodDescriptor, ObjectRef, ParamType, TypeDescriptor};
use crate::value::Value;

/// Invoke `method_name` with the exact `signature` on `target`.
///
/// `receiver` must be `None` for static methods and an instance of the
/// declaring type for instance methods. Void methods return `Value::Null`.
pub fn invoke_reflection_call(
    target: &TypeDescriptor,
    method_name: &str,
    receiver: Option<&ObjectRef>,
    signature: &[ParamType],
    args: &[Value],
) -> InvokeResult<Value> {
    let result = resolve_and_invoke(target, method_name, receiver, signature, args);
    result.map_err(InvokeError::from)
}

fn resolve_and_invoke(
    target: &TypeDescriptor,
    method_name: &str,
    receiver: Option<&ObjectRef>,
    signature: &[ParamType],
    args: &[Value],
) -> Result<Value, ReflectError> {
    let (declaring, method) = target.get_method(method_name, signature).ok_or_else(|| {
        ReflectError::NoSuchMethod {
            type_name: target.name().to_string(),
            method: method_name.to_string(),
            signature: format_signature(signature),
        }
    })?;
    let qualified = format!("{}.{}", declaring.name(), method.name());
    debug!("resolved {}{}", qualified, format_signature(signature));

    if !declaring.is_public() {
        return Err(ReflectError::IllegalAccess {
            type_name: declaring.name().to_string(),
            method: method.name().to_string(),
        });
    }
    check_receiver(declaring, method, receiver)?;
    check_arguments(&qualified, method, args)?;

    let value = call_guarded(&qualified, method, receiver, args).map_err(|raised| {
        debug!("{} raised {}", qualified, raised);
        ReflectError::InvocationTarget {
            method: qualified.clone(),
            raised,
        }
    })?;

    if *method.returns() == ParamType::Void {
        return Ok(Value::Null);
    }
    Ok(value)
}

fn check_receiver(
    declaring: &TypeDescriptor,
    method: &MethodDescriptor,
    receiver: Option<&ObjectRef>,
) -> Result<(), ReflectError> {
    match (method.is_static(), receiver) {
        (true, None) => Ok(()),
        (true, Some(obj)) => Err(ReflectError::IllegalArgument(format!(
            "receiver of type {} supplied for static method {}.{}",
            obj.class().name(),
            declaring.name(),
            method.name()
        ))),
        (false, None) => Err(ReflectError::NullReceiver {
            type_name: declaring.name().to_string(),
            method: method.name().to_string(),
        }),
        (false, Some(obj)) if !obj.is_instance_of(declaring.name()) => {
            Err(ReflectError::IllegalArgument(format!(
                "receiver of type {} is not an instance of {}",
                obj.class().name(),
                declaring.name()
            )))
        }
        (false, Some(_)) => Ok(()),
    }
}

fn check_arguments(qualified: &str, method: &MethodDescriptor, args: &[Value]) -> Result<(), ReflectError> {
    let params = method.params();
    if params.len() != args.len() {
        return Err(ReflectError::IllegalArgument(format!(
            "{} expects {} argument(s), got {}",
            qualified,
            params.len(),
            args.len()
        )));
    }
    for (index, (param, value)) in params.iter().zip(args).enumerate() {
        if !param.accepts(value) {
            return Err(ReflectError::IllegalArgument(format!(
                "{} argument {}: expected {}, got {}",
                qualified,
                index,
                param,
                value.type_name()
            )));
        }
    }
    Ok(())
}

/// Run the handler, turning a panic into `Raised::Panic`.
fn call_guarded(
    qualified: &str,
    method: &MethodDescriptor,
    receiver: Option<&ObjectRef>,
    args: &[Value],
) -> Result<Value, Raised> {
    match panic::catch_unwind(AssertUnwindSafe(|| method.call(receiver, args))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{} panicked: {}", qualified, message);
            Err(Raised::Panic(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// Capability interface
// ============================================================================

/// Something methods can be reflectively invoked on.
pub trait ReflectiveInvoker {
    /// Invoke a method; see [`invoke_reflection_call`]
    fn invoke(
        &self,
        method_name: &str,
        receiver: Option<&ObjectRef>,
        signature: &[ParamType],
        args: &[Value],
    ) -> InvokeResult<Value>;

    /// Invoke and convert the result to `T`.
    ///
    /// A result of the wrong type is an unexpected failure.
    fn invoke_as<T: FromValue>(
        &self,
        method_name: &str,
        receiver: Option<&ObjectRef>,
        signature: &[ParamType],
        args: &[Value],
    ) -> InvokeResult<T>
    where
        Self: Sized,
    {
        let value = self.invoke(method_name, receiver, signature, args)?;
        T::from_value(value).map_err(|mismatch| {
            InvokeError::from(ReflectError::ResultType {
                method: method_name.to_string(),
                expected: mismatch.expected,
                got: mismatch.got,
            })
        })
    }
}

impl ReflectiveInvoker for TypeDescriptor {
    fn invoke(
        &self,
        method_name: &str,
        receiver: Option<&ObjectRef>,
        signature: &[ParamType],
        args: &[Value],
    ) -> InvokeResult<Value> {
        invoke_reflection_call(self, method_name, receiver, signature, args)
    }
}

impl<I: ReflectiveInvoker + ?Sized> ReflectiveInvoker for Arc<I> {
    fn invoke(
        &self,
        method_name: &str,
        receiver: Option<&ObjectRef>,
        signature: &[ParamType],
        args: &[Value],
    ) -> InvokeResult<Value> {
        (**self).invoke(method_name, receiver, signature, args)
    }
}
