//! Integration tests for normalized reflective invocation
//!
//! Exercises the two-outcome contract against a fixture type whose methods
//! return values, raise denials through a permission gate, raise other
//! exceptions, and panic.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use permtest_reflect::{
    arg, invoke_reflection_call, InvokeError, MethodDescriptor, ObjectRef, ParamType,
    PermissionGate, Raised, ReflectError, ReflectiveInvoker, SecurityException, TypeBuilder,
    TypeDescriptor, TypeRegistry, Value,
};

const CAMERA: &str = "android.permission.CAMERA";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Instance payload for the fixture type
struct Probe {
    gate: Arc<PermissionGate>,
    calls: AtomicUsize,
}

fn probe_type() -> Arc<TypeDescriptor> {
    TypeBuilder::new("com.example.Probe")
        .static_method("getX", &[ParamType::Int], ParamType::Int, |_, args| {
            Ok(Value::Int(arg::<i32>(args, 0)? * 2))
        })
        .static_method(
            "concat",
            &[ParamType::Str, ParamType::Long],
            ParamType::Str,
            |_, args| {
                let prefix: Option<String> = arg(args, 0)?;
                let n: i64 = arg(args, 1)?;
                Ok(Value::Str(format!("{}{}", prefix.unwrap_or_default(), n)))
            },
        )
        .static_method("nothing", &[], ParamType::Str, |_, _| Ok(Value::Null))
        .instance_method("check", &[], ParamType::Bool, |receiver, _| {
            let probe = receiver
                .and_then(|r| r.downcast::<Probe>())
                .ok_or_else(|| Raised::exception("IllegalStateException", "not a probe"))?;
            probe.calls.fetch_add(1, Ordering::SeqCst);
            probe.gate.enforce(CAMERA, "check")?;
            Ok(Value::Bool(true))
        })
        .instance_method("calls", &[], ParamType::Int, |receiver, _| {
            let probe = receiver
                .and_then(|r| r.downcast::<Probe>())
                .ok_or_else(|| Raised::exception("IllegalStateException", "not a probe"))?;
            Ok(Value::Int(probe.calls.load(Ordering::SeqCst) as i32))
        })
        .static_method("fail", &[], ParamType::Void, |_, _| {
            Err(Raised::exception("IllegalStateException", "service not running"))
        })
        .static_method("remote", &[], ParamType::Void, |_, _| {
            Err(Raised::exception("RemoteException", "binder transaction failed")
                .with_cause(SecurityException::new("nested denial").into()))
        })
        .static_method("explode", &[], ParamType::Void, |_, _| {
            panic!("probe exploded");
        })
        .method(
            MethodDescriptor::new("secret", &[], ParamType::Int, |_, _| Ok(Value::Int(7)))
                .as_static()
                .non_public(),
        )
        .build()
}

fn probe(ty: &Arc<TypeDescriptor>, gate: Arc<PermissionGate>) -> ObjectRef {
    ObjectRef::new(
        ty.clone(),
        Probe {
            gate,
            calls: AtomicUsize::new(0),
        },
    )
}

fn unexpected_cause(err: &InvokeError) -> &ReflectError {
    err.unexpected_cause()
        .unwrap_or_else(|| panic!("expected unexpected failure, got {:?}", err))
}

// ============================================================================
// Successful calls
// ============================================================================

mod success {
    use super::*;

    #[test]
    fn test_static_get_x() {
        init_logging();
        let ty = probe_type();
        let result = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Int(21)]);
        assert_eq!(result.unwrap(), Value::Int(42));
    }

    #[test]
    fn test_null_argument_for_reference_param() {
        let ty = probe_type();
        let result = invoke_reflection_call(
            &ty,
            "concat",
            None,
            &[ParamType::Str, ParamType::Long],
            &[Value::Null, Value::Long(5)],
        );
        assert_eq!(result.unwrap(), Value::Str("5".to_string()));
    }

    #[test]
    fn test_null_result_passes_through() {
        let ty = probe_type();
        let result = invoke_reflection_call(&ty, "nothing", None, &[], &[]).unwrap();
        assert!(result.is_null());
    }

    #[test]
    fn test_instance_call_with_granted_permission() {
        let ty = probe_type();
        let gate = Arc::new(PermissionGate::new());
        gate.grant(CAMERA);
        let obj = probe(&ty, gate);

        let granted: bool = ty.invoke_as("check", Some(&obj), &[], &[]).unwrap();
        assert!(granted);
        assert_eq!(obj.downcast::<Probe>().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_idempotent() {
        let ty = probe_type();
        let first = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Int(8)]);
        let second = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Int(8)]);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[test]
    fn test_inherited_method_on_subclass_instance() {
        let base = probe_type();
        let derived = TypeBuilder::new("com.example.LoudProbe")
            .superclass(base.clone())
            .build();
        let gate = Arc::new(PermissionGate::new());
        let obj = probe(&derived, gate);

        let calls = invoke_reflection_call(&derived, "calls", Some(&obj), &[], &[]).unwrap();
        assert_eq!(calls, Value::Int(0));

        // A subclass instance is a valid receiver for the base type too
        let calls = invoke_reflection_call(&base, "calls", Some(&obj), &[], &[]).unwrap();
        assert_eq!(calls, Value::Int(0));
    }
}

// ============================================================================
// Security denial
// ============================================================================

mod denial {
    use super::*;

    #[test]
    fn test_denial_propagates_unchanged() {
        init_logging();
        let ty = probe_type();
        let obj = probe(&ty, Arc::new(PermissionGate::new()));

        let err = invoke_reflection_call(&ty, "check", Some(&obj), &[], &[]).unwrap_err();
        let expected = SecurityException::new(format!("check: requires {}", CAMERA));
        assert_eq!(err.as_security_denial(), Some(&expected));
        assert_eq!(err.to_string(), expected.to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_denial_after_revoke() {
        let ty = probe_type();
        let gate = Arc::new(PermissionGate::new());
        gate.grant(CAMERA);
        let obj = probe(&ty, gate.clone());

        assert!(invoke_reflection_call(&ty, "check", Some(&obj), &[], &[]).is_ok());
        gate.revoke(CAMERA);
        let err = invoke_reflection_call(&ty, "check", Some(&obj), &[], &[]).unwrap_err();
        assert!(err.is_security_denial());
    }

    #[test]
    fn test_nested_denial_is_unexpected() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "remote", None, &[], &[]).unwrap_err();

        assert!(err.is_unexpected());
        let raised = unexpected_cause(&err).target_exception().unwrap();
        assert_eq!(
            raised.find_security_cause().map(|d| d.message()),
            Some("nested denial")
        );
    }
}

// ============================================================================
// Unexpected failures
// ============================================================================

mod unexpected {
    use super::*;

    #[test]
    fn test_unknown_method() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "doesNotExist", None, &[], &[]).unwrap_err();

        assert!(!err.is_security_denial());
        match unexpected_cause(&err) {
            ReflectError::NoSuchMethod {
                type_name,
                method,
                signature,
            } => {
                assert_eq!(type_name, "com.example.Probe");
                assert_eq!(method, "doesNotExist");
                assert_eq!(signature, "()");
            }
            other => panic!("expected NoSuchMethod, got {:?}", other),
        }
    }

    #[test]
    fn test_non_public_method_is_not_found() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "secret", None, &[], &[]).unwrap_err();
        assert!(matches!(unexpected_cause(&err), ReflectError::NoSuchMethod { .. }));
    }

    #[test]
    fn test_non_public_type_is_illegal_access() {
        let hidden = TypeBuilder::new("com.example.Hidden")
            .non_public()
            .static_method("ping", &[], ParamType::Bool, |_, _| Ok(Value::Bool(true)))
            .build();

        let err = invoke_reflection_call(&hidden, "ping", None, &[], &[]).unwrap_err();
        assert!(matches!(
            unexpected_cause(&err),
            ReflectError::IllegalAccess { type_name, .. } if type_name == "com.example.Hidden"
        ));
    }

    #[test]
    fn test_argument_type_mismatch() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Str("21".into())])
            .unwrap_err();
        assert!(matches!(unexpected_cause(&err), ReflectError::IllegalArgument(_)));
    }

    #[test]
    fn test_argument_count_mismatch() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[]).unwrap_err();
        match unexpected_cause(&err) {
            ReflectError::IllegalArgument(msg) => assert!(msg.contains("expects 1 argument(s), got 0")),
            other => panic!("expected IllegalArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_null_for_primitive_param() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Null]).unwrap_err();
        assert!(matches!(unexpected_cause(&err), ReflectError::IllegalArgument(_)));
    }

    #[test]
    fn test_wrong_receiver_type() {
        let ty = probe_type();
        let other = TypeBuilder::new("com.example.Other").build();
        let obj = ObjectRef::new(other, ());

        let err = invoke_reflection_call(&ty, "check", Some(&obj), &[], &[]).unwrap_err();
        assert!(matches!(unexpected_cause(&err), ReflectError::IllegalArgument(_)));
    }

    #[test]
    fn test_missing_receiver() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "check", None, &[], &[]).unwrap_err();
        assert!(matches!(unexpected_cause(&err), ReflectError::NullReceiver { .. }));
    }

    #[test]
    fn test_callee_exception_is_cause() {
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "fail", None, &[], &[]).unwrap_err();

        let cause = unexpected_cause(&err);
        match cause.target_exception() {
            Some(Raised::Exception { kind, message, .. }) => {
                assert_eq!(kind, "IllegalStateException");
                assert_eq!(message, "service not running");
            }
            other => panic!("expected exception, got {:?}", other),
        }

        // Source chain: wrapper -> reflect error -> raised exception
        let reflect = err.source().unwrap();
        assert_eq!(
            reflect.source().unwrap().to_string(),
            "IllegalStateException: service not running"
        );
    }

    #[test]
    fn test_panic_is_unexpected() {
        init_logging();
        let ty = probe_type();
        let err = invoke_reflection_call(&ty, "explode", None, &[], &[]).unwrap_err();

        assert!(matches!(
            unexpected_cause(&err).target_exception(),
            Some(Raised::Panic(msg)) if msg == "probe exploded"
        ));
    }

    #[test]
    fn test_unknown_type_by_name() {
        let mut registry = TypeRegistry::new();
        registry.register(probe_type());

        let ok = registry
            .invoke_by_name("com.example.Probe", "getX", None, &[ParamType::Int], &[Value::Int(1)])
            .unwrap();
        assert_eq!(ok, Value::Int(2));

        let err = registry
            .invoke_by_name("com.example.Gone", "getX", None, &[ParamType::Int], &[Value::Int(1)])
            .unwrap_err();
        assert!(matches!(unexpected_cause(&err), ReflectError::ClassNotFound(_)));
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_invocations_are_independent() {
    let ty = probe_type();
    let gate = Arc::new(PermissionGate::new());
    let obj = probe(&ty, gate.clone());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ty = ty.clone();
            let obj = obj.clone();
            std::thread::spawn(move || {
                let x = invoke_reflection_call(&ty, "getX", None, &[ParamType::Int], &[Value::Int(i)])
                    .unwrap();
                let denied = invoke_reflection_call(&ty, "check", Some(&obj), &[], &[]).unwrap_err();
                (x, denied.is_security_denial())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (x, denied) = handle.join().unwrap();
        assert_eq!(x, Value::Int(i as i32 * 2));
        assert!(denied);
    }
    assert_eq!(obj.downcast::<Probe>().unwrap().calls.load(Ordering::SeqCst), 8);
}
