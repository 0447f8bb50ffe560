//! Error types for reflective invocation
//!
//! Three layers:
//!
//! - [`Raised`]: what an invoked method itself raises
//! - [`ReflectError`]: any failure of resolution or invocation
//! - [`InvokeError`]: the only two kinds a caller ever sees, a security
//!   denial or an unexpected test failure wrapping a `ReflectError`

use std::fmt;

/// Result type for normalized invocations
pub type InvokeResult<T> = Result<T, InvokeError>;

// ============================================================================
// Raised by callees
// ============================================================================

/// Security-authorization failure raised by an invoked method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SecurityException: {message}")]
pub struct SecurityException {
    message: String,
}

impl SecurityException {
    /// Create a denial with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Denial message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A failure raised from inside an invoked method.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Raised {
    /// The callee refused on an authorization check
    #[error(transparent)]
    Security(#[from] SecurityException),

    /// Any other exception, optionally chained to the one that caused it
    #[error("{kind}: {message}")]
    Exception {
        /// Exception kind (e.g. "IllegalStateException")
        kind: String,
        /// Exception message
        message: String,
        /// Underlying cause
        #[source]
        cause: Option<Box<Raised>>,
    },

    /// The callee panicked
    #[error("method panicked: {0}")]
    Panic(String),
}

impl Raised {
    /// Create an exception without a cause
    pub fn exception(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Raised::Exception {
            kind: kind.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach a cause. Has no effect on denials or panics.
    pub fn with_cause(self, cause: Raised) -> Self {
        match self {
            Raised::Exception { kind, message, .. } => Raised::Exception {
                kind,
                message,
                cause: Some(Box::new(cause)),
            },
            other => other,
        }
    }

    /// Check if this is itself a security denial
    pub fn is_security(&self) -> bool {
        matches!(self, Raised::Security(_))
    }

    /// Walk the cause chain for a security denial at any depth.
    ///
    /// The invoker only classifies a denial at the top of the chain; this is
    /// exposed so harnesses can tell when a denial was buried deeper.
    pub fn find_security_cause(&self) -> Option<&SecurityException> {
        let mut current = self;
        loop {
            match current {
                Raised::Security(denial) => return Some(denial),
                Raised::Exception {
                    cause: Some(cause), ..
                } => current = &**cause,
                _ => return None,
            }
        }
    }
}

// ============================================================================
// Resolution / invocation failures
// ============================================================================

/// Failure while resolving or invoking a method.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    /// No type registered under the name
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// No public method with the exact name and signature
    #[error("no such method: {type_name}.{method}{signature}")]
    NoSuchMethod {
        /// Target type name
        type_name: String,
        /// Requested method name
        method: String,
        /// Requested signature, formatted as "(int, string)"
        signature: String,
    },

    /// Method is public but its declaring type is not
    #[error("illegal access: {type_name}.{method} is declared on a non-public type")]
    IllegalAccess {
        /// Declaring type name
        type_name: String,
        /// Method name
        method: String,
    },

    /// Wrong arity, unassignable argument, or mismatched receiver
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// Instance method invoked without a receiver
    #[error("null receiver for instance method {type_name}.{method}")]
    NullReceiver {
        /// Declaring type name
        type_name: String,
        /// Method name
        method: String,
    },

    /// The invoked method raised
    #[error("{method} raised {raised}")]
    InvocationTarget {
        /// Qualified method name
        method: String,
        /// What the method raised
        #[source]
        raised: Raised,
    },

    /// Result could not be converted to the requested Rust type
    #[error("cannot convert result of {method}: expected {expected}, got {got}")]
    ResultType {
        /// Method name
        method: String,
        /// Requested type
        expected: String,
        /// Actual runtime type
        got: String,
    },
}

impl ReflectError {
    /// What the invoked method raised, if the failure came from inside it
    pub fn target_exception(&self) -> Option<&Raised> {
        match self {
            ReflectError::InvocationTarget { raised, .. } => Some(raised),
            _ => None,
        }
    }
}

// ============================================================================
// Outward-facing failures
// ============================================================================

/// Any failure other than a security denial, with the original as its source.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unexpected permission test failure: {cause}")]
pub struct UnexpectedTestFailure {
    #[source]
    cause: ReflectError,
}

impl UnexpectedTestFailure {
    /// Wrap a failure
    pub fn new(cause: ReflectError) -> Self {
        Self { cause }
    }

    /// The wrapped failure
    pub fn cause(&self) -> &ReflectError {
        &self.cause
    }

    /// Unwrap into the original failure
    pub fn into_cause(self) -> ReflectError {
        self.cause
    }
}

/// The two outcomes a failed invocation can have.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokeError {
    /// The callee denied the operation; passed through unchanged
    #[error(transparent)]
    SecurityDenial(SecurityException),

    /// Anything else
    #[error(transparent)]
    UnexpectedFailure(#[from] UnexpectedTestFailure),
}

impl InvokeError {
    /// Check if this is a security denial
    pub fn is_security_denial(&self) -> bool {
        matches!(self, InvokeError::SecurityDenial(_))
    }

    /// Check if this is an unexpected test failure
    pub fn is_unexpected(&self) -> bool {
        matches!(self, InvokeError::UnexpectedFailure(_))
    }

    /// The denial, if this is one
    pub fn as_security_denial(&self) -> Option<&SecurityException> {
        match self {
            InvokeError::SecurityDenial(denial) => Some(denial),
            InvokeError::UnexpectedFailure(_) => None,
        }
    }

    /// The wrapped cause, if this is an unexpected failure
    pub fn unexpected_cause(&self) -> Option<&ReflectError> {
        match self {
            InvokeError::SecurityDenial(_) => None,
            InvokeError::UnexpectedFailure(failure) => Some(failure.cause()),
        }
    }
}

/// Translate a raw failure: a denial raised directly by the callee passes
/// through, everything else is wrapped. Only the immediate cause is checked.
impl From<ReflectError> for InvokeError {
    fn from(err: ReflectError) -> Self {
        match err {
            ReflectError::InvocationTarget {
                raised: Raised::Security(denial),
                ..
            } => InvokeError::SecurityDenial(denial),
            other => InvokeError::UnexpectedFailure(UnexpectedTestFailure::new(other)),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Failure loading permission gate configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Config is not valid TOML or has the wrong shape
    #[error("invalid permission config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Format a parameter signature as "(int, string)".
pub(crate) fn format_signature<T: fmt::Display>(params: &[T]) -> String {
    let parts: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    format!("({})", parts.join(", "))
}
