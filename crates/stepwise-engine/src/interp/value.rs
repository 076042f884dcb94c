//! Runtime values and failures

use crate::ast::{Lambda, SymbolId};
use crate::future_system::FutureId;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::Invoker;

/// Signature of host-provided functions
pub type NativeFunc = dyn Fn(&mut dyn Invoker, &[Value]) -> Result<Value, Failure> + Send + Sync;

/// A runtime value
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Future(FutureId),
    Closure(Arc<Closure>),
    Native(NativeFn),
}

/// A closure together with the values it captured at creation
#[derive(Debug)]
pub struct Closure {
    pub lambda: Arc<Lambda>,
    pub captured: FxHashMap<SymbolId, Value>,
}

/// A host function
#[derive(Clone)]
pub struct NativeFn {
    pub name: Arc<str>,
    pub func: Arc<NativeFunc>,
}

impl NativeFn {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut dyn Invoker, &[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Name of the value's runtime type, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Future(_) => "future",
            Value::Closure(_) => "closure",
            Value::Native(_) => "native function",
        }
    }

    pub fn as_bool(&self) -> Result<bool, Failure> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Failure::Type(format!("expected bool, found {}", other.kind()))),
        }
    }

    pub fn as_int(&self) -> Result<i64, Failure> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(Failure::Type(format!("expected int, found {}", other.kind()))),
        }
    }

    pub fn as_future(&self) -> Result<FutureId, Failure> {
        match self {
            Value::Future(f) => Ok(*f),
            other => Err(Failure::Type(format!("expected future, found {}", other.kind()))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Future(a), Value::Future(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(&a.func, &b.func),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::Future(id) => write!(f, "<{}>", id),
            Value::Closure(closure) => write!(f, "<closure/{}>", closure.lambda.params.len()),
            Value::Native(native) => write!(f, "<native {}>", native.name),
        }
    }
}

/// Why an evaluation did not produce a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// A value raised by `throw`
    #[error("uncaught exception: {0}")]
    Thrown(Value),

    /// A host function reported an error
    #[error("{function}: {message}")]
    Native { function: String, message: String },

    /// No arm of a `match` accepted the scrutinee
    #[error("no match arm accepts {0:?}")]
    MatchError(Value),

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    /// Evaluation reached a state the pipeline should have ruled out
    #[error("internal error: {0}")]
    Internal(String),
}

impl Failure {
    pub fn native(function: &str, message: impl Into<String>) -> Self {
        Failure::Native {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Check if a `try` handler may observe this failure
    pub fn is_catchable(&self) -> bool {
        !matches!(self, Failure::Internal(_))
    }

    /// The value a `catch` binding receives
    pub fn into_value(self) -> Value {
        match self {
            Failure::Thrown(value) => value,
            other => Value::str(&other.to_string()),
        }
    }
}
