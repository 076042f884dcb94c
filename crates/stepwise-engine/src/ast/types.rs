//! Types carried by computation tree nodes
//!
//! The pipeline never infers types from scratch. Every node arrives with a
//! type assigned by the host, and the passes only need to copy types onto
//! the temporaries they introduce.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of an expression or binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// The unit type (no meaningful value)
    Unit,
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// String
    Str,
    /// Type of expressions that never produce a value (`throw`)
    Never,
    /// Dynamically typed value (used for host natives without a signature)
    Any,
    /// A future settling with a value of the inner type
    Future(Box<Type>),
    /// A function value
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    /// Create a future type
    pub fn future(inner: Type) -> Self {
        Type::Future(Box::new(inner))
    }

    /// Create a function type
    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Type produced by awaiting a value of this type
    pub fn awaited(&self) -> Option<&Type> {
        match self {
            Type::Future(inner) => Some(inner),
            _ => None,
        }
    }

    /// Return type when this is a function type
    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }

    /// Check if values of this type carry no information
    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Unit)
    }

    /// Check if this is the bottom type
    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }

    /// Join the types of two branches: `Never` yields to the other arm
    pub fn join(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Never, t) | (t, Type::Never) => t.clone(),
            (a, b) if a == b => a.clone(),
            _ => Type::Any,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unit => write!(f, "Unit"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Str => write!(f, "Str"),
            Type::Never => write!(f, "Never"),
            Type::Any => write!(f, "Any"),
            Type::Future(inner) => write!(f, "Future<{}>", inner),
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", ret)
            }
        }
    }
}
