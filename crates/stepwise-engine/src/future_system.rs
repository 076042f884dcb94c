//! Future-system abstraction
//!
//! Automata never talk to a concrete runtime. Everything they need from one
//! (promises, completion callbacks, execution contexts, scheduling) goes
//! through the [`FutureSystem`] capability trait, supplied once to the
//! emitter as a trait object.

use crate::ast::Type;
use crate::interp::{Failure, Value};
use std::fmt;
use thiserror::Error;

/// Handle of a writable promise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub u64);

impl PromiseId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise{}", self.0)
    }
}

/// Handle of a read-only future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FutureId(pub u64);

impl FutureId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "future{}", self.0)
    }
}

/// Handle of an execution context (where callbacks and thunks run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextId(pub u32);

impl ContextId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// How a future settled
pub type Outcome = Result<Value, Failure>;

/// Invoked once with the settled outcome of a future
pub type Callback = Box<dyn FnOnce(Outcome) + Send>;

/// Deferred unit of work
pub type Thunk = Box<dyn FnOnce() + Send>;

/// Errors reported when completing a promise
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("{0} was already completed")]
    AlreadyCompleted(PromiseId),

    #[error("{0} does not exist")]
    UnknownPromise(PromiseId),
}

/// Capabilities an automaton needs from an asynchronous runtime
pub trait FutureSystem: Send + Sync {
    /// Create a fresh, uncompleted promise for values of `ty`
    fn create_promise(&self, ty: &Type) -> PromiseId;

    /// Complete a promise; succeeds exactly once per promise
    fn complete(&self, promise: PromiseId, outcome: Outcome) -> Result<(), CompletionError>;

    /// Register a callback invoked once with the settled outcome, on `context`
    fn on_complete(&self, future: FutureId, context: ContextId, callback: Callback);

    /// Context used to schedule automaton work
    fn execution_context(&self) -> ContextId;

    /// Read-only view of a promise
    fn promise_to_future(&self, promise: PromiseId) -> FutureId;

    /// Schedule a thunk on a context
    fn submit(&self, context: ContextId, thunk: Thunk);
}
