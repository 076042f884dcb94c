//! Tree-walking evaluation
//!
//! States execute their await-free operations with the [`Evaluator`]; the
//! same evaluator also runs the untransformed tree in [`evaluate_direct`],
//! which is the reference every automaton is checked against.

mod direct;
mod eval;
mod value;

pub use direct::evaluate_direct;
pub use eval::Evaluator;
pub use value::{Closure, Failure, NativeFn, NativeFunc, Value};

use crate::ast::{AwaitId, Symbol, SymbolId};
use crate::future_system::{FutureId, Outcome};
use rustc_hash::FxHashMap;

/// Storage of local bindings during evaluation
pub trait Env {
    /// Read a binding that must have a value
    fn lookup(&self, symbol: &Symbol) -> Result<Value, Failure> {
        self.try_lookup(symbol)
            .ok_or_else(|| Failure::Internal(format!("{} read before definition", symbol.name)))
    }

    /// Read a binding if it has a value
    fn try_lookup(&self, symbol: &Symbol) -> Option<Value>;

    fn define(&mut self, id: SymbolId, value: Value);

    /// Overwrite an existing binding
    fn assign(&mut self, symbol: &Symbol, value: Value) -> Result<(), Failure>;

    /// Produce the settled value of a future met during evaluation
    fn await_future(&mut self, id: AwaitId, future: FutureId) -> Outcome;
}

/// Handle given to host functions so they can call back into closures
pub trait Invoker {
    fn invoke(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Failure>;
}

/// Host-provided globals, usually native functions
#[derive(Debug, Clone, Default)]
pub struct Globals {
    values: FxHashMap<String, Value>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Register a native function
    pub fn native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut dyn Invoker, &[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        self.define(name, Value::Native(NativeFn::new(name, func)));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Bindings held in a plain map
#[derive(Debug, Default)]
pub struct Scope {
    vars: FxHashMap<SymbolId, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(vars: FxHashMap<SymbolId, Value>) -> Self {
        Self { vars }
    }
}

impl Env for Scope {
    fn try_lookup(&self, symbol: &Symbol) -> Option<Value> {
        self.vars.get(&symbol.id).cloned()
    }

    fn define(&mut self, id: SymbolId, value: Value) {
        self.vars.insert(id, value);
    }

    fn assign(&mut self, symbol: &Symbol, value: Value) -> Result<(), Failure> {
        match self.vars.get_mut(&symbol.id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Failure::Internal(format!(
                "assignment to undefined {}",
                symbol.name
            ))),
        }
    }

    fn await_future(&mut self, id: AwaitId, _future: FutureId) -> Outcome {
        Err(Failure::Internal(format!("{} evaluated outside statement position", id)))
    }
}
