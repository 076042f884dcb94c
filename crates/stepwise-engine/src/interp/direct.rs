//! Direct-style evaluation of an untransformed computation

use super::{Env, Evaluator, Failure, Globals, Scope, Value};
use crate::ast::{AwaitId, Computation, Symbol, SymbolId};
use crate::future_system::{FutureId, Outcome};

/// Evaluate a computation as if every `await` blocked until its future
/// settled. `resolve` supplies the settled outcome of each awaited future;
/// a future it cannot resolve fails the evaluation.
pub fn evaluate_direct(
    computation: &Computation,
    args: Vec<Value>,
    globals: &Globals,
    resolve: &mut dyn FnMut(FutureId) -> Option<Outcome>,
) -> Outcome {
    if args.len() != computation.params.len() {
        return Err(Failure::Type(format!(
            "{} takes {} argument(s) but {} were supplied",
            computation.name,
            computation.params.len(),
            args.len()
        )));
    }
    let mut env = DirectEnv {
        scope: Scope::new(),
        resolve,
    };
    for (param, arg) in computation.params.iter().zip(args) {
        env.define(param.id(), arg);
    }
    Evaluator::new(globals, &mut env).block(&computation.body)
}

struct DirectEnv<'r> {
    scope: Scope,
    resolve: &'r mut dyn FnMut(FutureId) -> Option<Outcome>,
}

impl Env for DirectEnv<'_> {
    fn try_lookup(&self, symbol: &Symbol) -> Option<Value> {
        self.scope.try_lookup(symbol)
    }

    fn define(&mut self, id: SymbolId, value: Value) {
        self.scope.define(id, value);
    }

    fn assign(&mut self, symbol: &Symbol, value: Value) -> Result<(), Failure> {
        self.scope.assign(symbol, value)
    }

    fn await_future(&mut self, id: AwaitId, future: FutureId) -> Outcome {
        (self.resolve)(future).unwrap_or_else(|| {
            Err(Failure::Internal(format!(
                "{} awaits {} which never settles",
                id, future
            )))
        })
    }
}
