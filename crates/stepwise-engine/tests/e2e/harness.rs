//! Shared fixture for end-to-end tests

use std::sync::Arc;
use stepwise_engine::{
    evaluate_direct, Automaton, Computation, Failure, FutureId, FutureSystem, Globals, LowerOptions,
    Lowering, Outcome, PromiseId, Value,
};
use stepwise_runtime::QueueRuntime;

/// Route `tracing` output through the test writer
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A queue runtime plus the globals computations see
pub struct Fixture {
    pub runtime: Arc<QueueRuntime>,
    pub globals: Globals,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let runtime = Arc::new(QueueRuntime::new());
        let mut globals = Globals::new();

        // fetch(n) settles with n * 10
        let rt = runtime.clone();
        globals.native("fetch", move |_, args| {
            let n = args[0].as_int()?;
            Ok(Value::Future(rt.resolved(Value::Int(n.wrapping_mul(10)))))
        });

        // reject(msg) fails with a native failure
        let rt = runtime.clone();
        globals.native("reject", move |_, args| {
            Ok(Value::Future(
                rt.failed(Failure::native("reject", args[0].to_string())),
            ))
        });

        Self { runtime, globals }
    }

    /// Bind `name` to a future that already settled
    pub fn settled(&mut self, name: &str, outcome: Outcome) -> FutureId {
        let future = match outcome {
            Ok(value) => self.runtime.resolved(value),
            Err(failure) => self.runtime.failed(failure),
        };
        self.globals.define(name, Value::Future(future));
        future
    }

    /// Bind `name` to a future the test settles later
    pub fn pending(&mut self, name: &str) -> (PromiseId, FutureId) {
        let promise = self.runtime.pending();
        let future = self.runtime.promise_to_future(promise);
        self.globals.define(name, Value::Future(future));
        (promise, future)
    }

    pub fn lower(&self, computation: &Computation) -> Automaton {
        self.lower_with(computation, LowerOptions::default())
    }

    pub fn lower_with(&self, computation: &Computation, options: LowerOptions) -> Automaton {
        Lowering::with_options(
            self.runtime.clone(),
            Arc::new(self.globals.clone()),
            options,
        )
        .lower(computation)
        .unwrap_or_else(|err| panic!("lowering {} failed: {}", computation.name, err))
    }

    /// Invoke an automaton and drain the runtime
    pub fn run(&self, automaton: &Automaton, args: Vec<Value>) -> Outcome {
        let future = automaton
            .invoke(args)
            .unwrap_or_else(|failure| panic!("invoking {} failed: {}", automaton.name(), failure));
        self.runtime.run_until_idle();
        self.runtime
            .outcome(future)
            .unwrap_or_else(|| panic!("{} never completed", automaton.name()))
    }

    /// Evaluate the untransformed computation
    pub fn direct(&self, computation: &Computation, args: Vec<Value>) -> Outcome {
        let runtime = self.runtime.clone();
        evaluate_direct(computation, args, &self.globals, &mut |future| {
            runtime.outcome(future)
        })
    }

    /// Lower, run and check the outcome against direct evaluation
    pub fn expect_same(&self, computation: &Computation, args: Vec<Value>) -> Outcome {
        let automaton = self.lower(computation);
        let lowered = self.run(&automaton, args.clone());
        let direct = self.direct(computation, args);
        assert_eq!(lowered, direct, "{} diverged from direct evaluation", computation.name);
        lowered
    }
}

pub fn expect_value(fixture: &Fixture, computation: &Computation, args: Vec<Value>, expected: Value) {
    assert_eq!(fixture.expect_same(computation, args), Ok(expected));
}
