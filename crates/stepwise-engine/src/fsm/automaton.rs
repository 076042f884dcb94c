//! Executable automata
//!
//! Each invocation creates an instance holding the state field and the
//! storage slots behind a mutex. `resume` runs states until one suspends or
//! the computation terminates; the lock is released before anything is
//! handed to the future system, so runtimes may deliver callbacks inline.

use super::emit::{Place, Program};
use super::{SlotId, State, StateId, StateMachine, Transition};
use crate::anf::{Op, Selector};
use crate::ast::{AwaitId, Symbol, SymbolId};
use crate::future_system::{ContextId, FutureId, FutureSystem, Outcome, PromiseId};
use crate::interp::{Env, Evaluator, Failure, Globals, Value};
use crate::liveness::Liveness;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// An emitted automaton; cheap to clone
#[derive(Clone)]
pub struct Automaton {
    program: Arc<Program>,
    system: Arc<dyn FutureSystem>,
    globals: Arc<Globals>,
}

impl Automaton {
    pub(crate) fn new(
        program: Arc<Program>,
        system: Arc<dyn FutureSystem>,
        globals: Arc<Globals>,
    ) -> Self {
        Self {
            program,
            system,
            globals,
        }
    }

    pub fn name(&self) -> &str {
        &self.program.machine.name
    }

    /// The state machine this automaton executes
    pub fn machine(&self) -> &StateMachine {
        &self.program.machine
    }

    pub fn state_count(&self) -> usize {
        self.program.machine.state_count()
    }

    /// The state a suspension point resumes in
    pub fn resume_state_of(&self, id: AwaitId) -> Option<StateId> {
        self.program.machine.resume_state_of(id)
    }

    /// Start a new instance and return the future of its result
    pub fn invoke(&self, args: Vec<Value>) -> Result<FutureId, Failure> {
        let machine = &self.program.machine;
        if args.len() != self.program.params.len() {
            return Err(Failure::Type(format!(
                "{} takes {} argument(s) but {} were supplied",
                machine.name,
                self.program.params.len(),
                args.len()
            )));
        }

        let promise = self.system.create_promise(&machine.result_ty);
        let context = self.system.execution_context();

        let mut frame = Frame {
            state: Some(StateId::ENTRY),
            slots: vec![None; machine.slots().len()],
            entry_locals: FxHashMap::default(),
        };
        for (place, arg) in self.program.params.iter().zip(args) {
            match place {
                Place::Local(id) => {
                    frame.entry_locals.insert(*id, arg);
                }
                Place::Slot(slot) => frame.slots[slot.index()] = Some(arg),
            }
        }

        let instance = Arc::new(Instance {
            program: self.program.clone(),
            system: self.system.clone(),
            globals: self.globals.clone(),
            promise,
            context,
            frame: Mutex::new(frame),
        });
        debug!(automaton = %machine.name, %promise, %context, "invoked");
        self.system
            .submit(context, Box::new(move || instance.resume()));
        Ok(self.system.promise_to_future(promise))
    }
}

impl std::fmt::Debug for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Automaton")
            .field("name", &self.name())
            .field("states", &self.state_count())
            .finish()
    }
}

/// Mutable part of an instance
struct Frame {
    /// `None` once the instance has terminated
    state: Option<StateId>,
    slots: Vec<Option<Value>>,
    /// Non-promoted parameters, consumed by the entry state
    entry_locals: FxHashMap<SymbolId, Value>,
}

/// One running invocation
struct Instance {
    program: Arc<Program>,
    system: Arc<dyn FutureSystem>,
    globals: Arc<Globals>,
    promise: PromiseId,
    context: ContextId,
    frame: Mutex<Frame>,
}

/// What `resume` does after running one state
enum Step {
    Continue,
    Suspend { future: FutureId, slot: SlotId },
    Finished(Outcome),
}

/// How a state ended
enum Next {
    Goto(StateId),
    Suspend {
        id: AwaitId,
        future: FutureId,
        slot: SlotId,
        resume: StateId,
    },
    Complete(Value),
}

impl Instance {
    fn name(&self) -> &str {
        &self.program.machine.name
    }

    /// Run states until the instance suspends or terminates
    fn resume(self: Arc<Self>) {
        loop {
            let step = {
                let mut frame = self.frame.lock();
                let Some(state) = frame.state else {
                    error!(automaton = %self.name(), "resumed after termination");
                    panic!("automaton {} resumed after termination", self.name());
                };
                self.step(&mut frame, state)
            };
            match step {
                Step::Continue => {}
                Step::Suspend { future, slot } => {
                    let instance = self.clone();
                    self.system.on_complete(
                        future,
                        self.context,
                        Box::new(move |outcome| instance.on_settled(slot, outcome)),
                    );
                    return;
                }
                Step::Finished(outcome) => {
                    self.finish(outcome);
                    return;
                }
            }
        }
    }

    /// Completion callback of a suspension point
    fn on_settled(self: Arc<Self>, slot: SlotId, outcome: Outcome) {
        {
            let mut frame = self.frame.lock();
            if frame.state.is_none() {
                error!(automaton = %self.name(), "callback delivered after termination");
                panic!("automaton {} received a callback after termination", self.name());
            }
            match outcome {
                Ok(value) => frame.slots[slot.index()] = Some(value),
                Err(failure) => {
                    frame.state = None;
                    drop(frame);
                    debug!(automaton = %self.name(), %failure, "awaited future failed");
                    self.finish(Err(failure));
                    return;
                }
            }
        }
        self.resume();
    }

    fn finish(&self, outcome: Outcome) {
        trace!(automaton = %self.name(), ok = outcome.is_ok(), "completing result");
        if let Err(err) = self.system.complete(self.promise, outcome) {
            error!(automaton = %self.name(), %err, "result promise rejected completion");
        }
    }

    /// Execute one state under the lock
    fn step(&self, frame: &mut Frame, id: StateId) -> Step {
        let machine = &self.program.machine;
        trace!(automaton = %machine.name, state = %id, "running state");

        let next = match machine.state(id) {
            Some(state) => {
                let locals = if id == StateId::ENTRY {
                    std::mem::take(&mut frame.entry_locals)
                } else {
                    FxHashMap::default()
                };
                let mut env = StateEnv {
                    locals,
                    slots: &mut frame.slots,
                    liveness: &machine.liveness,
                };
                let mut eval = Evaluator::new(&self.globals, &mut env);
                run_state(&mut eval, state, &machine.liveness)
            }
            None => Err(Failure::Internal(format!("state {} does not exist", id))),
        };

        match next {
            Ok(Next::Goto(next)) => {
                trace!(automaton = %machine.name, from = %id, to = %next, "goto");
                frame.state = Some(next);
                Step::Continue
            }
            Ok(Next::Suspend {
                id: await_id,
                future,
                slot,
                resume,
            }) => {
                trace!(automaton = %machine.name, state = %id, %await_id, %future, "suspend");
                frame.state = Some(resume);
                Step::Suspend { future, slot }
            }
            Ok(Next::Complete(value)) => {
                frame.state = None;
                Step::Finished(Ok(value))
            }
            Err(failure) => {
                debug!(automaton = %machine.name, state = %id, %failure, "state failed");
                frame.state = None;
                Step::Finished(Err(failure))
            }
        }
    }
}

fn run_state(eval: &mut Evaluator<'_>, state: &State, liveness: &Liveness) -> Result<Next, Failure> {
    for op in &state.ops {
        match op {
            Op::Let {
                binding,
                init: Some(init),
            } => {
                let value = eval.eval(init)?;
                eval.define(binding, value);
            }
            // Branch result holders receive their value in the arms
            Op::Let { init: None, .. } => {}
            Op::Assign { target, value } => {
                let value = eval.eval(value)?;
                eval.assign(target, value)?;
            }
            Op::Eval(expr) => {
                eval.eval(expr)?;
            }
        }
    }

    match &state.exit {
        Transition::Goto(next) => Ok(Next::Goto(*next)),
        Transition::Suspend { point, resume } => {
            let future = eval.eval(&point.future)?.as_future()?;
            let slot = liveness.slot(point.binding.id()).ok_or_else(|| {
                Failure::Internal(format!("result of {} has no storage slot", point.id))
            })?;
            Ok(Next::Suspend {
                id: point.id,
                future,
                slot,
                resume: *resume,
            })
        }
        Transition::Branch { selector, targets } => {
            let arm = select(eval, selector)?;
            targets
                .get(arm)
                .copied()
                .map(Next::Goto)
                .ok_or_else(|| Failure::Internal(format!("branch has no arm {}", arm)))
        }
        Transition::Complete(result) => Ok(Next::Complete(eval.eval(result)?)),
    }
}

/// Index of the arm a selector chooses
fn select(eval: &mut Evaluator<'_>, selector: &Selector) -> Result<usize, Failure> {
    match selector {
        Selector::If { cond } => Ok(if eval.eval(cond)?.as_bool()? { 0 } else { 1 }),
        Selector::Match { scrutinee, cases } => {
            let value = eval.eval(scrutinee)?;
            for (index, case) in cases.iter().enumerate() {
                if !eval.bind_pattern(&case.pattern, &value) {
                    continue;
                }
                if let Some(guard) = &case.guard {
                    if !eval.eval(guard)?.as_bool()? {
                        continue;
                    }
                }
                return Ok(index);
            }
            Err(Failure::MatchError(value))
        }
    }
}

/// Bindings visible while a state runs: its own locals plus the slots
struct StateEnv<'f> {
    locals: FxHashMap<SymbolId, Value>,
    slots: &'f mut [Option<Value>],
    liveness: &'f Liveness,
}

impl Env for StateEnv<'_> {
    fn try_lookup(&self, symbol: &Symbol) -> Option<Value> {
        match self.liveness.slot(symbol.id) {
            Some(slot) => self.slots.get(slot.index()).cloned().flatten(),
            None => self.locals.get(&symbol.id).cloned(),
        }
    }

    fn define(&mut self, id: SymbolId, value: Value) {
        match self.liveness.slot(id) {
            Some(slot) => {
                if let Some(cell) = self.slots.get_mut(slot.index()) {
                    *cell = Some(value);
                }
            }
            None => {
                self.locals.insert(id, value);
            }
        }
    }

    fn assign(&mut self, symbol: &Symbol, value: Value) -> Result<(), Failure> {
        if self.liveness.is_promoted(symbol.id) {
            self.define(symbol.id, value);
            return Ok(());
        }
        match self.locals.get_mut(&symbol.id) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Failure::Internal(format!(
                "assignment to {} outside its state",
                symbol.name
            ))),
        }
    }

    fn await_future(&mut self, id: AwaitId, _future: FutureId) -> Outcome {
        Err(Failure::Internal(format!("{} was not lowered to a suspension", id)))
    }
}
