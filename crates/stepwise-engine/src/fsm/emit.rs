//! Automaton emission
//!
//! Binds a state machine to a future system and the host globals. The only
//! preparation left at this point is deciding where each parameter is
//! stored when an instance starts.

use super::automaton::Automaton;
use super::{SlotId, StateMachine};
use crate::ast::SymbolId;
use crate::future_system::FutureSystem;
use crate::interp::Globals;
use std::sync::Arc;
use tracing::debug;

/// Where an incoming argument is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Place {
    /// Locals of the entry state
    Local(SymbolId),
    Slot(SlotId),
}

/// A state machine ready for execution
#[derive(Debug)]
pub(crate) struct Program {
    pub machine: StateMachine,
    pub params: Vec<Place>,
}

/// Assemble an executable automaton
pub fn emit(
    machine: StateMachine,
    system: Arc<dyn FutureSystem>,
    globals: Arc<Globals>,
) -> Automaton {
    let params = machine
        .params
        .iter()
        .map(|param| match machine.liveness.slot(param.id()) {
            Some(slot) => Place::Slot(slot),
            None => Place::Local(param.id()),
        })
        .collect();
    debug!(
        automaton = %machine.name,
        states = machine.state_count(),
        slots = machine.slots().len(),
        "emitted automaton"
    );
    Automaton::new(Arc::new(Program { machine, params }), system, globals)
}
