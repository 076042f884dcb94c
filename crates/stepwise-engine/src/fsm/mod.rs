//! State machines
//!
//! A [`StateMachine`] is the partitioned form of a normalized computation:
//! numbered states, each a run of linear operations closed by exactly one
//! [`Transition`]. [`emit`] turns it into an executable [`Automaton`].

mod automaton;
pub mod builder;
mod emit;
pub mod pretty;
mod verify;
pub mod walk;

pub use automaton::Automaton;
pub use builder::build;
pub use emit::emit;
pub use pretty::PrettyPrint;

use crate::anf::{AwaitPoint, Op, Selector};
use crate::ast::{AwaitId, Binding, Expr, SymbolId, Type};
use crate::liveness::{Liveness, Storage};
use rustc_hash::FxHashMap;
use std::fmt;

/// State identifier (index into the state table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    /// The entry state
    pub const ENTRY: StateId = StateId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a promoted binding's storage slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

/// How a state ends
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Continue with another state immediately
    Goto(StateId),
    /// Evaluate the future, register the completion callback and yield
    Suspend { point: AwaitPoint, resume: StateId },
    /// Evaluate the selector and continue with the chosen arm's state
    Branch {
        selector: Selector,
        targets: Vec<StateId>,
    },
    /// Complete the result promise with the value
    Complete(Expr),
}

impl Transition {
    /// States this transition may continue with
    pub fn successors(&self) -> Vec<StateId> {
        match self {
            Transition::Goto(next) => vec![*next],
            Transition::Suspend { resume, .. } => vec![*resume],
            Transition::Branch { targets, .. } => targets.clone(),
            Transition::Complete(_) => vec![],
        }
    }
}

/// A state: linear operations followed by its exit
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: StateId,
    pub ops: Vec<Op>,
    pub exit: Transition,
}

/// The partitioned computation
#[derive(Debug, Clone)]
pub struct StateMachine {
    pub name: String,
    pub params: Vec<Binding>,
    pub states: Vec<State>,
    /// Type of the value the result promise settles with
    pub result_ty: Type,
    pub liveness: Liveness,
    /// State entered when each suspension point resumes
    pub await_sites: FxHashMap<AwaitId, StateId>,
}

impl StateMachine {
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Bindings stored in automaton slots, in slot order
    pub fn slots(&self) -> &[Binding] {
        self.liveness.promoted()
    }

    pub fn storage_of(&self, id: SymbolId) -> Storage {
        self.liveness.storage(id)
    }

    /// The state a suspension point resumes in
    pub fn resume_state_of(&self, id: AwaitId) -> Option<StateId> {
        self.await_sites.get(&id).copied()
    }
}
