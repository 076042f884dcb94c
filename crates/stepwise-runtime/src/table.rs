//! Promise table

use rustc_hash::FxHashMap;
use stepwise_engine::{Callback, ContextId, Outcome, Type};

/// State of one promise
pub(crate) struct Cell {
    pub ty: Type,
    pub outcome: Option<Outcome>,
    /// Callbacks waiting for the outcome, with the context they run on
    pub waiters: Vec<(ContextId, Callback)>,
    /// Number of callbacks ever registered
    pub registrations: usize,
}

impl Cell {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            outcome: None,
            waiters: Vec::new(),
            registrations: 0,
        }
    }
}

/// All promises of a runtime, keyed by id
#[derive(Default)]
pub(crate) struct PromiseTable {
    cells: FxHashMap<u64, Cell>,
}

impl PromiseTable {
    pub fn insert(&mut self, id: u64, cell: Cell) {
        self.cells.insert(id, cell);
    }

    pub fn get(&self, id: u64) -> Option<&Cell> {
        self.cells.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}
