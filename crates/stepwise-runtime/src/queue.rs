//! Deterministic queue runtime

use crate::table::{Cell, PromiseTable};
use crossbeam_deque::{Injector, Steal};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use stepwise_engine::{
    Callback, CompletionError, ContextId, Failure, FutureId, FutureSystem, Outcome, PromiseId,
    Thunk, Type, Value,
};
use tracing::{trace, warn};

/// Single-threaded future system driven explicitly by the host
///
/// Every callback and submitted thunk is queued on its execution context
/// and only runs from [`QueueRuntime::run_one`] / [`QueueRuntime::run_until_idle`],
/// which makes interleavings reproducible in tests. Futures share the id of
/// the promise they view.
pub struct QueueRuntime {
    table: Mutex<PromiseTable>,
    /// One FIFO queue per execution context
    queues: Vec<Injector<Thunk>>,
    next_id: AtomicU64,
    context: ContextId,
}

impl QueueRuntime {
    /// Create a runtime with a single execution context
    pub fn new() -> Self {
        Self::with_contexts(1)
    }

    /// Create a runtime with `count` execution contexts (at least one)
    pub fn with_contexts(count: usize) -> Self {
        Self {
            table: Mutex::new(PromiseTable::default()),
            queues: (0..count.max(1)).map(|_| Injector::new()).collect(),
            next_id: AtomicU64::new(0),
            context: ContextId::default(),
        }
    }

    /// Use another context for automaton work
    pub fn on_context(mut self, context: ContextId) -> Self {
        self.context = context;
        self
    }

    /// Create an uncompleted promise of unspecified type
    pub fn pending(&self) -> PromiseId {
        self.create_promise(&Type::Any)
    }

    /// Create a future that already settled with `value`
    pub fn resolved(&self, value: Value) -> FutureId {
        self.settled(Ok(value))
    }

    /// Create a future that already failed with `failure`
    pub fn failed(&self, failure: Failure) -> FutureId {
        self.settled(Err(failure))
    }

    fn settled(&self, outcome: Outcome) -> FutureId {
        let promise = self.pending();
        let mut table = self.table.lock();
        if let Some(cell) = table.get_mut(promise.as_u64()) {
            cell.outcome = Some(outcome);
        }
        self.promise_to_future(promise)
    }

    /// Complete a pending promise from the host side
    pub fn settle(&self, promise: PromiseId, outcome: Outcome) -> Result<(), CompletionError> {
        self.complete(promise, outcome)
    }

    /// The outcome of a future, if it has settled
    pub fn outcome(&self, future: FutureId) -> Option<Outcome> {
        self.table
            .lock()
            .get(future.as_u64())
            .and_then(|cell| cell.outcome.clone())
    }

    /// Declared type of a future's values
    pub fn type_of(&self, future: FutureId) -> Option<Type> {
        self.table.lock().get(future.as_u64()).map(|cell| cell.ty.clone())
    }

    /// How many completion callbacks were ever registered on a future
    pub fn awaited_count(&self, future: FutureId) -> usize {
        self.table
            .lock()
            .get(future.as_u64())
            .map_or(0, |cell| cell.registrations)
    }

    /// Number of promises created so far
    pub fn promise_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Run one queued thunk, visiting contexts in order; returns whether
    /// anything ran
    pub fn run_one(&self) -> bool {
        for queue in &self.queues {
            loop {
                match queue.steal() {
                    Steal::Success(thunk) => {
                        thunk();
                        return true;
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }
        false
    }

    /// Run queued thunks until every queue is empty; returns how many ran
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        trace!(ran, "runtime idle");
        ran
    }

    fn queue(&self, context: ContextId) -> &Injector<Thunk> {
        match self.queues.get(context.as_u32() as usize) {
            Some(queue) => queue,
            None => {
                warn!(%context, "unknown execution context, using the first one");
                &self.queues[0]
            }
        }
    }
}

impl Default for QueueRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FutureSystem for QueueRuntime {
    fn create_promise(&self, ty: &Type) -> PromiseId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.table.lock().insert(id, Cell::new(ty.clone()));
        PromiseId::new(id)
    }

    fn complete(&self, promise: PromiseId, outcome: Outcome) -> Result<(), CompletionError> {
        let waiters = {
            let mut table = self.table.lock();
            let cell = table
                .get_mut(promise.as_u64())
                .ok_or(CompletionError::UnknownPromise(promise))?;
            if cell.outcome.is_some() {
                return Err(CompletionError::AlreadyCompleted(promise));
            }
            cell.outcome = Some(outcome.clone());
            std::mem::take(&mut cell.waiters)
        };
        trace!(%promise, waiters = waiters.len(), "completed");
        for (context, callback) in waiters {
            let outcome = outcome.clone();
            self.submit(context, Box::new(move || callback(outcome)));
        }
        Ok(())
    }

    fn on_complete(&self, future: FutureId, context: ContextId, callback: Callback) {
        let settled = {
            let mut table = self.table.lock();
            match table.get_mut(future.as_u64()) {
                Some(cell) => {
                    cell.registrations += 1;
                    match &cell.outcome {
                        Some(outcome) => Some(outcome.clone()),
                        None => {
                            cell.waiters.push((context, callback));
                            return;
                        }
                    }
                }
                None => None,
            }
        };
        let outcome = settled.unwrap_or_else(|| {
            warn!(%future, "callback registered on an unknown future");
            Err(Failure::Internal(format!("{} does not exist", future)))
        });
        self.submit(context, Box::new(move || callback(outcome)));
    }

    fn execution_context(&self) -> ContextId {
        self.context
    }

    fn promise_to_future(&self, promise: PromiseId) -> FutureId {
        FutureId::new(promise.as_u64())
    }

    fn submit(&self, context: ContextId, thunk: Thunk) {
        self.queue(context).push(thunk);
    }
}
