//! State-machine builder
//!
//! Partitions a normalized (and renamed) computation into states. Linear
//! operations accumulate in the open state; an await closes it with a
//! suspension, a branch closes it with a selector whose arms get their own
//! states before a shared join state.

use super::walk::{walk_states, StateVisitor};
use super::{State, StateId, StateMachine, Transition};
use crate::anf::{AwaitPoint, Branch, Normalized, Op};
use crate::ast::{AwaitId, Expr};
use crate::error::{LowerError, LowerResult};
use crate::liveness::Liveness;
use rustc_hash::FxHashMap;

/// Build the state machine of a normalized computation
pub fn build(normalized: &Normalized, liveness: &Liveness) -> LowerResult<StateMachine> {
    let mut builder = Builder::default();
    let count = walk_states(normalized, &mut builder)?;

    let mut states = Vec::with_capacity(count as usize);
    for index in 0..count {
        let id = StateId::new(index);
        let exit = builder
            .exits
            .remove(&id)
            .ok_or_else(|| LowerError::internal(format!("state {} has no exit", id)))?;
        let ops = builder.ops.remove(&id).unwrap_or_default();
        states.push(State { id, ops, exit });
    }

    Ok(StateMachine {
        name: normalized.name.clone(),
        params: normalized.params.clone(),
        states,
        result_ty: normalized.ty.clone(),
        liveness: liveness.clone(),
        await_sites: builder.await_sites,
    })
}

#[derive(Default)]
struct Builder {
    ops: FxHashMap<StateId, Vec<Op>>,
    exits: FxHashMap<StateId, Transition>,
    await_sites: FxHashMap<AwaitId, StateId>,
}

impl Builder {
    fn close(&mut self, state: StateId, exit: Transition) -> LowerResult<()> {
        if self.exits.insert(state, exit).is_some() {
            return Err(LowerError::internal(format!("state {} closed twice", state)));
        }
        Ok(())
    }
}

impl StateVisitor for Builder {
    fn op(&mut self, state: StateId, op: &Op) -> LowerResult<()> {
        if self.exits.contains_key(&state) {
            return Err(LowerError::internal(format!(
                "operation placed in closed state {}",
                state
            )));
        }
        self.ops.entry(state).or_default().push(op.clone());
        Ok(())
    }

    fn suspend(&mut self, state: StateId, point: &AwaitPoint, resume: StateId) -> LowerResult<()> {
        if self.await_sites.insert(point.id, resume).is_some() {
            return Err(LowerError::internal(format!("{} appears twice", point.id)));
        }
        self.close(
            state,
            Transition::Suspend {
                point: point.clone(),
                resume,
            },
        )
    }

    fn branch(&mut self, state: StateId, branch: &Branch, targets: &[StateId]) -> LowerResult<()> {
        self.close(
            state,
            Transition::Branch {
                selector: branch.selector.clone(),
                targets: targets.to_vec(),
            },
        )
    }

    fn goto(&mut self, state: StateId, next: StateId) -> LowerResult<()> {
        self.close(state, Transition::Goto(next))
    }

    fn complete(&mut self, state: StateId, result: &Expr) -> LowerResult<()> {
        self.close(state, Transition::Complete(result.clone()))
    }
}
