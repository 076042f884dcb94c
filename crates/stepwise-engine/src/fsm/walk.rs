//! State numbering walk
//!
//! Liveness and the builder must agree on which state every statement lands
//! in. Both drive this walk and only react to its callbacks, so the
//! numbering lives in one place.

use super::StateId;
use crate::anf::{AwaitPoint, Branch, Normalized, Op, Stmt};
use crate::ast::Expr;
use crate::error::LowerResult;

/// Receives the statements of a normalized body placed into states
pub trait StateVisitor {
    /// A linear operation of `state`
    fn op(&mut self, state: StateId, op: &Op) -> LowerResult<()>;

    /// `state` suspends on `point` and continues in `resume`
    fn suspend(&mut self, state: StateId, point: &AwaitPoint, resume: StateId) -> LowerResult<()>;

    /// `state` selects one of `targets` (one per arm)
    fn branch(&mut self, state: StateId, branch: &Branch, targets: &[StateId]) -> LowerResult<()>;

    /// `state` falls through to `next`
    fn goto(&mut self, state: StateId, next: StateId) -> LowerResult<()>;

    /// `state` completes the computation with `result`
    fn complete(&mut self, state: StateId, result: &Expr) -> LowerResult<()>;
}

/// Walk a normalized body, returning the number of states
pub fn walk_states<V: StateVisitor>(normalized: &Normalized, visitor: &mut V) -> LowerResult<u32> {
    let mut walk = Walk { visitor, next: 1 };
    let last = walk.stmts(StateId::ENTRY, &normalized.stmts)?;
    walk.visitor.complete(last, &normalized.result)?;
    Ok(walk.next)
}

struct Walk<'v, V> {
    visitor: &'v mut V,
    next: u32,
}

impl<V: StateVisitor> Walk<'_, V> {
    fn alloc(&mut self) -> StateId {
        let id = StateId::new(self.next);
        self.next += 1;
        id
    }

    /// Place statements starting in `state`; returns the state left open
    fn stmts(&mut self, mut state: StateId, stmts: &[Stmt]) -> LowerResult<StateId> {
        for stmt in stmts {
            match stmt {
                Stmt::Op(op) => self.visitor.op(state, op)?,
                Stmt::Await(point) => {
                    let resume = self.alloc();
                    self.visitor.suspend(state, point, resume)?;
                    state = resume;
                }
                Stmt::Branch(branch) => {
                    let mut targets = Vec::with_capacity(branch.arms.len());
                    let mut ends = Vec::with_capacity(branch.arms.len());
                    for arm in &branch.arms {
                        let start = self.alloc();
                        targets.push(start);
                        ends.push(self.stmts(start, arm)?);
                    }
                    let join = self.alloc();
                    self.visitor.branch(state, branch, &targets)?;
                    for end in ends {
                        self.visitor.goto(end, join)?;
                    }
                    state = join;
                }
            }
        }
        Ok(state)
    }
}
