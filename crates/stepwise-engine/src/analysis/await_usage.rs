//! Await usage validation
//!
//! Rejects suspension points the state machine cannot express: anywhere the
//! evaluation of the awaiting expression is conditional on something other
//! than a plain `if`/`match` arm, deferred to another call frame, or wrapped
//! in an exception handler.
//!
//! The check is one read-only traversal that keeps a stack of the enclosing
//! rejecting contexts and reports the innermost one for every offending
//! await. The tree is never modified.

use crate::ast::{
    walk_expr, walk_lambda, walk_pattern, AwaitId, Block, Computation, Expr, ExprKind, Lambda,
    LogicalOp, Span, Visitor,
};
use serde::Serialize;
use std::fmt;

/// A construct that cannot contain a suspension point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AwaitContext {
    /// Either operand of `&&` or `||`
    ShortCircuit(LogicalOp),
    /// An argument passed unevaluated
    ByNameArgument,
    /// A closure literal that is not called on the spot
    Closure,
    /// The guard of a match arm
    MatchGuard,
    /// The body or handler of a `try`
    Try,
    /// The condition or body of a `while`
    Loop,
}

impl fmt::Display for AwaitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwaitContext::ShortCircuit(op) => write!(f, "an operand of `{}`", op),
            AwaitContext::ByNameArgument => write!(f, "a by-name argument"),
            AwaitContext::Closure => write!(f, "a closure that is not immediately invoked"),
            AwaitContext::MatchGuard => write!(f, "a match guard"),
            AwaitContext::Try => write!(f, "a try block"),
            AwaitContext::Loop => write!(f, "a loop"),
        }
    }
}

/// One rejected suspension point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub await_id: AwaitId,
    pub span: Span,
    pub context: AwaitContext,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} cannot be used inside {}",
            self.await_id, self.span, self.context
        )
    }
}

/// Validate every suspension point of a computation
pub fn check(computation: &Computation) -> Result<(), Vec<Diagnostic>> {
    let mut checker = AwaitUsageChecker::default();
    checker.visit_block(&computation.body);
    if checker.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(checker.diagnostics)
    }
}

#[derive(Default)]
struct AwaitUsageChecker {
    contexts: Vec<AwaitContext>,
    diagnostics: Vec<Diagnostic>,
}

impl AwaitUsageChecker {
    fn within(&mut self, context: AwaitContext, expr: &Expr) {
        self.contexts.push(context);
        self.visit_expr(expr);
        self.contexts.pop();
    }

    fn within_block(&mut self, context: AwaitContext, block: &Block) {
        self.contexts.push(context);
        self.visit_block(block);
        self.contexts.pop();
    }

    /// Walk a lambda whose body runs as part of the current evaluation
    fn inline_lambda(&mut self, lambda: &Lambda) {
        walk_lambda(self, lambda);
    }
}

impl Visitor for AwaitUsageChecker {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Await { id, future } => {
                if let Some(context) = self.contexts.last() {
                    self.diagnostics.push(Diagnostic {
                        await_id: *id,
                        span: expr.span,
                        context: *context,
                    });
                }
                self.visit_expr(future);
            }
            ExprKind::Logical { op, lhs, rhs } => {
                self.within(AwaitContext::ShortCircuit(*op), lhs);
                self.within(AwaitContext::ShortCircuit(*op), rhs);
            }
            ExprKind::Call { callee, args } => {
                match &callee.kind {
                    ExprKind::Lambda(lambda) => self.inline_lambda(lambda),
                    _ => self.visit_expr(callee),
                }
                for arg in args {
                    if arg.is_by_name() {
                        self.within(AwaitContext::ByNameArgument, &arg.value);
                    } else {
                        self.visit_expr(&arg.value);
                    }
                }
            }
            ExprKind::Lambda(lambda) => {
                self.contexts.push(AwaitContext::Closure);
                walk_lambda(self, lambda);
                self.contexts.pop();
            }
            ExprKind::Match { scrutinee, arms } => {
                self.visit_expr(scrutinee);
                for arm in arms {
                    walk_pattern(self, &arm.pattern);
                    if let Some(guard) = &arm.guard {
                        self.within(AwaitContext::MatchGuard, guard);
                    }
                    self.visit_block(&arm.body);
                }
            }
            ExprKind::Try { body, handler } => {
                self.within_block(AwaitContext::Try, body);
                self.within_block(AwaitContext::Try, &handler.body);
            }
            ExprKind::While { cond, body } => {
                self.within(AwaitContext::Loop, cond);
                self.within_block(AwaitContext::Loop, body);
            }
            _ => walk_expr(self, expr),
        }
    }
}
