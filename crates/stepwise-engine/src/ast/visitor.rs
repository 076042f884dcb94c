//! Visitor pattern for traversing the computation tree
//!
//! Each visit method has a default implementation that calls the matching
//! walk function, so implementors only override the nodes they care about.
//!
//! # Example
//!
//! ```rust,ignore
//! struct CountAwaits {
//!     count: usize,
//! }
//!
//! impl Visitor for CountAwaits {
//!     fn visit_expr(&mut self, expr: &Expr) {
//!         if expr.is_await() {
//!             self.count += 1;
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```

use super::*;

/// Computation tree visitor
pub trait Visitor: Sized {
    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_lambda(&mut self, lambda: &Lambda) {
        walk_lambda(self, lambda);
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        walk_pattern(self, pattern);
    }

    /// Called for every binding introduction (lets, parameters, pattern
    /// and handler bindings)
    fn visit_binding(&mut self, _binding: &Binding) {
        // Leaf node
    }

    /// Called for every symbol reference (variable reads and assignment targets)
    fn visit_symbol(&mut self, _symbol: &Symbol) {
        // Leaf node
    }
}

pub fn walk_block<V: Visitor>(visitor: &mut V, block: &Block) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
    visitor.visit_expr(&block.result);
}

pub fn walk_stmt<V: Visitor>(visitor: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Let { binding, init } => {
            visitor.visit_expr(init);
            visitor.visit_binding(binding);
        }
        StmtKind::Assign { target, value } => {
            visitor.visit_expr(value);
            visitor.visit_symbol(target);
        }
        StmtKind::Expr(expr) => visitor.visit_expr(expr),
    }
}

pub fn walk_expr<V: Visitor>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Global(_) => {}
        ExprKind::Var(symbol) => visitor.visit_symbol(symbol),
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::Call { callee, args } => {
            visitor.visit_expr(callee);
            for arg in args {
                visitor.visit_expr(&arg.value);
            }
        }
        ExprKind::Lambda(lambda) => visitor.visit_lambda(lambda),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_block(then_branch);
            visitor.visit_block(else_branch);
        }
        ExprKind::Match { scrutinee, arms } => {
            visitor.visit_expr(scrutinee);
            for arm in arms {
                visitor.visit_pattern(&arm.pattern);
                if let Some(guard) = &arm.guard {
                    visitor.visit_expr(guard);
                }
                visitor.visit_block(&arm.body);
            }
        }
        ExprKind::Block(block) => visitor.visit_block(block),
        ExprKind::Await { future, .. } => visitor.visit_expr(future),
        ExprKind::Try { body, handler } => {
            visitor.visit_block(body);
            visitor.visit_binding(&handler.binding);
            visitor.visit_block(&handler.body);
        }
        ExprKind::Throw(value) => visitor.visit_expr(value),
        ExprKind::While { cond, body } => {
            visitor.visit_expr(cond);
            visitor.visit_block(body);
        }
    }
}

pub fn walk_lambda<V: Visitor>(visitor: &mut V, lambda: &Lambda) {
    for param in &lambda.params {
        visitor.visit_binding(param);
    }
    visitor.visit_block(&lambda.body);
}

pub fn walk_pattern<V: Visitor>(visitor: &mut V, pattern: &Pattern) {
    match pattern {
        Pattern::Wildcard | Pattern::Literal(_) => {}
        Pattern::Bind(binding) => visitor.visit_binding(binding),
    }
}
