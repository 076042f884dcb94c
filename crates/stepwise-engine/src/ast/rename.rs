//! Symbol renaming
//!
//! Produces a copy of a subtree where every occurrence of a renamed symbol
//! (definitions and references alike) carries its new printable name.
//! [`Renames::insert`] keeps the symbol identity; [`Renames::replace`] swaps
//! in a different symbol altogether.

use super::*;
use rustc_hash::FxHashMap;

/// Map from symbol identity to the symbol that takes its place
#[derive(Debug, Clone, Default)]
pub struct Renames {
    names: FxHashMap<SymbolId, Symbol>,
}

impl Renames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give a symbol a new name, keeping its identity
    pub fn insert(&mut self, id: SymbolId, name: impl Into<String>) {
        self.names.insert(id, Symbol::new(id, name));
    }

    /// Substitute another symbol for every occurrence of `id`
    pub fn replace(&mut self, id: SymbolId, symbol: Symbol) {
        self.names.insert(id, symbol);
    }

    pub fn get(&self, id: SymbolId) -> Option<&str> {
        self.names.get(&id).map(|symbol| symbol.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn symbol(&self, symbol: &Symbol) -> Symbol {
        self.names.get(&symbol.id).cloned().unwrap_or_else(|| symbol.clone())
    }

    pub fn binding(&self, binding: &Binding) -> Binding {
        Binding::new(self.symbol(&binding.symbol), binding.ty.clone(), binding.mutable)
    }

    pub fn pattern(&self, pattern: &Pattern) -> Pattern {
        match pattern {
            Pattern::Bind(binding) => Pattern::Bind(self.binding(binding)),
            other => other.clone(),
        }
    }

    pub fn block(&self, block: &Block) -> Block {
        Block::new(
            block.stmts.iter().map(|s| self.stmt(s)).collect(),
            self.expr(&block.result),
        )
    }

    pub fn stmt(&self, stmt: &Stmt) -> Stmt {
        let kind = match &stmt.kind {
            StmtKind::Let { binding, init } => StmtKind::Let {
                binding: self.binding(binding),
                init: self.expr(init),
            },
            StmtKind::Assign { target, value } => StmtKind::Assign {
                target: self.symbol(target),
                value: self.expr(value),
            },
            StmtKind::Expr(expr) => StmtKind::Expr(self.expr(expr)),
        };
        Stmt::new(kind, stmt.span)
    }

    pub fn expr(&self, expr: &Expr) -> Expr {
        if self.is_empty() {
            return expr.clone();
        }
        let boxed = |e: &Expr| Box::new(self.expr(e));
        let kind = match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Global(_) => expr.kind.clone(),
            ExprKind::Var(symbol) => ExprKind::Var(self.symbol(symbol)),
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: boxed(operand),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
            },
            ExprKind::Logical { op, lhs, rhs } => ExprKind::Logical {
                op: *op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: boxed(callee),
                args: args
                    .iter()
                    .map(|arg| Arg {
                        mode: arg.mode,
                        value: self.expr(&arg.value),
                    })
                    .collect(),
            },
            ExprKind::Lambda(lambda) => ExprKind::Lambda(Arc::new(Lambda {
                params: lambda.params.iter().map(|p| self.binding(p)).collect(),
                body: self.block(&lambda.body),
            })),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::If {
                cond: boxed(cond),
                then_branch: self.block(then_branch),
                else_branch: self.block(else_branch),
            },
            ExprKind::Match { scrutinee, arms } => ExprKind::Match {
                scrutinee: boxed(scrutinee),
                arms: arms
                    .iter()
                    .map(|arm| MatchArm {
                        pattern: self.pattern(&arm.pattern),
                        guard: arm.guard.as_ref().map(|g| self.expr(g)),
                        body: self.block(&arm.body),
                    })
                    .collect(),
            },
            ExprKind::Block(block) => ExprKind::Block(self.block(block)),
            ExprKind::Await { id, future } => ExprKind::Await {
                id: *id,
                future: boxed(future),
            },
            ExprKind::Try { body, handler } => ExprKind::Try {
                body: self.block(body),
                handler: Handler {
                    binding: self.binding(&handler.binding),
                    body: self.block(&handler.body),
                },
            },
            ExprKind::Throw(value) => ExprKind::Throw(boxed(value)),
            ExprKind::While { cond, body } => ExprKind::While {
                cond: boxed(cond),
                body: self.block(body),
            },
        };
        Expr::new(kind, expr.ty.clone(), expr.span)
    }
}
