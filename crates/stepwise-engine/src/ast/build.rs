//! Tree construction API
//!
//! Hosts (and tests) assemble computation trees through [`TreeBuilder`]. It
//! hands out unique symbol and await identities and derives each node's type
//! from its children, so a tree built here is well-typed by construction as
//! long as the leaves are.

use super::*;

/// Allocates identities and builds typed nodes
#[derive(Debug, Default)]
pub struct TreeBuilder {
    next_symbol: u32,
    next_await: u32,
    span: Span,
}

impl TreeBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the span stamped on nodes built from now on
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    fn symbol(&mut self, name: &str) -> Symbol {
        let id = SymbolId(self.next_symbol);
        self.next_symbol += 1;
        Symbol::new(id, name)
    }

    /// Declare an immutable binding
    pub fn binding(&mut self, name: &str, ty: Type) -> Binding {
        let symbol = self.symbol(name);
        Binding::new(symbol, ty, false)
    }

    /// Declare a mutable binding
    pub fn mutable(&mut self, name: &str, ty: Type) -> Binding {
        let symbol = self.symbol(name);
        Binding::new(symbol, ty, true)
    }

    /// `await future`
    pub fn await_(&mut self, future: Expr) -> Expr {
        let id = AwaitId(self.next_await);
        self.next_await += 1;
        let ty = future.ty.awaited().cloned().unwrap_or(Type::Any);
        Expr::new(
            ExprKind::Await {
                id,
                future: Box::new(future),
            },
            ty,
            self.span,
        )
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    pub fn literal(&self, literal: Literal) -> Expr {
        let ty = literal.ty();
        Expr::new(ExprKind::Literal(literal), ty, self.span)
    }

    pub fn int(&self, value: i64) -> Expr {
        self.literal(Literal::Int(value))
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.literal(Literal::Bool(value))
    }

    pub fn str(&self, value: &str) -> Expr {
        self.literal(Literal::Str(value.to_string()))
    }

    pub fn unit(&self) -> Expr {
        Expr::unit(self.span)
    }

    pub fn var(&self, binding: &Binding) -> Expr {
        Expr::var(binding, self.span)
    }

    /// Reference a host global of the given type
    pub fn global(&self, name: &str, ty: Type) -> Expr {
        Expr::new(ExprKind::Global(name.to_string()), ty, self.span)
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        let ty = match op {
            UnaryOp::Neg => Type::Int,
            UnaryOp::Not => Type::Bool,
        };
        Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            self.span,
        )
    }

    pub fn neg(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Neg, operand)
    }

    pub fn not(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let ty = if op.is_comparison() {
            Type::Bool
        } else if op == BinaryOp::Concat {
            Type::Str
        } else {
            Type::Int
        };
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            self.span,
        )
    }

    pub fn add(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn eq(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Eq, lhs, rhs)
    }

    pub fn lt(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Lt, lhs, rhs)
    }

    pub fn concat(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Concat, lhs, rhs)
    }

    pub fn logical(&self, op: LogicalOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(
            ExprKind::Logical {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Type::Bool,
            self.span,
        )
    }

    pub fn and(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.logical(LogicalOp::And, lhs, rhs)
    }

    pub fn or(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.logical(LogicalOp::Or, lhs, rhs)
    }

    // ------------------------------------------------------------------
    // Calls and closures
    // ------------------------------------------------------------------

    /// Call with by-value arguments
    pub fn call(&self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.call_with(callee, args.into_iter().map(Arg::value).collect())
    }

    /// Call with explicit argument modes
    pub fn call_with(&self, callee: Expr, args: Vec<Arg>) -> Expr {
        let ty = callee.ty.return_type().cloned().unwrap_or(Type::Any);
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            ty,
            self.span,
        )
    }

    pub fn lambda(&self, params: Vec<Binding>, body: Block) -> Expr {
        let ty = Type::function(
            params.iter().map(|p| p.ty.clone()).collect(),
            body.ty().clone(),
        );
        Expr::new(
            ExprKind::Lambda(Arc::new(Lambda { params, body })),
            ty,
            self.span,
        )
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    pub fn if_(&self, cond: Expr, then_branch: Block, else_branch: Block) -> Expr {
        let ty = then_branch.ty().join(else_branch.ty());
        Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch,
                else_branch,
            },
            ty,
            self.span,
        )
    }

    pub fn arm(&self, pattern: Pattern, guard: Option<Expr>, body: Block) -> MatchArm {
        MatchArm {
            pattern,
            guard,
            body,
        }
    }

    pub fn match_(&self, scrutinee: Expr, arms: Vec<MatchArm>) -> Expr {
        let ty = arms
            .iter()
            .fold(Type::Never, |acc, arm| acc.join(arm.body.ty()));
        Expr::new(
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms,
            },
            ty,
            self.span,
        )
    }

    pub fn block(&self, stmts: Vec<Stmt>, result: Expr) -> Block {
        Block::new(stmts, result)
    }

    pub fn block_expr(&self, block: Block) -> Expr {
        let ty = block.ty().clone();
        Expr::new(ExprKind::Block(block), ty, self.span)
    }

    pub fn try_(&self, body: Block, binding: Binding, handler: Block) -> Expr {
        let ty = body.ty().join(handler.ty());
        Expr::new(
            ExprKind::Try {
                body,
                handler: Handler {
                    binding,
                    body: handler,
                },
            },
            ty,
            self.span,
        )
    }

    pub fn throw(&self, value: Expr) -> Expr {
        Expr::new(ExprKind::Throw(Box::new(value)), Type::Never, self.span)
    }

    pub fn while_(&self, cond: Expr, body: Block) -> Expr {
        Expr::new(
            ExprKind::While {
                cond: Box::new(cond),
                body,
            },
            Type::Unit,
            self.span,
        )
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn let_(&self, binding: &Binding, init: Expr) -> Stmt {
        Stmt::new(
            StmtKind::Let {
                binding: binding.clone(),
                init,
            },
            self.span,
        )
    }

    pub fn assign(&self, target: &Binding, value: Expr) -> Stmt {
        Stmt::new(
            StmtKind::Assign {
                target: target.symbol.clone(),
                value,
            },
            self.span,
        )
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::new(StmtKind::Expr(expr), self.span)
    }

    pub fn computation(&self, name: &str, params: Vec<Binding>, body: Block) -> Computation {
        Computation::new(name, params, body)
    }
}
