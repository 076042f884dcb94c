//! Normalization pass
//!
//! Hoists every suspension point into statement position. Subtrees without
//! an `await` are copied unchanged; only the spine leading to an `await` is
//! taken apart, and operands evaluated before an awaiting sibling are bound
//! to temporaries so the original left-to-right order (and with it the order
//! of failures) is kept.
//!
//! Inlined lambdas keep closure semantics: mutable variables they capture are
//! copied before the arguments run, and the body works on the copies.

use super::{AwaitPoint, Branch, Case, Normalized, Op, Selector, Stmt};
use crate::ast::{
    self, block_contains_await, contains_await, free_symbols, rename::Renames, Arg, Binding,
    Block, Computation, Expr, ExprKind, Lambda, Literal, MatchArm, Span, StmtKind, SymbolId,
    Type, Visitor,
};
use crate::error::{LowerError, LowerResult};
use crate::fresh::FreshNames;
use rustc_hash::FxHashMap;

/// Normalize a computation that passed the usage check
pub fn normalize(
    computation: &Computation,
    names: FreshNames,
) -> LowerResult<(Normalized, FreshNames)> {
    let mut mutable = MutableBindings::default();
    for param in &computation.params {
        mutable.visit_binding(param);
    }
    mutable.visit_block(&computation.body);

    let mut normalizer = Normalizer {
        names,
        mutable: mutable.bindings,
    };
    let mut stmts = Vec::new();
    let result = normalizer.block(&computation.body, &mut stmts)?;

    let normalized = Normalized {
        name: computation.name.clone(),
        params: computation.params.clone(),
        stmts,
        result,
        ty: computation.ty.clone(),
    };
    Ok((normalized, normalizer.names))
}

#[derive(Default)]
struct MutableBindings {
    bindings: FxHashMap<SymbolId, Binding>,
}

impl Visitor for MutableBindings {
    fn visit_binding(&mut self, binding: &Binding) {
        if binding.mutable {
            self.bindings.insert(binding.id(), binding.clone());
        }
    }
}

struct Normalizer {
    names: FreshNames,
    /// Bindings that may change between two evaluation steps
    mutable: FxHashMap<SymbolId, Binding>,
}

impl Normalizer {
    fn block(&mut self, block: &Block, out: &mut Vec<Stmt>) -> LowerResult<Expr> {
        for stmt in &block.stmts {
            self.stmt(stmt, out)?;
        }
        self.expr(&block.result, out)
    }

    fn stmt(&mut self, stmt: &ast::Stmt, out: &mut Vec<Stmt>) -> LowerResult<()> {
        match &stmt.kind {
            StmtKind::Let { binding, init } => match &init.kind {
                ExprKind::Await { id, future } => {
                    let future = self.expr(future, out)?;
                    out.push(Stmt::Await(AwaitPoint {
                        id: *id,
                        binding: binding.clone(),
                        future,
                        span: init.span,
                    }));
                }
                _ => {
                    let init = self.expr(init, out)?;
                    out.push(Stmt::Op(Op::Let {
                        binding: binding.clone(),
                        init: Some(init),
                    }));
                }
            },
            StmtKind::Assign { target, value } => {
                let value = self.expr(value, out)?;
                out.push(Stmt::Op(Op::Assign {
                    target: target.clone(),
                    value,
                }));
            }
            StmtKind::Expr(expr) => {
                let value = self.expr(expr, out)?;
                if !value.is_inert() {
                    out.push(Stmt::Op(Op::Eval(value)));
                }
            }
        }
        Ok(())
    }

    /// Lower an expression, pushing the statements that must run before it.
    /// The returned expression is await-free.
    fn expr(&mut self, expr: &Expr, out: &mut Vec<Stmt>) -> LowerResult<Expr> {
        if !contains_await(expr) {
            return Ok(expr.clone());
        }
        let span = expr.span;
        let ty = expr.ty.clone();
        let kind = match &expr.kind {
            ExprKind::Await { id, future } => {
                let future = self.expr(future, out)?;
                let binding = self.names.binding("await", ty.clone(), false);
                out.push(Stmt::Await(AwaitPoint {
                    id: *id,
                    binding: binding.clone(),
                    future,
                    span,
                }));
                return Ok(Expr::var(&binding, span));
            }
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(self.expr(operand, out)?),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let mut values = self.operands(&[&**lhs, &**rhs], out)?.into_iter();
                let (lhs, rhs) = match (values.next(), values.next()) {
                    (Some(lhs), Some(rhs)) => (lhs, rhs),
                    _ => return Err(LowerError::internal("binary operator lost an operand")),
                };
                ExprKind::Binary {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
            ExprKind::Call { callee, args } => {
                if let ExprKind::Lambda(lambda) = &callee.kind {
                    if block_contains_await(&lambda.body) {
                        return self.inline(lambda, args, span, out);
                    }
                }
                return self.call(callee, args, ty, span, out);
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if !contains_await(cond)
                    && !block_contains_await(then_branch)
                    && !block_contains_await(else_branch)
                {
                    ExprKind::If {
                        cond: Box::new(self.expr(cond, out)?),
                        then_branch: then_branch.clone(),
                        else_branch: else_branch.clone(),
                    }
                } else {
                    let cond = self.atom(cond, "cond", out)?;
                    let arms = [then_branch, else_branch];
                    return self.branch(Selector::If { cond }, &arms, &ty, span, out);
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                if arms
                    .iter()
                    .any(|arm| arm.guard.as_ref().is_some_and(contains_await))
                {
                    return Err(LowerError::internal("await in a match guard reached normalization"));
                }
                if !contains_await(scrutinee)
                    && !arms.iter().any(|arm| block_contains_await(&arm.body))
                {
                    ExprKind::Match {
                        scrutinee: Box::new(self.expr(scrutinee, out)?),
                        arms: arms.clone(),
                    }
                } else {
                    let scrutinee = self.atom(scrutinee, "scrutinee", out)?;
                    let cases = arms
                        .iter()
                        .map(|arm: &MatchArm| Case {
                            pattern: arm.pattern.clone(),
                            guard: arm.guard.clone(),
                        })
                        .collect();
                    let bodies: Vec<&Block> = arms.iter().map(|arm| &arm.body).collect();
                    let selector = Selector::Match { scrutinee, cases };
                    return self.branch(selector, &bodies, &ty, span, out);
                }
            }
            ExprKind::Block(block) => return self.block(block, out),
            ExprKind::Throw(value) => ExprKind::Throw(Box::new(self.expr(value, out)?)),
            ExprKind::Logical { .. } => return Err(unsupported("short-circuit operand", span)),
            ExprKind::Lambda(_) => return Err(unsupported("closure", span)),
            ExprKind::Try { .. } => return Err(unsupported("try", span)),
            ExprKind::While { .. } => return Err(unsupported("loop", span)),
            ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Global(_) => {
                return Ok(expr.clone())
            }
        };
        Ok(Expr::new(kind, ty, span))
    }

    /// Lower sibling operands evaluated left to right. Every operand before
    /// the last awaiting one is bound to a temporary unless re-reading it
    /// later gives the same value.
    fn operands(&mut self, operands: &[&Expr], out: &mut Vec<Stmt>) -> LowerResult<Vec<Expr>> {
        let last_await = operands.iter().rposition(|e| contains_await(e));
        let mut values = Vec::with_capacity(operands.len());
        for (i, operand) in operands.iter().enumerate() {
            let value = self.expr(operand, out)?;
            let pinned = match last_await {
                Some(last) if i < last && !self.is_stable(&value) => {
                    self.bind_temp(value, "v", out)
                }
                _ => value,
            };
            values.push(pinned);
        }
        Ok(values)
    }

    fn call(
        &mut self,
        callee: &Expr,
        args: &[Arg],
        ty: Type,
        span: Span,
        out: &mut Vec<Stmt>,
    ) -> LowerResult<Expr> {
        if args.iter().any(|arg| arg.is_by_name() && contains_await(&arg.value)) {
            return Err(unsupported("by-name argument", span));
        }
        // By-name arguments are not evaluated at the call site and take no
        // part in ordering
        let mut evaluated: Vec<&Expr> = vec![callee];
        evaluated.extend(args.iter().filter(|a| !a.is_by_name()).map(|a| &a.value));
        let mut values = self.operands(&evaluated, out)?.into_iter();

        let callee = values
            .next()
            .ok_or_else(|| LowerError::internal("call lost its callee"))?;
        let mut lowered = Vec::with_capacity(args.len());
        for arg in args {
            if arg.is_by_name() {
                lowered.push(arg.clone());
            } else {
                let value = values
                    .next()
                    .ok_or_else(|| LowerError::internal("call lost an argument"))?;
                lowered.push(Arg {
                    mode: arg.mode,
                    value,
                });
            }
        }
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args: lowered,
            },
            ty,
            span,
        ))
    }

    /// Splice the body of an immediately invoked lambda into the caller
    fn inline(
        &mut self,
        lambda: &Lambda,
        args: &[Arg],
        span: Span,
        out: &mut Vec<Stmt>,
    ) -> LowerResult<Expr> {
        if lambda.params.len() != args.len() {
            return Err(LowerError::internal(format!(
                "inlined lambda at {} takes {} argument(s) but {} were supplied",
                span,
                lambda.params.len(),
                args.len()
            )));
        }
        let mut renames = Renames::new();
        for symbol in free_symbols(lambda) {
            let Some(captured) = self.mutable.get(&symbol.id).cloned() else {
                continue;
            };
            let copy = self
                .names
                .binding(&captured.symbol.name, captured.ty.clone(), true);
            self.mutable.insert(copy.id(), copy.clone());
            out.push(Stmt::Op(Op::Let {
                binding: copy.clone(),
                init: Some(Expr::var(&captured, span)),
            }));
            renames.replace(symbol.id, copy.symbol);
        }
        for (param, arg) in lambda.params.iter().zip(args) {
            let init = if arg.is_by_name() {
                if contains_await(&arg.value) {
                    return Err(unsupported("by-name argument", span));
                }
                thunk(&arg.value)
            } else {
                self.expr(&arg.value, out)?
            };
            out.push(Stmt::Op(Op::Let {
                binding: param.clone(),
                init: Some(init),
            }));
        }
        self.block(&renames.block(&lambda.body), out)
    }

    /// Lower a conditional that suspends into a branch statement
    fn branch(
        &mut self,
        selector: Selector,
        arms: &[&Block],
        ty: &Type,
        span: Span,
        out: &mut Vec<Stmt>,
    ) -> LowerResult<Expr> {
        let holder = if ty.is_unit() || ty.is_never() {
            None
        } else {
            let binding = self.names.binding("branch", ty.clone(), true);
            self.mutable.insert(binding.id(), binding.clone());
            out.push(Stmt::Op(Op::Let {
                binding: binding.clone(),
                init: None,
            }));
            Some(binding)
        };

        let mut lowered = Vec::with_capacity(arms.len());
        for arm in arms {
            let mut stmts = Vec::new();
            let value = self.block(arm, &mut stmts)?;
            match &holder {
                Some(binding) if !value.ty.is_never() => stmts.push(Stmt::Op(Op::Assign {
                    target: binding.symbol.clone(),
                    value,
                })),
                _ if !value.is_inert() => stmts.push(Stmt::Op(Op::Eval(value))),
                _ => {}
            }
            lowered.push(stmts);
        }

        out.push(Stmt::Branch(Branch {
            selector,
            arms: lowered,
            span,
        }));
        Ok(match holder {
            Some(binding) => Expr::var(&binding, span),
            None => Expr::new(ExprKind::Literal(Literal::Unit), ty.clone(), span),
        })
    }

    /// Lower an expression and make sure the result is an atom
    fn atom(&mut self, expr: &Expr, hint: &str, out: &mut Vec<Stmt>) -> LowerResult<Expr> {
        let value = self.expr(expr, out)?;
        if value.is_atom() {
            Ok(value)
        } else {
            Ok(self.bind_temp(value, hint, out))
        }
    }

    fn bind_temp(&mut self, value: Expr, hint: &str, out: &mut Vec<Stmt>) -> Expr {
        let span = value.span;
        let binding = self.names.binding(hint, value.ty.clone(), false);
        out.push(Stmt::Op(Op::Let {
            binding: binding.clone(),
            init: Some(value),
        }));
        Expr::var(&binding, span)
    }

    /// Check if evaluating the expression later yields the same value
    fn is_stable(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Global(_) => true,
            ExprKind::Var(symbol) => !self.mutable.contains_key(&symbol.id),
            _ => false,
        }
    }
}

/// Wrap a by-name argument into the zero-parameter closure it denotes
fn thunk(value: &Expr) -> Expr {
    let ty = Type::function(vec![], value.ty.clone());
    let lambda = Lambda {
        params: vec![],
        body: Block::of(value.clone()),
    };
    Expr::new(ExprKind::Lambda(std::sync::Arc::new(lambda)), ty, value.span)
}

fn unsupported(what: &str, span: Span) -> LowerError {
    LowerError::internal(format!(
        "await inside a {} at {} reached normalization",
        what, span
    ))
}
