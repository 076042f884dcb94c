//! Expression evaluator

use super::{Env, Failure, Globals, Invoker, Scope, Value};
use crate::ast::{
    free_symbols, ArgMode, AwaitId, BinaryOp, Binding, Block, Expr, ExprKind, Lambda, Literal,
    LogicalOp, Pattern, Stmt, StmtKind, Symbol, SymbolId, UnaryOp,
};
use crate::future_system::{FutureId, Outcome};
use std::sync::Arc;

use super::value::Closure;

/// Evaluates expressions against an environment and the host globals
pub struct Evaluator<'a> {
    globals: &'a Globals,
    env: &'a mut dyn Env,
}

impl<'a> Evaluator<'a> {
    pub fn new(globals: &'a Globals, env: &'a mut dyn Env) -> Self {
        Self { globals, env }
    }

    pub fn block(&mut self, block: &Block) -> Outcome {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        self.eval(&block.result)
    }

    pub fn stmt(&mut self, stmt: &Stmt) -> Result<(), Failure> {
        match &stmt.kind {
            StmtKind::Let { binding, init } => {
                let value = self.eval(init)?;
                self.env.define(binding.id(), value);
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.env.assign(target, value)?;
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    pub fn define(&mut self, binding: &Binding, value: Value) {
        self.env.define(binding.id(), value);
    }

    pub fn assign(&mut self, target: &Symbol, value: Value) -> Result<(), Failure> {
        self.env.assign(target, value)
    }

    /// Test a pattern, binding its variable on success
    pub fn bind_pattern(&mut self, pattern: &Pattern, value: &Value) -> bool {
        match pattern {
            Pattern::Wildcard => true,
            Pattern::Literal(literal) => literal_value(literal) == *value,
            Pattern::Bind(binding) => {
                self.env.define(binding.id(), value.clone());
                true
            }
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Outcome {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),
            ExprKind::Var(symbol) => self.env.lookup(symbol),
            ExprKind::Global(name) => self
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| Failure::Type(format!("undefined global {}", name))),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => Ok(Value::Int(value.as_int()?.wrapping_neg())),
                    UnaryOp::Not => Ok(Value::Bool(!value.as_bool()?)),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?.as_bool()?;
                match (op, lhs) {
                    (LogicalOp::And, false) => Ok(Value::Bool(false)),
                    (LogicalOp::Or, true) => Ok(Value::Bool(true)),
                    _ => Ok(Value::Bool(self.eval(rhs)?.as_bool()?)),
                }
            }
            ExprKind::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let value = match arg.mode {
                        ArgMode::ByValue => self.eval(&arg.value)?,
                        ArgMode::ByName => self.thunk(&arg.value),
                    };
                    values.push(value);
                }
                self.invoke(&callee, values)
            }
            ExprKind::Lambda(lambda) => Ok(self.closure(lambda)),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond)?.as_bool()? {
                    self.block(then_branch)
                } else {
                    self.block(else_branch)
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                let value = self.eval(scrutinee)?;
                for arm in arms {
                    if !self.bind_pattern(&arm.pattern, &value) {
                        continue;
                    }
                    if let Some(guard) = &arm.guard {
                        if !self.eval(guard)?.as_bool()? {
                            continue;
                        }
                    }
                    return self.block(&arm.body);
                }
                Err(Failure::MatchError(value))
            }
            ExprKind::Block(block) => self.block(block),
            ExprKind::Await { id, future } => {
                let future = self.eval(future)?.as_future()?;
                self.env.await_future(*id, future)
            }
            ExprKind::Try { body, handler } => match self.block(body) {
                Err(failure) if failure.is_catchable() => {
                    self.env.define(handler.binding.id(), failure.into_value());
                    self.block(&handler.body)
                }
                other => other,
            },
            ExprKind::Throw(value) => Err(Failure::Thrown(self.eval(value)?)),
            ExprKind::While { cond, body } => {
                while self.eval(cond)?.as_bool()? {
                    self.block(body)?;
                }
                Ok(Value::Unit)
            }
        }
    }

    /// Create a closure capturing the current values of its free variables
    fn closure(&self, lambda: &Arc<Lambda>) -> Value {
        let captured = free_symbols(lambda)
            .into_iter()
            .filter_map(|symbol| self.env.try_lookup(&symbol).map(|v| (symbol.id, v)))
            .collect();
        Value::Closure(Arc::new(Closure {
            lambda: lambda.clone(),
            captured,
        }))
    }

    /// Package a by-name argument as a zero-parameter closure
    fn thunk(&self, value: &Expr) -> Value {
        let lambda = Arc::new(Lambda {
            params: vec![],
            body: Block::of(value.clone()),
        });
        self.closure(&lambda)
    }
}

impl Invoker for Evaluator<'_> {
    fn invoke(&mut self, callee: &Value, args: Vec<Value>) -> Outcome {
        match callee {
            Value::Closure(closure) => {
                let params = &closure.lambda.params;
                if params.len() != args.len() {
                    return Err(Failure::Type(format!(
                        "closure takes {} argument(s) but {} were supplied",
                        params.len(),
                        args.len()
                    )));
                }
                let mut vars = closure.captured.clone();
                for (param, arg) in params.iter().zip(args) {
                    vars.insert(param.id(), arg);
                }
                let mut frame = Frame {
                    scope: Scope::with_vars(vars),
                    outer: &mut *self.env,
                };
                Evaluator::new(self.globals, &mut frame).block(&closure.lambda.body)
            }
            Value::Native(native) => (native.func)(self, &args),
            other => Err(Failure::Type(format!("{} is not callable", other.kind()))),
        }
    }
}

/// Environment of a closure body: its captures and parameters, with
/// suspension delegated to the caller
struct Frame<'p> {
    scope: Scope,
    outer: &'p mut dyn Env,
}

impl Env for Frame<'_> {
    fn try_lookup(&self, symbol: &Symbol) -> Option<Value> {
        self.scope.try_lookup(symbol)
    }

    fn define(&mut self, id: SymbolId, value: Value) {
        self.scope.define(id, value);
    }

    fn assign(&mut self, symbol: &Symbol, value: Value) -> Result<(), Failure> {
        self.scope.assign(symbol, value)
    }

    fn await_future(&mut self, id: AwaitId, future: FutureId) -> Outcome {
        self.outer.await_future(id, future)
    }
}

pub(crate) fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Unit => Value::Unit,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Str(s) => Value::str(s),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Outcome {
    let value = match op {
        BinaryOp::Add => Value::Int(lhs.as_int()?.wrapping_add(rhs.as_int()?)),
        BinaryOp::Sub => Value::Int(lhs.as_int()?.wrapping_sub(rhs.as_int()?)),
        BinaryOp::Mul => Value::Int(lhs.as_int()?.wrapping_mul(rhs.as_int()?)),
        BinaryOp::Div | BinaryOp::Rem => {
            let (a, b) = (lhs.as_int()?, rhs.as_int()?);
            if b == 0 {
                return Err(Failure::DivisionByZero);
            }
            if op == BinaryOp::Div {
                Value::Int(a.wrapping_div(b))
            } else {
                Value::Int(a.wrapping_rem(b))
            }
        }
        BinaryOp::Eq => Value::Bool(lhs == rhs),
        BinaryOp::Ne => Value::Bool(lhs != rhs),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => {
                    return Err(Failure::Type(format!(
                        "cannot compare {} with {}",
                        lhs.kind(),
                        rhs.kind()
                    )))
                }
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::Concat => Value::str(&format!("{}{}", lhs, rhs)),
    };
    Ok(value)
}
