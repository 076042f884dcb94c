//! Administrative normal form
//!
//! The normalized body is a flat list of statements in which every
//! suspension point is a top-level [`Stmt::Await`] and every `if`/`match`
//! that suspends is a [`Stmt::Branch`] with one nested statement list
//! per arm. All expressions left in the statements are await-free and run
//! atomically inside a single state.

mod normalize;

pub use normalize::normalize;

use crate::ast::rename::Renames;
use crate::ast::{AwaitId, Binding, Expr, Pattern, Span, Symbol, Type};
use std::fmt;

/// A linear operation executed inside a state
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Introduce a binding; `init` is absent for branch result holders
    Let { binding: Binding, init: Option<Expr> },
    Assign { target: Symbol, value: Expr },
    /// Evaluate for effect and discard the value
    Eval(Expr),
}

/// A suspension point in statement position
#[derive(Debug, Clone, PartialEq)]
pub struct AwaitPoint {
    pub id: AwaitId,
    /// Receives the settled value
    pub binding: Binding,
    /// Await-free expression producing the future
    pub future: Expr,
    pub span: Span,
}

/// One alternative of a match selector
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
}

/// How a branch chooses its arm
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Arm 0 when `cond` is true, arm 1 otherwise
    If { cond: Expr },
    /// First case whose pattern matches and whose guard holds
    Match { scrutinee: Expr, cases: Vec<Case> },
}

/// A conditional that contains suspension points
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub selector: Selector,
    pub arms: Vec<Vec<Stmt>>,
    pub span: Span,
}

/// Normalized statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Op(Op),
    Await(AwaitPoint),
    Branch(Branch),
}

/// A normalized computation
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub name: String,
    pub params: Vec<Binding>,
    pub stmts: Vec<Stmt>,
    /// Await-free value of the computation
    pub result: Expr,
    pub ty: Type,
}

impl Normalized {
    /// Number of suspension points, including those nested in branch arms
    pub fn await_count(&self) -> usize {
        count(&self.stmts, &|stmt| matches!(stmt, Stmt::Await(_)))
    }

    /// Number of branches, including nested ones
    pub fn branch_count(&self) -> usize {
        count(&self.stmts, &|stmt| matches!(stmt, Stmt::Branch(_)))
    }

    /// Copy of this computation with the given symbols renamed everywhere
    pub fn renamed(&self, renames: &Renames) -> Normalized {
        Normalized {
            name: self.name.clone(),
            params: self.params.iter().map(|p| renames.binding(p)).collect(),
            stmts: rename_stmts(&self.stmts, renames),
            result: renames.expr(&self.result),
            ty: self.ty.clone(),
        }
    }
}

fn count(stmts: &[Stmt], pred: &dyn Fn(&Stmt) -> bool) -> usize {
    stmts
        .iter()
        .map(|stmt| {
            let nested = match stmt {
                Stmt::Branch(branch) => branch.arms.iter().map(|arm| count(arm, pred)).sum(),
                _ => 0,
            };
            usize::from(pred(stmt)) + nested
        })
        .sum()
}

fn rename_stmts(stmts: &[Stmt], renames: &Renames) -> Vec<Stmt> {
    stmts.iter().map(|s| rename_stmt(s, renames)).collect()
}

fn rename_stmt(stmt: &Stmt, renames: &Renames) -> Stmt {
    match stmt {
        Stmt::Op(op) => Stmt::Op(op.renamed(renames)),
        Stmt::Await(point) => Stmt::Await(AwaitPoint {
            id: point.id,
            binding: renames.binding(&point.binding),
            future: renames.expr(&point.future),
            span: point.span,
        }),
        Stmt::Branch(branch) => Stmt::Branch(Branch {
            selector: branch.selector.renamed(renames),
            arms: branch
                .arms
                .iter()
                .map(|arm| rename_stmts(arm, renames))
                .collect(),
            span: branch.span,
        }),
    }
}

impl Op {
    pub fn renamed(&self, renames: &Renames) -> Op {
        match self {
            Op::Let { binding, init } => Op::Let {
                binding: renames.binding(binding),
                init: init.as_ref().map(|e| renames.expr(e)),
            },
            Op::Assign { target, value } => Op::Assign {
                target: renames.symbol(target),
                value: renames.expr(value),
            },
            Op::Eval(expr) => Op::Eval(renames.expr(expr)),
        }
    }
}

impl Selector {
    pub fn renamed(&self, renames: &Renames) -> Selector {
        match self {
            Selector::If { cond } => Selector::If {
                cond: renames.expr(cond),
            },
            Selector::Match { scrutinee, cases } => Selector::Match {
                scrutinee: renames.expr(scrutinee),
                cases: cases
                    .iter()
                    .map(|case| Case {
                        pattern: renames.pattern(&case.pattern),
                        guard: case.guard.as_ref().map(|g| renames.expr(g)),
                    })
                    .collect(),
            },
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Let { binding, init } => {
                let keyword = if binding.mutable { "let mut" } else { "let" };
                write!(f, "{} {}", keyword, binding.symbol)?;
                if let Some(init) = init {
                    write!(f, " = {}", init)?;
                }
                Ok(())
            }
            Op::Assign { target, value } => write!(f, "{} = {}", target, value),
            Op::Eval(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::If { cond } => write!(f, "if {}", cond),
            Selector::Match { scrutinee, cases } => {
                write!(f, "match {} [", scrutinee)?;
                for (i, case) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", case.pattern)?;
                    if let Some(guard) = &case.guard {
                        write!(f, " if {}", guard)?;
                    }
                }
                write!(f, "]")
            }
        }
    }
}
