//! Computation tree
//!
//! The typed tree handed to the pipeline by the host. It describes the body
//! of one asynchronous computation: an ordered list of statements ending in a
//! result expression, where `await` marks the suspension points.
//!
//! Symbols are already resolved: every binding carries a [`SymbolId`] unique
//! within the tree, so passes can move statements between scopes (flattening
//! blocks, inlining lambdas) without capture problems.

pub mod build;
mod display;
pub mod rename;
pub mod types;
pub mod visitor;

pub use build::TreeBuilder;
pub use types::Type;
pub use visitor::{walk_block, walk_expr, walk_lambda, walk_pattern, walk_stmt, Visitor};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Source location of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
            column: self.column.min(other.column),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Resolved symbol identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved name: identity plus its printable name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
}

impl Symbol {
    pub fn new(id: SymbolId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A named local value with its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub symbol: Symbol,
    pub ty: Type,
    /// Whether the binding may be reassigned after definition
    pub mutable: bool,
}

impl Binding {
    pub fn new(symbol: Symbol, ty: Type, mutable: bool) -> Self {
        Self {
            symbol,
            ty,
            mutable,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.symbol.id
    }

    pub fn name(&self) -> &str {
        &self.symbol.name
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mutable {
            write!(f, "mut ")?;
        }
        write!(f, "{}: {}", self.symbol, self.ty)
    }
}

/// Identity of a suspension point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AwaitId(pub u32);

impl AwaitId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AwaitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "await#{}", self.0)
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Unit,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Literal {
    pub fn ty(&self) -> Type {
        match self {
            Literal::Unit => Type::Unit,
            Literal::Bool(_) => Type::Bool,
            Literal::Int(_) => Type::Int,
            Literal::Str(_) => Type::Str,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Boolean negation
    Not,
}

/// Binary operators (both operands are always evaluated, left first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// String concatenation of the display forms of both operands
    Concat,
}

impl BinaryOp {
    /// Check if this operator produces a boolean
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Short-circuit boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

/// How an argument is passed to its callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgMode {
    /// Evaluated before the call
    ByValue,
    /// Passed unevaluated as a zero-argument closure
    ByName,
}

/// A call argument
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub mode: ArgMode,
    pub value: Expr,
}

impl Arg {
    pub fn value(value: Expr) -> Self {
        Self {
            mode: ArgMode::ByValue,
            value,
        }
    }

    pub fn by_name(value: Expr) -> Self {
        Self {
            mode: ArgMode::ByName,
            value,
        }
    }

    pub fn is_by_name(&self) -> bool {
        self.mode == ArgMode::ByName
    }
}

/// Match patterns
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// Matches an equal literal
    Literal(Literal),
    /// Matches anything and binds it
    Bind(Binding),
}

/// One arm of a `match`
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Block,
}

/// A closure literal
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Binding>,
    pub body: Block,
}

/// The handler of a `try` expression
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    /// Receives the failure value
    pub binding: Binding,
    pub body: Block,
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// Reference to a local binding
    Var(Symbol),
    /// Reference to a host-provided global (usually a native function)
    Global(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    Lambda(Arc<Lambda>),
    If {
        cond: Box<Expr>,
        then_branch: Block,
        else_branch: Block,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    Block(Block),
    /// Suspension point
    Await {
        id: AwaitId,
        future: Box<Expr>,
    },
    Try {
        body: Block,
        handler: Handler,
    },
    Throw(Box<Expr>),
    While {
        cond: Box<Expr>,
        body: Block,
    },
}

/// A typed expression node
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> Self {
        Self { kind, ty, span }
    }

    /// The unit literal
    pub fn unit(span: Span) -> Self {
        Self::new(ExprKind::Literal(Literal::Unit), Type::Unit, span)
    }

    /// Reference to a binding
    pub fn var(binding: &Binding, span: Span) -> Self {
        Self::new(ExprKind::Var(binding.symbol.clone()), binding.ty.clone(), span)
    }

    /// Replace the span of this node
    pub fn spanned(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Check if this node is a leaf: a literal, a variable or a global
    pub fn is_atom(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Global(_)
        )
    }

    /// Check if evaluating this node can neither fail nor have effects.
    /// Global lookups can fail, so only literals and variables qualify.
    pub fn is_inert(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_) | ExprKind::Var(_))
    }

    /// Check if this is a suspension point
    pub fn is_await(&self) -> bool {
        matches!(self.kind, ExprKind::Await { .. })
    }
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let { binding: Binding, init: Expr },
    Assign { target: Symbol, value: Expr },
    Expr(Expr),
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statements followed by the block's value
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub result: Box<Expr>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, result: Expr) -> Self {
        Self {
            stmts,
            result: Box::new(result),
        }
    }

    /// A block made of a single expression
    pub fn of(result: Expr) -> Self {
        Self::new(Vec::new(), result)
    }

    pub fn ty(&self) -> &Type {
        &self.result.ty
    }
}

/// The asynchronous computation being lowered
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    pub name: String,
    pub params: Vec<Binding>,
    pub body: Block,
    /// Type of the value the result future settles with
    pub ty: Type,
}

impl Computation {
    pub fn new(name: impl Into<String>, params: Vec<Binding>, body: Block) -> Self {
        let ty = body.ty().clone();
        Self {
            name: name.into(),
            params,
            body,
            ty,
        }
    }
}

/// Check if an expression contains a suspension point anywhere below it
pub fn contains_await(expr: &Expr) -> bool {
    let mut finder = AwaitFinder { found: false };
    finder.visit_expr(expr);
    finder.found
}

/// Check if a block contains a suspension point anywhere below it
pub fn block_contains_await(block: &Block) -> bool {
    let mut finder = AwaitFinder { found: false };
    finder.visit_block(block);
    finder.found
}

/// Symbols a lambda reads or assigns without introducing them, in order of
/// first occurrence
pub fn free_symbols(lambda: &Lambda) -> Vec<Symbol> {
    let mut scan = FreeSymbols::default();
    scan.visit_lambda(lambda);
    let FreeSymbols {
        referenced,
        introduced,
        ..
    } = scan;
    referenced
        .into_iter()
        .filter(|symbol| !introduced.contains(&symbol.id))
        .collect()
}

struct AwaitFinder {
    found: bool,
}

impl Visitor for AwaitFinder {
    fn visit_expr(&mut self, expr: &Expr) {
        if self.found {
            return;
        }
        if expr.is_await() {
            self.found = true;
            return;
        }
        walk_expr(self, expr);
    }
}

#[derive(Default)]
struct FreeSymbols {
    referenced: Vec<Symbol>,
    seen: FxHashSet<SymbolId>,
    introduced: FxHashSet<SymbolId>,
}

impl Visitor for FreeSymbols {
    fn visit_binding(&mut self, binding: &Binding) {
        self.introduced.insert(binding.id());
    }

    fn visit_symbol(&mut self, symbol: &Symbol) {
        if self.seen.insert(symbol.id) {
            self.referenced.push(symbol.clone());
        }
    }
}
