//! Compact source-like rendering of tree nodes

use super::*;

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Unit => write!(f, "()"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Str(s) => write!(f, "\"{}\"", s.escape_default()),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Concat => "++",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "&&"),
            LogicalOp::Or => write!(f, "||"),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Literal(lit) => write!(f, "{}", lit),
            Pattern::Bind(binding) => write!(f, "{}", binding.symbol),
        }
    }
}

/// Wraps compound operands in parentheses
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            ExprKind::Literal(_)
            | ExprKind::Var(_)
            | ExprKind::Global(_)
            | ExprKind::Call { .. }
            | ExprKind::Block(_) => write!(f, "{}", self.0),
            _ => write!(f, "({})", self.0),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::Var(symbol) => write!(f, "{}", symbol),
            ExprKind::Global(name) => write!(f, "{}", name),
            ExprKind::Unary { op, operand } => write!(f, "{}{}", op, Operand(operand)),
            ExprKind::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), op, Operand(rhs))
            }
            ExprKind::Logical { op, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), op, Operand(rhs))
            }
            ExprKind::Call { callee, args } => {
                write!(f, "{}(", Operand(callee))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if arg.is_by_name() {
                        write!(f, "=> ")?;
                    }
                    write!(f, "{}", arg.value)?;
                }
                write!(f, ")")
            }
            ExprKind::Lambda(lambda) => {
                write!(f, "|")?;
                for (i, param) in lambda.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param.symbol)?;
                }
                write!(f, "| {}", lambda.body)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {} {} else {}", cond, then_branch, else_branch),
            ExprKind::Match { scrutinee, arms } => {
                write!(f, "match {} {{ ", scrutinee)?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arm.pattern)?;
                    if let Some(guard) = &arm.guard {
                        write!(f, " if {}", guard)?;
                    }
                    write!(f, " => {}", arm.body)?;
                }
                write!(f, " }}")
            }
            ExprKind::Block(block) => write!(f, "{}", block),
            ExprKind::Await { future, .. } => write!(f, "await {}", Operand(future)),
            ExprKind::Try { body, handler } => write!(
                f,
                "try {} catch {} {}",
                body, handler.binding.symbol, handler.body
            ),
            ExprKind::Throw(value) => write!(f, "throw {}", Operand(value)),
            ExprKind::While { cond, body } => write!(f, "while {} {}", cond, body),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Let { binding, init } => {
                let keyword = if binding.mutable { "let mut" } else { "let" };
                write!(f, "{} {} = {}", keyword, binding.symbol, init)
            }
            StmtKind::Assign { target, value } => write!(f, "{} = {}", target, value),
            StmtKind::Expr(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for stmt in &self.stmts {
            write!(f, "{}; ", stmt)?;
        }
        write!(f, "{} }}", self.result)
    }
}
