//! Human-readable names for AST nodes, used in diagnostics and the trace.

use std::fmt;

use super::{BinOp, Expr, Stmt, UnaryOp};

impl Expr {
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Int(_) => "Int literal",
            Expr::Double(_) => "Double literal",
            Expr::Str(_) => "String literal",
            Expr::Ident(_) => "variable",
            Expr::Call { .. } => "call",
            Expr::Binary { .. } => "binary expression",
            Expr::Unary { .. } => "unary expression",
            Expr::Invert(_) => "invert",
            Expr::Assign { .. } => "assignment",
        }
    }
}

impl Stmt {
    pub fn describe(&self) -> &'static str {
        match self {
            Stmt::VarDecl(_) => "variable declaration",
            Stmt::FnDecl(_) => "function declaration",
            Stmt::If { .. } => "conditional",
            Stmt::Return(_) => "return",
            Stmt::Expr(_) => "expression statement",
            Stmt::Block(_) => "block",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
