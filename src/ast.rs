//! Abstract syntax tree handed over by the parser.
//!
//! The tree is immutable once built. Lowering reads it by reference; the only
//! rewrite (`invert`) is a pure function that returns a fresh node.

pub mod build;
pub mod display;
pub mod invert;
pub mod literal;

use serde::{Deserialize, Serialize};

use crate::span::Spanned;

/// An ordered sequence of statements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// Statements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    FnDecl(FnDecl),
    If {
        cond: Spanned<Expr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    Return(Spanned<Expr>),
    Expr(Spanned<Expr>),
    /// A nested `{ ... }` block. Shares the enclosing scope frame.
    Block(Block),
}

/// `Int x = 5;`. The type is a name resolved at lowering time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: Spanned<String>,
    pub name: Spanned<String>,
    pub init: Option<Spanned<Expr>>,
}

/// `name(Int a, Int b) -> Int { ... }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub return_ty: Spanned<String>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub ty: Spanned<String>,
    pub name: Spanned<String>,
}

/// Expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Int(i64),
    Double(f64),
    /// Raw lexeme, delimiting quotes and escape sequences included.
    Str(String),
    Ident(String),
    Call {
        callee: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Invert(Box<Spanned<Expr>>),
    Assign {
        target: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
    Eq,  // ==
    Lt,  // <
    Gt,  // >
    Le,  // <=
    Ge,  // >=
    Ne,  // !=
    Pow, // **
    And, // &&
    Or,  // ||
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Ne => "!=",
            BinOp::Pow => "**",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Increment, // ++
    Decrement, // --
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
        }
    }
}
