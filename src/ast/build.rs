//! Constructors for building trees in code.
//!
//! The parser produces spans; trees built here carry dummy spans.

use super::*;
use crate::span::Spanned;

impl Block {
    pub fn new(stmts: Vec<Spanned<Stmt>>) -> Self {
        Self { stmts }
    }
}

impl Expr {
    pub fn int(value: i64) -> Spanned<Expr> {
        Spanned::dummy(Expr::Int(value))
    }

    pub fn double(value: f64) -> Spanned<Expr> {
        Spanned::dummy(Expr::Double(value))
    }

    /// String literal from its *contents*; quotes and escapes are added.
    pub fn string(contents: &str) -> Spanned<Expr> {
        Spanned::dummy(Expr::Str(literal::quote(contents)))
    }

    pub fn ident(name: &str) -> Spanned<Expr> {
        Spanned::dummy(Expr::Ident(name.to_string()))
    }

    pub fn call(callee: &str, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Call {
            callee: Spanned::dummy(callee.to_string()),
            args,
        })
    }

    pub fn binary(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(op: UnaryOp, operand: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn invert(operand: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Invert(Box::new(operand)))
    }

    pub fn assign(target: &str, value: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Assign {
            target: Spanned::dummy(target.to_string()),
            value: Box::new(value),
        })
    }
}

impl Stmt {
    pub fn var(ty: &str, name: &str, init: Option<Spanned<Expr>>) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::VarDecl(VarDecl {
            ty: Spanned::dummy(ty.to_string()),
            name: Spanned::dummy(name.to_string()),
            init,
        }))
    }

    /// `params` are `(type, name)` pairs.
    pub fn func(
        name: &str,
        params: &[(&str, &str)],
        return_ty: &str,
        body: Vec<Spanned<Stmt>>,
    ) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::FnDecl(FnDecl {
            name: Spanned::dummy(name.to_string()),
            params: params
                .iter()
                .map(|(ty, name)| Param {
                    ty: Spanned::dummy(ty.to_string()),
                    name: Spanned::dummy(name.to_string()),
                })
                .collect(),
            return_ty: Spanned::dummy(return_ty.to_string()),
            body: Block::new(body),
        }))
    }

    pub fn if_else(
        cond: Spanned<Expr>,
        then_stmts: Vec<Spanned<Stmt>>,
        else_stmts: Option<Vec<Spanned<Stmt>>>,
    ) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::If {
            cond,
            then_block: Block::new(then_stmts),
            else_block: else_stmts.map(Block::new),
        })
    }

    pub fn ret(value: Spanned<Expr>) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::Return(value))
    }

    pub fn expr(expr: Spanned<Expr>) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::Expr(expr))
    }

    pub fn block(stmts: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::Block(Block::new(stmts)))
    }
}
