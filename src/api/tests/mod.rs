
use crate::ast::Block;
use crate::span::Spanned;
use crate::{api, ast, CompileOptions};

pub(super) fn program(stmts: Vec<Spanned<ast::Stmt>>) -> Block {
    Block::new(stmts)
}

pub(super) fn run(stmts: Vec<Spanned<ast::Stmt>>) -> String {
    api::run_captured(&program(stmts), &CompileOptions::default()).unwrap_or_else(|diags| {
        panic!(
            "program should run, got {:?}",
            diags.iter().map(|d| &d.message).collect::<Vec<_>>()
        )
    })
}
