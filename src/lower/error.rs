use thiserror::Error;

use crate::ast::BinOp;
use crate::diagnostic::Diagnostic;
use crate::ir::Type;
use crate::span::{Span, Spanned};

/// Errors raised while lowering one statement. Each aborts the statement;
/// lowering resumes at the next one.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LowerError {
    #[error("undeclared variable `{0}`")]
    UndeclaredVariable(String),

    #[error("undefined function `{0}`")]
    UndefinedFunction(String),

    #[error("operator `{0}` is not supported")]
    UnsupportedOperator(BinOp),

    #[error("invalid operand: {0}")]
    InvalidOperandKind(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error(
        "type mismatch in {context}: expected {}, found {}",
        .expected.source_name(),
        .found.source_name()
    )]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("`{name}` takes {expected} argument(s) but {found} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot assign to read-only variable `{0}`")]
    ReadOnlyAssignment(String),

    #[error("function `{0}` is already defined")]
    DuplicateFunction(String),

    #[error("function `{0}` does not return a value on every path")]
    MissingReturn(String),
}

pub type LowerResult<T> = Result<T, Spanned<LowerError>>;

impl LowerError {
    pub fn at(self, span: Span) -> Spanned<LowerError> {
        Spanned::new(self, span)
    }

    fn help(&self) -> Option<String> {
        match self {
            LowerError::UndeclaredVariable(name) => {
                Some(format!("declare it first, e.g. `Int {} = 0;`", name))
            }
            LowerError::UndefinedFunction(_) => {
                Some("functions must be declared before they are called".to_string())
            }
            LowerError::UnsupportedOperator(_) => Some(
                "only + - * / % and comparisons are implemented".to_string(),
            ),
            LowerError::UnknownType(_) => {
                Some("known types are Int, Double and String".to_string())
            }
            LowerError::ReadOnlyAssignment(_) => {
                Some("String variables are bound once, at declaration".to_string())
            }
            LowerError::MissingReturn(_) => {
                Some("add a `return` at the end of the function body".to_string())
            }
            _ => None,
        }
    }
}

impl From<Spanned<LowerError>> for Diagnostic {
    fn from(err: Spanned<LowerError>) -> Self {
        let help = err.node.help();
        let diag = Diagnostic::error(err.node.to_string(), err.span);
        match help {
            Some(help) => diag.with_help(help),
            None => diag,
        }
    }
}
