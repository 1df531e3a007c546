pub mod api;
pub mod ast;
pub mod backend;
pub mod config;
pub mod diagnostic;
pub mod ir;
pub mod lower;
pub mod runtime;
pub mod span;
pub mod trace;

pub use api::{build_object, compile_json, load_ast, parse_ast_json, run, run_captured};
pub use config::CompileOptions;
pub use diagnostic::Diagnostic;
pub use lower::{compile, Compiled};
