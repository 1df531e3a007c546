use std::path::Path;

use crate::ast;
use crate::backend::{BackendError, CraneliftBackend};
use crate::diagnostic::Diagnostic;
use crate::runtime;
use crate::span::Span;

pub use crate::config::CompileOptions;
pub use crate::lower::{compile, Compiled};

#[cfg(test)]
mod tests;

/// Parse an AST exchanged with the parser as JSON.
pub fn parse_ast_json(text: &str) -> Result<ast::Block, Diagnostic> {
    serde_json::from_str(text).map_err(|err| {
        Diagnostic::error(format!("invalid AST: {}", err), Span::dummy()).with_note(format!(
            "at line {}, column {} of the AST file",
            err.line(),
            err.column()
        ))
    })
}

/// Read and parse an AST file.
pub fn load_ast(path: &Path) -> Result<ast::Block, Vec<Diagnostic>> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        vec![Diagnostic::error(
            format!("cannot read '{}': {}", path.display(), err),
            Span::dummy(),
        )]
    })?;
    parse_ast_json(&text).map_err(|diag| vec![diag])
}

/// Serialize an AST to the JSON exchange format.
///
/// JSON has no NaN or infinity, and serde_json writes them as `null`; such
/// a tree is rejected here instead of producing a file that cannot be read.
pub fn ast_to_json(root: &ast::Block) -> Result<String, Diagnostic> {
    let json = serde_json::to_string_pretty(root).map_err(|err| {
        Diagnostic::error(format!("cannot export AST: {}", err), Span::dummy())
    })?;
    parse_ast_json(&json).map_err(|diag| {
        Diagnostic::error(
            "cannot export AST: it does not survive a JSON round trip".to_string(),
            Span::dummy(),
        )
        .with_note(diag.message)
        .with_help("JSON cannot represent non-finite Double literals".to_string())
    })?;
    Ok(json)
}

/// Lower and JSON-parse in one step.
pub fn compile_json(text: &str, options: &CompileOptions) -> Result<Compiled, Vec<Diagnostic>> {
    let root = parse_ast_json(text).map_err(|diag| vec![diag])?;
    compile(&root, options)
}

/// Compile to a native object file.
pub fn build_object(
    root: &ast::Block,
    options: &CompileOptions,
) -> Result<Vec<u8>, Vec<Diagnostic>> {
    let compiled = compile(root, options)?;
    CraneliftBackend::new()
        .emit_object(&compiled.module)
        .map_err(|err| vec![backend_diagnostic(err)])
}

/// JIT-compile and run `main`.
pub fn run(compiled: &Compiled) -> Result<(), BackendError> {
    let program = CraneliftBackend::new().jit(&compiled.module)?;
    program.run_main()
}

/// Compile, run `main`, and return everything it printed.
pub fn run_captured(
    root: &ast::Block,
    options: &CompileOptions,
) -> Result<String, Vec<Diagnostic>> {
    let compiled = compile(root, options)?;
    let (result, output) = runtime::capture(|| run(&compiled));
    result.map_err(|err| vec![backend_diagnostic(err)])?;
    Ok(output)
}

pub fn backend_diagnostic(err: BackendError) -> Diagnostic {
    Diagnostic::error(err.to_string(), Span::dummy())
}
