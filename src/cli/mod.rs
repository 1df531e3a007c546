pub mod build;
pub mod ir;
pub mod run;

use std::path::{Path, PathBuf};
use std::process;

use sable::diagnostic::{print_diagnostics, render_diagnostics, Diagnostic};
use sable::{ast, CompileOptions, Compiled};

/// Source text the AST was parsed from, used to render diagnostics.
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// A loaded AST with everything needed to compile and report on it.
pub struct LoadedInput {
    pub path: PathBuf,
    pub root: ast::Block,
    pub source: Option<SourceFile>,
}

impl LoadedInput {
    /// Module name derived from the input file stem.
    pub fn module_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string())
    }
}

/// Load the AST file and, when given, the source it was parsed from.
pub fn load_input(input: &Path, source: Option<&Path>) -> LoadedInput {
    let root = match sable::load_ast(input) {
        Ok(root) => root,
        Err(diags) => {
            print_diagnostics(&diags);
            process::exit(1);
        }
    };
    let source = source.map(|path| match std::fs::read_to_string(path) {
        Ok(text) => SourceFile {
            name: path.to_string_lossy().into_owned(),
            text,
        },
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    });
    LoadedInput {
        path: input.to_path_buf(),
        root,
        source,
    }
}

/// Print diagnostics against the source file when there is one.
pub fn report(diagnostics: &[Diagnostic], source: Option<&SourceFile>) {
    match source {
        Some(file) => render_diagnostics(diagnostics, &file.name, &file.text),
        None => print_diagnostics(diagnostics),
    }
}

/// Lower the input, printing the trace and warnings. Exits on errors.
pub fn compile_input(input: &LoadedInput, verbose: bool) -> Compiled {
    let options = CompileOptions::default()
        .with_module_name(&input.module_name())
        .with_verbose(verbose);
    match sable::compile(&input.root, &options) {
        Ok(compiled) => {
            for line in &compiled.trace {
                eprintln!("{}", line);
            }
            report(&compiled.warnings, input.source.as_ref());
            compiled
        }
        Err(diags) => {
            report(&diags, input.source.as_ref());
            let errors = diags.iter().filter(|d| d.is_error()).count();
            eprintln!(
                "error: could not compile '{}' due to {} error(s)",
                input.path.display(),
                errors
            );
            process::exit(1);
        }
    }
}
