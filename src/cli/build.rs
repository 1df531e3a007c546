use std::path::PathBuf;
use std::process;

use clap::Args;

use sable::backend::CraneliftBackend;

use super::{compile_input, load_input};

#[derive(Args)]
pub struct BuildArgs {
    /// Input AST file (JSON)
    pub input: PathBuf,
    /// Output object file (default: <input>.o)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print the numbered lowering trace
    #[arg(short, long)]
    pub verbose: bool,
    /// Also write the textual IR next to the object file
    #[arg(long)]
    pub emit_ir: bool,
    /// Source file the AST was parsed from, for diagnostics
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,
}

pub fn cmd_build(args: BuildArgs) {
    let BuildArgs {
        input,
        output,
        verbose,
        emit_ir,
        source,
    } = args;
    let loaded = load_input(&input, source.as_deref());
    let compiled = compile_input(&loaded, verbose);

    let object = match CraneliftBackend::new().emit_object(&compiled.module) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let out_path = output.unwrap_or_else(|| input.with_extension("o"));
    if let Err(e) = std::fs::write(&out_path, &object) {
        eprintln!("error: cannot write '{}': {}", out_path.display(), e);
        process::exit(1);
    }
    eprintln!("Compiled -> {}", out_path.display());

    if emit_ir {
        let ir_path = out_path.with_extension("ir");
        if let Err(e) = std::fs::write(&ir_path, compiled.module.to_string()) {
            eprintln!("error: cannot write '{}': {}", ir_path.display(), e);
            process::exit(1);
        }
        eprintln!("IR -> {}", ir_path.display());
    }
}
