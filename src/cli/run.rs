use std::path::PathBuf;
use std::process;

use clap::Args;

use sable::backend::CraneliftBackend;

use super::{compile_input, load_input};

#[derive(Args)]
pub struct RunArgs {
    /// Input AST file (JSON)
    pub input: PathBuf,
    /// Print the numbered lowering trace
    #[arg(short, long)]
    pub verbose: bool,
    /// Call this Int function after `main` and print its result
    #[arg(long, value_name = "NAME")]
    pub call: Option<String>,
    /// Arguments for --call (comma-separated integers)
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, requires = "call")]
    pub args: Vec<i64>,
    /// Source file the AST was parsed from, for diagnostics
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,
}

pub fn cmd_run(args: RunArgs) {
    let loaded = load_input(&args.input, args.source.as_deref());
    let compiled = compile_input(&loaded, args.verbose);

    let program = match CraneliftBackend::new().jit(&compiled.module) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = program.run_main() {
        eprintln!("error: {}", e);
        process::exit(1);
    }

    if let Some(name) = args.call {
        match program.call_int(&name, &args.args) {
            Ok(value) => println!("{}", value),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    }
}
