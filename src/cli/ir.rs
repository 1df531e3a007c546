use std::path::PathBuf;

use clap::Args;

use super::{compile_input, load_input};

#[derive(Args)]
pub struct IrArgs {
    /// Input AST file (JSON)
    pub input: PathBuf,
    /// Print the numbered lowering trace
    #[arg(short, long)]
    pub verbose: bool,
    /// Print the module fingerprint after the IR
    #[arg(long)]
    pub fingerprint: bool,
    /// Source file the AST was parsed from, for diagnostics
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,
}

pub fn cmd_ir(args: IrArgs) {
    let loaded = load_input(&args.input, args.source.as_deref());
    let compiled = compile_input(&loaded, args.verbose);
    print!("{}", compiled.module);
    if args.fingerprint {
        println!("; fingerprint {}", compiled.module.fingerprint());
    }
}
