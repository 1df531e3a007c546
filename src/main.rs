mod cli;

use clap::{Parser, Subcommand};

use cli::build::BuildArgs;
use cli::ir::IrArgs;
use cli::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "sable",
    version,
    about = "Sable compiler: lowers a parsed program to native code"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an AST file to a native object file
    Build(BuildArgs),
    /// Compile an AST file and run it in process
    Run(RunArgs),
    /// Print the lowered IR of an AST file
    Ir(IrArgs),
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Run(args) => cli::run::cmd_run(args),
        Command::Ir(args) => cli::ir::cmd_ir(args),
    }
}
