//! Blockflow CLI - inspect block libraries, validate graphs, generate programs.

mod commands;
mod graph_file;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockflow")]
#[command(author, version, about = "Blockflow graph compiler", long_about = None)]
struct Cli {
    /// Directory of block description files, searched before the defaults
    #[arg(long = "blocks-path", value_name = "DIR", global = true)]
    blocks_path: Vec<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List block definitions, or show one in detail
    Blocks(commands::blocks::BlocksArgs),

    /// Check a graph document and report every issue
    Validate(commands::validate::ValidateArgs),

    /// Show the evaluation order and values of a graph's variables
    Resolve(commands::resolve::ResolveArgs),

    /// Generate a program from a graph document
    Generate(commands::generate::GenerateArgs),
}

/// Logs go to stderr. `RUST_LOG` applies unless `-v` is given.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        1 => "info".into(),
        _ => "debug".into(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = commands::common::load_registry(&cli.blocks_path)?;

    match cli.command {
        Commands::Blocks(args) => commands::blocks::run(args, &registry),
        Commands::Validate(args) => commands::validate::run(args, registry),
        Commands::Resolve(args) => commands::resolve::run(args, registry),
        Commands::Generate(args) => commands::generate::run(args, registry),
    }
}
