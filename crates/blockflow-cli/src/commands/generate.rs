//! Program generation command.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use blockflow_codegen::Generator;
use blockflow_graph::validate;
use blockflow_registry::DefinitionRegistry;
use clap::Args;

use super::common::load_graph;

#[derive(Args)]
pub struct GenerateArgs {
    /// Graph document
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Target language (ref, python, cpp); overrides the graph's options
    #[arg(short, long)]
    target: Option<String>,

    /// Directory to write the program into
    #[arg(short, long, value_name = "DIR", conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Print the program instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Do not print validation warnings
    #[arg(long)]
    allow_warnings: bool,
}

pub fn run(args: GenerateArgs, registry: Arc<DefinitionRegistry>) -> anyhow::Result<()> {
    let mut graph = load_graph(&args.graph, registry)?;
    if let Some(target) = &args.target {
        let mut options = graph.options().clone();
        options.target.clone_from(target);
        graph.set_options(options);
    }
    let generator = Generator::for_target(&graph.options().target)?;

    let report = validate(&mut graph);
    if !report.is_valid() {
        eprint!("{report}");
        bail!(
            "'{}' has {} validation error(s); nothing generated",
            args.graph.display(),
            report.errors().count()
        );
    }
    if !args.allow_warnings {
        for warning in report.warnings() {
            eprintln!("{warning}");
        }
    }

    let program = generator.generate(&mut graph)?;
    if args.stdout {
        print!("{}", program.text);
        return Ok(());
    }

    let dir = args.output.unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create '{}'", dir.display()))?;
    let path = dir.join(&program.file_name);
    fs::write(&path, &program.text)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
