//! Graph validation command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use blockflow_graph::validate;
use blockflow_registry::DefinitionRegistry;
use clap::{Args, ValueEnum};

use super::common::load_graph;

/// Report output formats.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ReportFormat {
    /// One line per issue
    #[default]
    Text,
    /// The full report as JSON
    Json,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Graph document
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

pub fn run(args: ValidateArgs, registry: Arc<DefinitionRegistry>) -> anyhow::Result<()> {
    let mut graph = load_graph(&args.graph, registry)?;
    let report = validate(&mut graph);
    let errors = report.errors().count();

    match args.format {
        ReportFormat::Text => {
            if report.is_empty() {
                println!("{}: no issues", args.graph.display());
            } else {
                print!("{report}");
                println!(
                    "{}: {errors} error(s), {} warning(s)",
                    args.graph.display(),
                    report.warnings().count()
                );
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if errors > 0 {
        bail!("validation failed with {errors} error(s)");
    }
    Ok(())
}
