//! Variable resolution command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use blockflow_registry::DefinitionRegistry;
use clap::Args;

use super::common::load_graph;

#[derive(Args)]
pub struct ResolveArgs {
    /// Graph document
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,
}

pub fn run(args: ResolveArgs, registry: Arc<DefinitionRegistry>) -> anyhow::Result<()> {
    let mut graph = load_graph(&args.graph, registry)?;
    let resolution = graph
        .resolve()
        .with_context(|| format!("cannot resolve '{}'", args.graph.display()))?;

    let order = resolution.order();
    if order.is_empty() {
        println!("{}: no variables", args.graph.display());
        return Ok(());
    }

    let width = order.iter().map(String::len).max().unwrap_or(0);
    for id in order {
        let expression = resolution
            .dependencies()
            .expression(id)
            .unwrap_or_default();
        match (resolution.value(id), resolution.failure(id)) {
            (Some(value), _) => {
                let value = value.to_string();
                println!("{id:width$} = {value:<12} {expression}");
            }
            (None, Some(err)) => println!("{id:width$} ! {err}"),
            (None, None) => println!("{id:width$} ?"),
        }
    }

    let failed = resolution.failures().len();
    if failed > 0 {
        bail!("{failed} variable(s) failed to evaluate");
    }
    Ok(())
}
