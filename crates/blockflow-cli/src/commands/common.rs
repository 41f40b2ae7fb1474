//! Loading shared by every command: the block library and graph documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use blockflow_graph::FlowGraph;
use blockflow_registry::DefinitionRegistry;
use blockflow_registry::paths::{BLOCKS_PATH_ENV, default_search_path};

use crate::graph_file;

/// Loads block definitions from the `--blocks-path` directories, then the
/// default search path. Files that fail to load are logged and skipped.
pub fn load_registry(explicit: &[PathBuf]) -> anyhow::Result<Arc<DefinitionRegistry>> {
    if let Some(dir) = explicit.iter().find(|d| !d.is_dir()) {
        bail!("blocks path '{}' is not a directory", dir.display());
    }

    let mut search = explicit.to_vec();
    search.extend(default_search_path());

    let mut registry = DefinitionRegistry::new();
    let report = registry.load_search_path(&search);
    if registry.is_empty() {
        bail!("no block definitions found; pass --blocks-path or set {BLOCKS_PATH_ENV}");
    }
    tracing::info!(
        definitions = registry.len(),
        skipped = report.errors.len(),
        "block library ready"
    );
    Ok(Arc::new(registry))
}

/// Reads a graph document and builds it against `registry`.
pub fn load_graph(path: &Path, registry: Arc<DefinitionRegistry>) -> anyhow::Result<FlowGraph> {
    graph_file::load(path)?
        .build(registry)
        .with_context(|| format!("failed to build graph '{}'", path.display()))
}
