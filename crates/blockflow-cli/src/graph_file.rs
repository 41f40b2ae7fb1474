//! Graph documents: the TOML form of a flow graph read by the CLI.
//!
//! ```toml
//! [options]
//! id = "tone"
//! target = "python"
//!
//! [[blocks]]
//! id = "samp_rate"
//! type = "variable"
//! params = { value = "32000" }
//!
//! [[blocks]]
//! type = "sig_source"          # id assigned automatically (b1, b2, ...)
//! params = { freq = 440 }
//!
//! [[connections]]
//! from = "b1:0"
//! to = "b2:0"
//! ```
//!
//! Parameter values are expressions. Strings are taken verbatim; numbers,
//! booleans and arrays are written back out in expression syntax.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use blockflow_graph::{FlowGraph, GraphOptions};
use blockflow_registry::DefinitionRegistry;
use serde::Deserialize;

/// A parsed graph document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDocument {
    /// Graph-wide settings.
    #[serde(default)]
    pub options: GraphOptions,
    /// Blocks in insertion order.
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
    /// Connections in insertion order.
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

/// One `[[blocks]]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockEntry {
    /// Instance id. Assigned automatically when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Definition id.
    #[serde(rename = "type")]
    pub definition: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Parameter overrides.
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,
}

fn default_enabled() -> bool {
    true
}

/// One `[[connections]]` entry; endpoints are written `block:port`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionEntry {
    pub from: String,
    pub to: String,
}

/// Reads and parses a graph document.
pub fn load(path: &Path) -> anyhow::Result<GraphDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph '{}'", path.display()))?;
    parse(&text).with_context(|| format!("invalid graph '{}'", path.display()))
}

/// Parses a graph document from text.
pub fn parse(text: &str) -> anyhow::Result<GraphDocument> {
    Ok(toml::from_str(text)?)
}

impl GraphDocument {
    /// Builds the flow graph. Stops at the first block or connection the
    /// graph rejects.
    pub fn build(&self, registry: Arc<DefinitionRegistry>) -> anyhow::Result<FlowGraph> {
        let mut graph = FlowGraph::new(registry, self.options.clone());

        for (index, entry) in self.blocks.iter().enumerate() {
            let expressions: Vec<(&str, String)> = entry
                .params
                .iter()
                .map(|(param, value)| (param.as_str(), expression(value)))
                .collect();
            let overrides: Vec<(&str, &str)> = expressions
                .iter()
                .map(|(param, expr)| (*param, expr.as_str()))
                .collect();

            let id = match &entry.id {
                Some(id) => graph.add_block_with_id(&entry.definition, id, &overrides),
                None => graph.add_block(&entry.definition, &overrides),
            }
            .with_context(|| format!("block #{} ({})", index + 1, entry.definition))?
            .id()
            .to_string();

            if !entry.enabled {
                graph.set_enabled(&id, false)?;
            }
        }

        for entry in &self.connections {
            let (source, source_port) = endpoint(&entry.from)?;
            let (sink, sink_port) = endpoint(&entry.to)?;
            graph
                .connect(source, source_port, sink, sink_port)
                .with_context(|| format!("connection {} -> {}", entry.from, entry.to))?;
        }

        tracing::debug!(
            "graph_file: {} blocks, {} connections",
            graph.blocks().len(),
            graph.connections().len()
        );
        Ok(graph)
    }
}

/// Expression text for a TOML parameter value.
fn expression(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Splits `block:port`.
fn endpoint(text: &str) -> anyhow::Result<(&str, usize)> {
    let Some((block, port)) = text.rsplit_once(':') else {
        bail!("endpoint '{text}' must be written block:port");
    };
    let port = port
        .trim()
        .parse()
        .with_context(|| format!("endpoint '{text}' has an invalid port number"))?;
    Ok((block.trim(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(endpoint("b1:0").unwrap(), ("b1", 0));
        assert_eq!(endpoint(" src : 2 ").unwrap(), ("src", 2));
        assert!(endpoint("b1").is_err());
        assert!(endpoint("b1:x").is_err());
    }

    #[test]
    fn test_expression_from_toml_values() {
        assert_eq!(expression(&toml::Value::String("v1 + 1".into())), "v1 + 1");
        assert_eq!(expression(&toml::Value::Integer(440)), "440");
        assert_eq!(expression(&toml::Value::Float(0.5)), "0.5");
        assert_eq!(expression(&toml::Value::Boolean(true)), "true");
    }

    #[test]
    fn test_parse_document() {
        let doc = parse(
            r#"
            [options]
            id = "demo"

            [[blocks]]
            type = "sink"
            enabled = false

            [[blocks]]
            id = "v1"
            type = "variable"
            params = { value = 3 }

            [[connections]]
            from = "a:0"
            to = "b:0"
            "#,
        )
        .unwrap();
        assert_eq!(doc.options.id, "demo");
        assert_eq!(doc.options.target, "ref");
        assert_eq!(doc.blocks.len(), 2);
        assert!(!doc.blocks[0].enabled);
        assert_eq!(doc.blocks[1].id.as_deref(), Some("v1"));
        assert_eq!(doc.connections[0].from, "a:0");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse("[[blocks]]\ntype = \"sink\"\ncolour = \"red\"\n").is_err());
    }
}
