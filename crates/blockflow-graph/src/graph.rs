//! The flow graph: block instances, connections and graph options.
//!
//! [`FlowGraph`] is the only mutable structure in the pipeline. Mutations
//! check their preconditions first and change nothing when they fail; every
//! one that succeeds invalidates the [`ResolutionCache`], so the next
//! [`resolve`](FlowGraph::resolve) sees the edited graph.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use blockflow_core::{BlockDefinition, BlockKind, Direction};
use blockflow_registry::DefinitionRegistry;
use serde::{Deserialize, Serialize};

use crate::cache::ResolutionCache;
use crate::error::{CyclicDependencyError, GraphError};
use crate::ids::is_valid_block_id;
use crate::params::{ParamValues, evaluate_block};
use crate::ports::{ResolvedPorts, resolve_ports};
use crate::resolver::{Resolution, run_pass};

/// One placed block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    id: String,
    definition: Arc<BlockDefinition>,
    params: BTreeMap<String, String>,
    enabled: bool,
}

impl BlockInstance {
    /// Unique instance id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The definition the block was instantiated from.
    pub fn definition(&self) -> &BlockDefinition {
        &self.definition
    }

    /// Shared handle to the definition.
    pub fn definition_arc(&self) -> &Arc<BlockDefinition> {
        &self.definition
    }

    /// The block's kind.
    pub fn kind(&self) -> BlockKind {
        self.definition.kind
    }

    /// Parameter expressions by id. Every declared parameter is present.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// The expression of one parameter.
    pub fn param(&self, param: &str) -> Option<&str> {
        self.params.get(param).map(String::as_str)
    }

    /// Whether the block takes part in validation and generation.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The expression of the value parameter. Empty when the definition
    /// declares no such parameter.
    pub fn value_expression(&self) -> &str {
        self.param(&self.definition.value_param).unwrap_or_default()
    }
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Connection {
    /// Source block id.
    pub source: String,
    /// Physical output index on the source.
    pub source_port: usize,
    /// Sink block id.
    pub sink: String,
    /// Physical input index on the sink.
    pub sink_port: usize,
}

impl Connection {
    /// Creates a connection.
    pub fn new(
        source: impl Into<String>,
        source_port: usize,
        sink: impl Into<String>,
        sink_port: usize,
    ) -> Self {
        Self {
            source: source.into(),
            source_port,
            sink: sink.into(),
            sink_port,
        }
    }

    /// Whether either end is `id`.
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.sink == id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source, self.source_port, self.sink, self.sink_port
        )
    }
}

/// Graph-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphOptions {
    /// Artifact name; the generated file is named after it.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Code generation target.
    pub target: String,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            id: "flowgraph".to_string(),
            title: String::new(),
            target: "ref".to_string(),
        }
    }
}

/// Per-block results the validator works from.
#[derive(Debug, Clone)]
pub(crate) struct BlockAnalysis {
    pub(crate) params: ParamValues,
    pub(crate) inputs: ResolvedPorts,
    pub(crate) outputs: ResolvedPorts,
}

impl BlockAnalysis {
    pub(crate) fn side(&self, direction: Direction) -> &ResolvedPorts {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }
}

/// A processing graph under construction.
#[derive(Debug)]
pub struct FlowGraph {
    registry: Arc<DefinitionRegistry>,
    options: GraphOptions,
    blocks: Vec<BlockInstance>,
    connections: Vec<Connection>,
    next_id: u64,
    cache: ResolutionCache,
}

impl FlowGraph {
    /// Creates an empty graph drawing definitions from `registry`.
    pub fn new(registry: Arc<DefinitionRegistry>, options: GraphOptions) -> Self {
        Self {
            registry,
            options,
            blocks: Vec::new(),
            connections: Vec::new(),
            next_id: 1,
            cache: ResolutionCache::default(),
        }
    }

    // --- Block mutations ---

    /// Places a block with an automatically assigned id (`b1`, `b2`, ...).
    ///
    /// Parameters not named in `overrides` take their defaults.
    pub fn add_block(
        &mut self,
        definition_id: &str,
        overrides: &[(&str, &str)],
    ) -> Result<&BlockInstance, GraphError> {
        let definition = self.instantiate(definition_id, overrides)?;
        let mut n = self.next_id;
        let id = loop {
            let candidate = format!("b{n}");
            n += 1;
            if self.position(&candidate).is_none() {
                break candidate;
            }
        };
        self.next_id = n;
        Ok(self.push_block(id, definition, overrides))
    }

    /// Places a block under an explicit id.
    pub fn add_block_with_id(
        &mut self,
        definition_id: &str,
        id: &str,
        overrides: &[(&str, &str)],
    ) -> Result<&BlockInstance, GraphError> {
        if !is_valid_block_id(id) {
            return Err(GraphError::InvalidBlockId(id.to_string()));
        }
        if self.position(id).is_some() {
            return Err(GraphError::DuplicateBlockId(id.to_string()));
        }
        let definition = self.instantiate(definition_id, overrides)?;
        Ok(self.push_block(id.to_string(), definition, overrides))
    }

    /// Looks up a definition and checks override names against it.
    fn instantiate(
        &self,
        definition_id: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Arc<BlockDefinition>, GraphError> {
        let definition = self
            .registry
            .get(definition_id)
            .map_err(|_| GraphError::UnknownBlock(definition_id.to_string()))?;
        if let Some((param, _)) = overrides.iter().find(|(p, _)| definition.param(p).is_none()) {
            return Err(GraphError::UnknownParam {
                block: definition_id.to_string(),
                param: (*param).to_string(),
            });
        }
        Ok(definition)
    }

    fn push_block(
        &mut self,
        id: String,
        definition: Arc<BlockDefinition>,
        overrides: &[(&str, &str)],
    ) -> &BlockInstance {
        let mut params: BTreeMap<String, String> = definition
            .params
            .iter()
            .map(|p| (p.id.clone(), p.default.clone()))
            .collect();
        for (param, expression) in overrides {
            params.insert((*param).to_string(), (*expression).to_string());
        }
        tracing::debug!("graph_add: {id} ({})", definition.id);
        self.blocks.push(BlockInstance {
            id,
            definition,
            params,
            enabled: true,
        });
        self.cache.invalidate();
        let index = self.blocks.len() - 1;
        &self.blocks[index]
    }

    /// Removes a block and every connection touching it. Returns false, and
    /// changes nothing, when there is no such block.
    pub fn remove_block(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.blocks.remove(index);
        self.connections.retain(|c| !c.touches(id));
        self.cache.invalidate();
        tracing::debug!("graph_remove: {id}");
        true
    }

    /// Sets one parameter expression.
    pub fn set_param(&mut self, id: &str, param: &str, expression: &str) -> Result<(), GraphError> {
        let index = self.index_of(id)?;
        let block = &mut self.blocks[index];
        let Some(slot) = block.params.get_mut(param) else {
            return Err(GraphError::UnknownParam {
                block: id.to_string(),
                param: param.to_string(),
            });
        };
        *slot = expression.to_string();
        self.cache.invalidate();
        tracing::debug!("graph_set_param: {id}.{param} = {expression}");
        Ok(())
    }

    /// Enables or disables a block.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        let index = self.index_of(id)?;
        self.blocks[index].enabled = enabled;
        self.cache.invalidate();
        tracing::debug!("graph_set_enabled: {id} = {enabled}");
        Ok(())
    }

    /// Replaces the graph options.
    pub fn set_options(&mut self, options: GraphOptions) {
        self.options = options;
        self.cache.invalidate();
    }

    // --- Connection mutations ---

    /// Connects output `source_port` of `source` to input `sink_port` of
    /// `sink`.
    ///
    /// Port indices are checked against the most physical ports each side
    /// can ever have; the validator later checks them against the resolved
    /// multiplicities.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: usize,
        sink: &str,
        sink_port: usize,
    ) -> Result<&Connection, GraphError> {
        let src = self.index_of(source)?;
        let dst = self.index_of(sink)?;

        let max = self.blocks[src].definition.max_ports(Direction::Output);
        if source_port >= max {
            return Err(GraphError::PortRange {
                block: source.to_string(),
                direction: Direction::Output,
                index: source_port,
                max,
            });
        }
        let max = self.blocks[dst].definition.max_ports(Direction::Input);
        if sink_port >= max {
            return Err(GraphError::PortRange {
                block: sink.to_string(),
                direction: Direction::Input,
                index: sink_port,
                max,
            });
        }
        if source == sink && source_port == sink_port {
            return Err(GraphError::SelfLoop {
                block: source.to_string(),
                port: source_port,
            });
        }

        let connection = Connection::new(source, source_port, sink, sink_port);
        let occupied = self.connections.iter().any(|c| {
            *c == connection
                || (c.sink == sink && c.sink_port == sink_port && self.is_connection_enabled(c))
        });
        if occupied {
            return Err(GraphError::PortInUse {
                block: sink.to_string(),
                port: sink_port,
            });
        }

        tracing::debug!("graph_connect: {connection}");
        self.connections.push(connection);
        self.cache.invalidate();
        let index = self.connections.len() - 1;
        Ok(&self.connections[index])
    }

    /// Removes one connection.
    pub fn disconnect(
        &mut self,
        source: &str,
        source_port: usize,
        sink: &str,
        sink_port: usize,
    ) -> Result<(), GraphError> {
        let target = Connection::new(source, source_port, sink, sink_port);
        let Some(index) = self.connections.iter().position(|c| *c == target) else {
            return Err(GraphError::NotConnected {
                source_block: target.source,
                source_port,
                sink_block: target.sink,
                sink_port,
            });
        };
        self.connections.remove(index);
        self.cache.invalidate();
        tracing::debug!("graph_disconnect: {target}");
        Ok(())
    }

    // --- Queries ---

    /// Looks up a block.
    pub fn block(&self, id: &str) -> Option<&BlockInstance> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    /// Connections in insertion order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// The expression of one parameter.
    pub fn param(&self, id: &str, param: &str) -> Result<&str, GraphError> {
        let block = self
            .block(id)
            .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
        block.param(param).ok_or_else(|| GraphError::UnknownParam {
            block: id.to_string(),
            param: param.to_string(),
        })
    }

    /// Graph options.
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// The registry blocks are instantiated from.
    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// The resolution cache.
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Whether the graph changed since the last resolution.
    pub fn is_dirty(&self) -> bool {
        !self.cache.is_valid()
    }

    /// A connection is enabled when both ends exist and are enabled.
    pub fn is_connection_enabled(&self, connection: &Connection) -> bool {
        let enabled = |id: &str| self.block(id).is_some_and(BlockInstance::is_enabled);
        enabled(connection.source.as_str()) && enabled(connection.sink.as_str())
    }

    /// Enabled connections in insertion order.
    pub fn enabled_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(|c| self.is_connection_enabled(c))
    }

    // --- Resolution ---

    /// Resolves every evaluatable block, reusing the cached result while the
    /// graph is unchanged.
    pub fn resolve(&mut self) -> Result<Arc<Resolution>, CyclicDependencyError> {
        let resolution = self.resolution();
        resolution.check()?;
        Ok(resolution)
    }

    /// The current resolution, even when it carries a cycle.
    pub(crate) fn resolution(&mut self) -> Arc<Resolution> {
        let blocks = &self.blocks;
        self.cache
            .get_or_resolve(|evaluator| run_pass(blocks, evaluator))
    }

    /// Evaluates every parameter of one block against the resolved namespace.
    pub fn evaluate_params(&mut self, id: &str) -> Result<ParamValues, GraphError> {
        let index = self.index_of(id)?;
        let resolution = self.resolve()?;
        Ok(evaluate_block(
            &self.blocks[index],
            &resolution,
            self.cache.evaluator_mut(),
        ))
    }

    /// Evaluates parameters and expands ports for every enabled block, in
    /// insertion order.
    pub(crate) fn analyze(&mut self) -> (Arc<Resolution>, BTreeMap<String, BlockAnalysis>) {
        let resolution = self.resolution();
        let target = self.options.target.as_str();
        let evaluator = self.cache.evaluator_mut();
        let mut out = BTreeMap::new();
        for block in self.blocks.iter().filter(|b| b.enabled) {
            let params = evaluate_block(block, &resolution, evaluator);
            let inputs = resolve_ports(block, Direction::Input, target, &params, &resolution, evaluator);
            let outputs =
                resolve_ports(block, Direction::Output, target, &params, &resolution, evaluator);
            out.insert(
                block.id.clone(),
                BlockAnalysis {
                    params,
                    inputs,
                    outputs,
                },
            );
        }
        (resolution, out)
    }

    // --- Internal helpers ---

    fn position(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    fn index_of(&self, id: &str) -> Result<usize, GraphError> {
        self.position(id)
            .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))
    }
}
