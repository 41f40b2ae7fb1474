//! Program emission.
//!
//! A generated program is a list of sections separated by blank lines:
//!
//! 1. header comments
//! 2. sorted, deduplicated imports
//! 3. `parameter` blocks, in resolver order
//! 4. other evaluatable blocks (variables), in resolver order
//! 5. remaining blocks by natural id order, probes last
//! 6. connections, in insertion order
//! 7. one setter section per evaluatable block that something depends on
//!
//! Disabled blocks, and connections touching them, are left out. Empty
//! sections are skipped.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use blockflow_core::template::referenced_params;
use blockflow_core::{
    BlockKind, PlaceholderRenderer, RenderContext, RenderError, TemplateRenderer, TemplateSet,
};
use blockflow_graph::ids::natural_cmp;
use blockflow_graph::{
    BlockInstance, FlowGraph, GraphError, ParamValues, Resolution, extract_references,
};

use crate::error::GenerationError;
use crate::profile::{TargetProfile, fill};

/// Emitted source text and the file name it should be written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    /// `{graph id}.{profile extension}`
    pub file_name: String,
    /// Full program text, ending with a newline.
    pub text: String,
}

/// Turns validated graphs into programs for one target.
#[derive(Debug, Clone)]
pub struct Generator {
    profile: TargetProfile,
}

impl Generator {
    /// Creates a generator for `profile`.
    pub fn new(profile: TargetProfile) -> Self {
        Self { profile }
    }

    /// Creates a generator for a built-in target.
    pub fn for_target(name: &str) -> Result<Self, GenerationError> {
        TargetProfile::builtin(name).map(Self::new)
    }

    /// The profile in use.
    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    /// Generates the program for `graph`.
    ///
    /// The graph should have passed validation; a parameter that failed to
    /// evaluate surfaces here as a missing placeholder. Output is a pure
    /// function of the graph's content, so regenerating an unchanged graph
    /// gives identical text.
    pub fn generate(&self, graph: &mut FlowGraph) -> Result<GeneratedProgram, GenerationError> {
        let resolution = graph.resolve()?;

        let enabled: Vec<String> = graph
            .blocks()
            .iter()
            .filter(|b| b.is_enabled())
            .map(|b| b.id().to_string())
            .collect();
        let mut params = BTreeMap::new();
        for id in enabled {
            let values = graph.evaluate_params(&id)?;
            params.insert(id, values);
        }

        let graph: &FlowGraph = graph;
        let emitter = Emitter {
            profile: &self.profile,
            graph,
            resolution: &resolution,
            params: &params,
        };

        let mut sections = vec![emitter.header(), emitter.imports()?];
        let (parameters, variables, others) = emitter.block_order();
        for group in [&parameters, &variables, &others] {
            sections.push(
                group
                    .iter()
                    .map(|&block| emitter.instance(block))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
        sections.push(emitter.connections());
        let setters = emitter.setter_sections(&others)?;
        let setter_count = setters.len();
        sections.extend(setters);

        let mut text = sections
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n");
        text.push('\n');

        let options = graph.options();
        tracing::info!(
            "generate: '{}' for target {} ({} blocks, {} connections, {} setters)",
            options.id,
            self.profile.name,
            params.len(),
            graph.enabled_connections().count(),
            setter_count
        );

        Ok(GeneratedProgram {
            file_name: format!("{}.{}", options.id, self.profile.extension),
            text,
        })
    }
}

/// Everything one generation pass reads, borrowed for its duration.
struct Emitter<'a> {
    profile: &'a TargetProfile,
    graph: &'a FlowGraph,
    resolution: &'a Resolution,
    params: &'a BTreeMap<String, ParamValues>,
}

impl<'a> Emitter<'a> {
    // --- Lookups ---

    fn template(&self, block: &'a BlockInstance) -> Result<&'a TemplateSet, GenerationError> {
        block
            .definition()
            .template(&self.profile.name)
            .ok_or_else(|| GenerationError::MissingTemplate {
                block: block.id().to_string(),
                target: self.profile.name.clone(),
            })
    }

    fn values(&self, block: &BlockInstance) -> Result<&'a ParamValues, GenerationError> {
        self.params
            .get(block.id())
            .ok_or_else(|| GraphError::UnknownBlock(block.id().to_string()).into())
    }

    fn context(&self, block: &'a BlockInstance) -> Result<RenderContext<'a>, GenerationError> {
        let values = self.values(block)?;
        Ok(RenderContext {
            block_id: block.id(),
            definition: block.definition(),
            target: &self.profile.name,
            expressions: &values.expressions,
            values: &values.values,
        })
    }

    fn renderer(block: &'a BlockInstance) -> &'a dyn TemplateRenderer {
        block
            .definition()
            .renderer
            .as_deref()
            .unwrap_or(&PlaceholderRenderer)
    }

    fn missing(block: &BlockInstance, err: RenderError) -> GenerationError {
        GenerationError::MissingPlaceholder {
            block: block.id().to_string(),
            placeholder: err.placeholder,
        }
    }

    // --- Sections ---

    fn header(&self) -> Vec<String> {
        let comment = &self.profile.comment;
        let options = self.graph.options();
        let mut lines = vec![format!("{comment} {}", options.id)];
        if !options.title.is_empty() {
            lines.push(format!("{comment} {}", options.title));
        }
        lines.push(format!(
            "{comment} generated by blockflow for target {}",
            self.profile.name
        ));
        lines
    }

    fn imports(&self) -> Result<Vec<String>, GenerationError> {
        let mut imports = BTreeSet::new();
        for block in self.graph.blocks().iter().filter(|b| b.is_enabled()) {
            imports.extend(self.template(block)?.imports.iter().cloned());
        }
        Ok(imports.into_iter().collect())
    }

    /// Splits enabled blocks into parameters, other evaluatable blocks and
    /// the rest, each in emission order.
    #[allow(clippy::type_complexity)]
    fn block_order(
        &self,
    ) -> (
        Vec<&'a BlockInstance>,
        Vec<&'a BlockInstance>,
        Vec<&'a BlockInstance>,
    ) {
        let graph = self.graph;
        let (parameters, variables): (Vec<_>, Vec<_>) = self
            .resolution
            .order()
            .iter()
            .filter_map(|id| graph.block(id))
            .partition(|b| b.kind() == BlockKind::Parameter);

        let dependencies = self.resolution.dependencies();
        let mut others: Vec<&BlockInstance> = graph
            .blocks()
            .iter()
            .filter(|b| b.is_enabled() && !dependencies.contains(b.id()))
            .collect();
        others.sort_by(|a, b| {
            (a.kind() == BlockKind::Probe)
                .cmp(&(b.kind() == BlockKind::Probe))
                .then_with(|| natural_cmp(a.id(), b.id()))
        });

        (parameters, variables, others)
    }

    fn instance(&self, block: &'a BlockInstance) -> Result<String, GenerationError> {
        let template = self.template(block)?;
        let make = Self::renderer(block)
            .render_make(&template.make, &self.context(block)?)
            .map_err(|err| Self::missing(block, err))?;
        Ok(fill(
            &self.profile.instance,
            &[("id", block.id()), ("make", make.as_str())],
        ))
    }

    fn connections(&self) -> Vec<String> {
        self.graph
            .enabled_connections()
            .map(|c| {
                let source_port = c.source_port.to_string();
                let sink_port = c.sink_port.to_string();
                fill(
                    &self.profile.connection,
                    &[
                        ("src", c.source.as_str()),
                        ("src_port", source_port.as_str()),
                        ("sink", c.sink.as_str()),
                        ("sink_port", sink_port.as_str()),
                    ],
                )
            })
            .collect()
    }

    /// One setter section per evaluatable block with something to update.
    ///
    /// A section re-invokes the setters of direct dependents only: a
    /// dependent reachable through another dependent is updated by that
    /// one's setter. It then re-runs every callback of `blocks` whose
    /// parameters reference the variable.
    fn setter_sections(
        &self,
        blocks: &[&'a BlockInstance],
    ) -> Result<Vec<Vec<String>>, GenerationError> {
        let dependencies = self.resolution.dependencies();
        let position: HashMap<&str, usize> = self
            .resolution
            .order()
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let indent = &self.profile.indent;

        let mut sections = Vec::new();
        for var in self.resolution.order() {
            let mut body = Vec::new();

            let dependents = dependencies.dependents(var);
            let mut direct: Vec<&str> = dependents
                .iter()
                .copied()
                .filter(|d| {
                    !dependents
                        .iter()
                        .any(|e| e != d && dependencies.reaches(e, d))
                })
                .collect();
            direct.sort_by_key(|d| position.get(d).copied().unwrap_or(usize::MAX));
            for dependent in direct {
                let expression = dependencies.expression(dependent).unwrap_or_default();
                body.push(format!(
                    "{indent}{}",
                    fill(
                        &self.profile.setter_call,
                        &[("var", dependent), ("expr", expression)]
                    )
                ));
            }

            let known = BTreeSet::from([var.clone()]);
            for &block in blocks {
                let values = self.values(block)?;
                let triggered = |callback: &str| {
                    referenced_params(callback).into_iter().any(|param| {
                        values
                            .expressions
                            .get(param)
                            .is_some_and(|e| !extract_references(e, &known).is_empty())
                    })
                };
                let template = self.template(block)?;
                for callback in template.callbacks.iter().filter(|c| triggered(c.as_str())) {
                    let line = Self::renderer(block)
                        .render_callback(callback, &self.context(block)?)
                        .map_err(|err| Self::missing(block, err))?;
                    body.push(format!("{indent}{line}"));
                }
            }

            if body.is_empty() {
                continue;
            }
            let vars = [("var", var.as_str())];
            let mut section = vec![fill(&self.profile.setter_open, &vars)];
            if !self.profile.setter_assign.is_empty() {
                section.push(format!(
                    "{indent}{}",
                    fill(&self.profile.setter_assign, &vars)
                ));
            }
            section.extend(body);
            if !self.profile.setter_close.is_empty() {
                section.push(fill(&self.profile.setter_close, &vars));
            }
            sections.push(section);
        }
        Ok(sections)
    }
}
