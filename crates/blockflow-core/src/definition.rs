//! Block definitions: the immutable templates blocks are instantiated from.
//!
//! A [`BlockDefinition`] declares a block type's parameters, its input and
//! output ports, and one [`TemplateSet`] per code-generation target. Definitions
//! are normally loaded from description files by the registry crate, but can
//! also be built in code:
//!
//! ```rust
//! use blockflow_core::{BlockDefinition, BlockKind, ParamDefinition, ParamType, PortDefinition};
//!
//! let def = BlockDefinition::new("const_source", BlockKind::Block)
//!     .with_label("Constant Source")
//!     .with_param(ParamDefinition::new("value", ParamType::Real, "0"))
//!     .with_output(PortDefinition::stream("out", "float"))
//!     .with_make("ref", "const_source(value=${value})");
//!
//! assert_eq!(def.max_ports(blockflow_core::Direction::Output), 1);
//! assert!(!def.evaluatable);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::check::{CheckContext, CustomValidator, DeclarativeChecks, Finding};
use crate::template::TemplateRenderer;

/// What role a block plays in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// An ordinary processing block.
    #[default]
    Block,
    /// A named value other expressions may reference.
    Variable,
    /// A named value exposed as a program parameter.
    Parameter,
    /// A block that observes a stream at run time. Emitted after other blocks.
    Probe,
}

impl BlockKind {
    /// Whether blocks of this kind are evaluatable unless a definition says
    /// otherwise.
    pub fn default_evaluatable(self) -> bool {
        matches!(self, BlockKind::Variable | BlockKind::Parameter)
    }

    /// Lowercase name as written in description files.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Block => "block",
            BlockKind::Variable => "variable",
            BlockKind::Parameter => "parameter",
            BlockKind::Probe => "probe",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Any expression that evaluates.
    #[default]
    Raw,
    /// An integral number.
    Int,
    /// Any number.
    Real,
    /// Free text, not evaluated.
    String,
    /// A boolean.
    Bool,
    /// One of a fixed set of option keys.
    Enum,
    /// A list of integral numbers.
    IntVector,
    /// A list of numbers.
    RealVector,
    /// An identifier.
    Id,
}

impl ParamType {
    /// Name as written in description files.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Raw => "raw",
            ParamType::Int => "int",
            ParamType::Real => "real",
            ParamType::String => "string",
            ParamType::Bool => "bool",
            ParamType::Enum => "enum",
            ParamType::IntVector => "int_vector",
            ParamType::RealVector => "real_vector",
            ParamType::Id => "id",
        }
    }

    /// Whether values of this type are expressions that need evaluating.
    ///
    /// Enum keys, identifiers and strings are taken literally.
    pub fn is_evaluated(self) -> bool {
        !matches!(self, ParamType::String | ParamType::Enum | ParamType::Id)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One choice of an enumerated parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamOption {
    /// Stored value.
    pub key: String,
    /// Display name.
    pub label: String,
    /// Auxiliary attributes, reachable through `${param.attr}` placeholders.
    pub attributes: BTreeMap<String, String>,
}

impl ParamOption {
    /// Creates an option whose label equals its key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Adds an auxiliary attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Declaration of one configurable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDefinition {
    /// Identifier, unique within the block.
    pub id: String,
    /// Display name.
    pub label: String,
    /// Declared type.
    pub dtype: ParamType,
    /// Default expression.
    pub default: String,
    /// Choices for [`ParamType::Enum`] parameters, in declaration order.
    pub options: Vec<ParamOption>,
}

impl ParamDefinition {
    /// Creates a parameter whose label equals its id.
    pub fn new(id: impl Into<String>, dtype: ParamType, default: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            dtype,
            default: default.into(),
            options: Vec::new(),
        }
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Appends an enumerated option.
    pub fn with_option(mut self, option: ParamOption) -> Self {
        self.options.push(option);
        self
    }

    /// Looks up an option by key.
    pub fn option(&self, key: &str) -> Option<&ParamOption> {
        self.options.iter().find(|o| o.key == key)
    }
}

/// Kind of data a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDomain {
    /// Continuous sample streams.
    #[default]
    Stream,
    /// Asynchronous messages.
    Message,
}

impl PortDomain {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            PortDomain::Stream => "stream",
            PortDomain::Message => "message",
        }
    }
}

impl fmt::Display for PortDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port direction. Which list a port sits in decides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sink side.
    Input,
    /// Source side.
    Output,
}

/// Wildcard dtype: compatible with any other dtype.
pub const WILDCARD_DTYPE: &str = "*";

/// Declaration of one logical port.
///
/// A logical port expands into `multiplicity` physical ports once its
/// multiplicity expression is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDefinition {
    /// Display name, unique within its direction.
    pub label: String,
    /// Stream or message.
    pub domain: PortDomain,
    /// Element type. May contain placeholders.
    pub dtype: String,
    /// Vector length expression.
    pub vlen: String,
    /// Multiplicity expression.
    pub multiplicity: String,
    /// Smallest allowed multiplicity.
    pub min_streams: usize,
    /// Largest allowed multiplicity.
    pub max_streams: usize,
    /// Whether the port may stay unconnected.
    pub optional: bool,
}

impl PortDefinition {
    /// A single stream port.
    pub fn stream(label: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            domain: PortDomain::Stream,
            dtype: dtype.into(),
            vlen: "1".to_string(),
            multiplicity: "1".to_string(),
            min_streams: 1,
            max_streams: 1,
            optional: false,
        }
    }

    /// A single message port. Message ports are optional by default.
    pub fn message(label: impl Into<String>) -> Self {
        Self {
            domain: PortDomain::Message,
            optional: true,
            ..Self::stream(label, "message")
        }
    }

    /// Sets the vector length expression.
    pub fn with_vlen(mut self, vlen: impl Into<String>) -> Self {
        self.vlen = vlen.into();
        self
    }

    /// Sets the multiplicity expression and its allowed range.
    pub fn with_multiplicity(mut self, expr: impl Into<String>, min: usize, max: usize) -> Self {
        self.multiplicity = expr.into();
        self.min_streams = min;
        self.max_streams = max;
        self
    }

    /// Marks the port optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Code templates for one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateSet {
    /// Import lines this block needs.
    pub imports: Vec<String>,
    /// Instantiation text.
    pub make: String,
    /// Setter statements re-run when referenced variables change.
    pub callbacks: Vec<String>,
}

impl TemplateSet {
    /// A template with only instantiation text.
    pub fn make(make: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            ..Self::default()
        }
    }
}

/// Immutable description of a block type.
#[derive(Clone)]
pub struct BlockDefinition {
    /// Registry key.
    pub id: String,
    /// Display name.
    pub label: String,
    /// Category path, outermost first.
    pub category: Vec<String>,
    /// Role of the block.
    pub kind: BlockKind,
    /// Whether instances contribute a named value to the namespace.
    pub evaluatable: bool,
    /// Parameter holding an evaluatable block's expression.
    pub value_param: String,
    /// Parameters in declaration order.
    pub params: Vec<ParamDefinition>,
    /// Input ports in declaration order.
    pub inputs: Vec<PortDefinition>,
    /// Output ports in declaration order.
    pub outputs: Vec<PortDefinition>,
    /// Free-form documentation.
    pub documentation: String,
    /// Declarative parameter checks.
    pub checks: Vec<crate::check::Check>,
    /// Templates keyed by target name.
    pub templates: BTreeMap<String, TemplateSet>,
    /// Optional extra validation.
    pub validator: Option<Arc<dyn CustomValidator>>,
    /// Optional custom emission.
    pub renderer: Option<Arc<dyn TemplateRenderer>>,
}

impl BlockDefinition {
    /// Creates an empty definition of the given kind.
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            category: Vec::new(),
            kind,
            evaluatable: kind.default_evaluatable(),
            value_param: "value".to_string(),
            params: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            documentation: String::new(),
            checks: Vec::new(),
            templates: BTreeMap::new(),
            validator: None,
            renderer: None,
        }
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the category path from a `/`-separated string.
    pub fn with_category(mut self, path: &str) -> Self {
        self.category = split_category(path);
        self
    }

    /// Overrides the evaluatable tag.
    pub fn with_evaluatable(mut self, evaluatable: bool) -> Self {
        self.evaluatable = evaluatable;
        self
    }

    /// Appends a parameter.
    pub fn with_param(mut self, param: ParamDefinition) -> Self {
        self.params.push(param);
        self
    }

    /// Appends an input port.
    pub fn with_input(mut self, port: PortDefinition) -> Self {
        self.inputs.push(port);
        self
    }

    /// Appends an output port.
    pub fn with_output(mut self, port: PortDefinition) -> Self {
        self.outputs.push(port);
        self
    }

    /// Sets the template set for `target`.
    pub fn with_template(mut self, target: impl Into<String>, template: TemplateSet) -> Self {
        self.templates.insert(target.into(), template);
        self
    }

    /// Shorthand for a template with instantiation text only.
    pub fn with_make(self, target: impl Into<String>, make: impl Into<String>) -> Self {
        self.with_template(target, TemplateSet::make(make))
    }

    /// Appends a declarative check.
    pub fn with_check(mut self, check: crate::check::Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Looks up a parameter by id.
    pub fn param(&self, id: &str) -> Option<&ParamDefinition> {
        self.params.iter().find(|p| p.id == id)
    }

    /// Ports on one side.
    pub fn ports(&self, direction: Direction) -> &[PortDefinition] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Largest number of physical ports the side can ever expose: the sum of
    /// every logical port's `max_streams`, saturating at `usize::MAX`.
    pub fn max_ports(&self, direction: Direction) -> usize {
        self.ports(direction)
            .iter()
            .fold(0, |total: usize, p| total.saturating_add(p.max_streams))
    }

    /// Template set for `target`, if the block supports it.
    pub fn template(&self, target: &str) -> Option<&TemplateSet> {
        self.templates.get(target)
    }

    /// Category path joined with `/`.
    pub fn category_path(&self) -> String {
        self.category.join("/")
    }

    /// Runs the declarative checks, then the attached validator if any.
    pub fn run_checks(&self, ctx: &CheckContext<'_>) -> Vec<Finding> {
        let mut findings = DeclarativeChecks(&self.checks).check(ctx);
        if let Some(validator) = &self.validator {
            findings.extend(validator.check(ctx));
        }
        findings
    }
}

/// Splits a `/`-separated category path, dropping empty segments.
pub fn split_category(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl fmt::Debug for BlockDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDefinition")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("evaluatable", &self.evaluatable)
            .field("params", &self.params.len())
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("targets", &self.templates.keys().collect::<Vec<_>>())
            .field("validator", &self.validator.is_some())
            .field("renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

/// Structural equality. Attached capabilities compare by presence only.
impl PartialEq for BlockDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.label == other.label
            && self.category == other.category
            && self.kind == other.kind
            && self.evaluatable == other.evaluatable
            && self.value_param == other.value_param
            && self.params == other.params
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.documentation == other.documentation
            && self.checks == other.checks
            && self.templates == other.templates
            && self.validator.is_some() == other.validator.is_some()
            && self.renderer.is_some() == other.renderer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluatable_defaults_from_kind() {
        assert!(BlockDefinition::new("v", BlockKind::Variable).evaluatable);
        assert!(BlockDefinition::new("p", BlockKind::Parameter).evaluatable);
        assert!(!BlockDefinition::new("b", BlockKind::Block).evaluatable);
        assert!(!BlockDefinition::new("p", BlockKind::Probe).evaluatable);
        assert!(
            BlockDefinition::new("b", BlockKind::Block)
                .with_evaluatable(true)
                .evaluatable
        );
    }

    #[test]
    fn test_max_ports_sums_max_streams() {
        let def = BlockDefinition::new("mux", BlockKind::Block)
            .with_input(PortDefinition::stream("in", "float").with_multiplicity("n", 1, 4))
            .with_input(PortDefinition::message("cmd"));
        assert_eq!(def.max_ports(Direction::Input), 5);
        assert_eq!(def.max_ports(Direction::Output), 0);
    }

    #[test]
    fn test_max_ports_saturates() {
        let def = BlockDefinition::new("wide", BlockKind::Block)
            .with_input(PortDefinition::stream("a", "float").with_multiplicity("n", 0, usize::MAX))
            .with_input(PortDefinition::stream("b", "float").with_multiplicity("n", 0, usize::MAX));
        assert_eq!(def.max_ports(Direction::Input), usize::MAX);
    }

    #[test]
    fn test_category_paths_split_and_join() {
        let def = BlockDefinition::new("x", BlockKind::Block).with_category("/Sources/ Waveform /");
        assert_eq!(def.category, vec!["Sources", "Waveform"]);
        assert_eq!(def.category_path(), "Sources/Waveform");
    }

    #[test]
    fn test_option_lookup() {
        let param = ParamDefinition::new("type", ParamType::Enum, "float")
            .with_option(ParamOption::new("float").with_attribute("size", "4"))
            .with_option(ParamOption::new("int"));
        assert_eq!(
            param.option("float").and_then(|o| o.attributes.get("size")),
            Some(&"4".to_string())
        );
        assert!(param.option("complex").is_none());
    }

    #[test]
    fn test_message_ports_are_optional() {
        let port = PortDefinition::message("cmd");
        assert_eq!(port.domain, PortDomain::Message);
        assert!(port.optional);
    }

    #[test]
    fn test_string_like_types_are_not_evaluated() {
        assert!(!ParamType::String.is_evaluated());
        assert!(!ParamType::Enum.is_evaluated());
        assert!(!ParamType::Id.is_evaluated());
        assert!(ParamType::RealVector.is_evaluated());
    }
}
