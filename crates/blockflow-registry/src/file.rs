//! Description file format.
//!
//! One block per `*.block.toml` file:
//!
//! ```toml
//! id = "const_source"
//! label = "Constant Source"
//! category = "Sources"
//! kind = "block"
//!
//! [[params]]
//! id = "value"
//! dtype = "real"
//! default = "0"
//!
//! [[params]]
//! id = "type"
//! dtype = "enum"
//! default = "float"
//! options = [
//!     { key = "float", attributes = { ctype = "float" } },
//!     "int",
//! ]
//!
//! [[outputs]]
//! label = "out"
//! dtype = "${type}"
//!
//! [[checks]]
//! param = "value"
//! rule = "range"
//! min = -1.0
//! max = 1.0
//! severity = "warning"
//!
//! [templates]
//! ref = "const_source(value=${value})"
//!
//! [templates.python]
//! imports = ["from blocks import const_source"]
//! make = "const_source(${value})"
//! callbacks = ["set_value(${value})"]
//! ```
//!
//! Unknown fields are rejected everywhere except inside `[[checks]]`.

use std::collections::{BTreeMap, HashSet};

use blockflow_core::{
    BlockDefinition, BlockKind, Check, ParamDefinition, ParamOption, ParamType, PortDefinition,
    PortDomain, TemplateSet, split_category,
};
use serde::{Deserialize, Serialize};

use crate::error::DefinitionErrorKind;

fn default_one() -> String {
    "1".to_string()
}

fn default_streams() -> usize {
    1
}

#[allow(clippy::ptr_arg)]
fn is_one(s: &String) -> bool {
    s == "1"
}

fn is_one_usize(n: &usize) -> bool {
    *n == 1
}

/// Top-level table of a description file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct BlockFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluatable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_param: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<PortEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PortEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Check>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<String, TemplateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ParamEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub dtype: ParamType,
    #[serde(default)]
    pub default: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,
}

/// An enum option, either a bare key or a full table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum OptionEntry {
    Key(String),
    Full(OptionTable),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct OptionTable {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct PortEntry {
    pub label: String,
    #[serde(default)]
    pub domain: PortDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub vlen: String,
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub multiplicity: String,
    #[serde(default = "default_streams", skip_serializing_if = "is_one_usize")]
    pub min_streams: usize,
    #[serde(default = "default_streams", skip_serializing_if = "is_one_usize")]
    pub max_streams: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// A target template: bare instantiation text or a full table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum TemplateEntry {
    Make(String),
    Full(TemplateTable),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct TemplateTable {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default)]
    pub make: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callbacks: Vec<String>,
}

/// A structural violation and the field path it was found at.
pub(crate) type Located = (String, DefinitionErrorKind);

impl BlockFile {
    /// Converts the file into a definition. Structural checks are left to
    /// [`check_definition`].
    pub fn into_definition(self) -> BlockDefinition {
        let mut def = BlockDefinition::new(self.id, self.kind);
        if let Some(label) = self.label {
            def.label = label;
        }
        def.category = split_category(&self.category);
        if let Some(evaluatable) = self.evaluatable {
            def.evaluatable = evaluatable;
        }
        if let Some(value_param) = self.value_param {
            def.value_param = value_param;
        }
        def.documentation = self.documentation;
        def.params = self.params.into_iter().map(ParamEntry::into_param).collect();
        def.inputs = self.inputs.into_iter().map(PortEntry::into_port).collect();
        def.outputs = self.outputs.into_iter().map(PortEntry::into_port).collect();
        def.checks = self.checks;
        def.templates = self
            .templates
            .into_iter()
            .map(|(target, entry)| (target, entry.into_template_set()))
            .collect();
        def
    }

    /// Describes an in-memory definition in file form.
    pub fn from_definition(def: &BlockDefinition) -> Self {
        Self {
            id: def.id.clone(),
            label: (def.label != def.id).then(|| def.label.clone()),
            category: def.category_path(),
            kind: def.kind,
            evaluatable: (def.evaluatable != def.kind.default_evaluatable())
                .then_some(def.evaluatable),
            value_param: (def.value_param != "value").then(|| def.value_param.clone()),
            documentation: def.documentation.clone(),
            params: def.params.iter().map(ParamEntry::from_param).collect(),
            inputs: def.inputs.iter().map(PortEntry::from_port).collect(),
            outputs: def.outputs.iter().map(PortEntry::from_port).collect(),
            checks: def.checks.clone(),
            templates: def
                .templates
                .iter()
                .map(|(target, set)| (target.clone(), TemplateEntry::from_template_set(set)))
                .collect(),
        }
    }
}

/// Enforces the structural invariants every registered definition must meet.
pub(crate) fn check_definition(def: &BlockDefinition) -> Result<(), Located> {
    let mut seen = HashSet::new();
    for (i, param) in def.params.iter().enumerate() {
        let location = format!("params[{i}]");
        if !seen.insert(param.id.as_str()) {
            return Err((
                location,
                DefinitionErrorKind::DuplicateParam {
                    param: param.id.clone(),
                },
            ));
        }
        check_param(param).map_err(|kind| (location, kind))?;
    }

    check_ports(&def.inputs, "inputs", "input")?;
    check_ports(&def.outputs, "outputs", "output")?;

    if def.evaluatable && def.param(&def.value_param).is_none() {
        return Err((
            "value_param".to_string(),
            DefinitionErrorKind::MissingValueParam {
                param: def.value_param.clone(),
            },
        ));
    }
    Ok(())
}

fn check_param(param: &ParamDefinition) -> Result<(), DefinitionErrorKind> {
    let mut keys = HashSet::new();
    for option in &param.options {
        if !keys.insert(option.key.as_str()) {
            return Err(DefinitionErrorKind::DuplicateOption {
                param: param.id.clone(),
                key: option.key.clone(),
            });
        }
    }
    if param.dtype == ParamType::Enum {
        if param.options.is_empty() {
            return Err(DefinitionErrorKind::NoOptions {
                param: param.id.clone(),
            });
        }
        if param.option(param.default.trim()).is_none() {
            return Err(DefinitionErrorKind::DefaultNotAnOption {
                param: param.id.clone(),
                default: param.default.clone(),
            });
        }
    }
    Ok(())
}

fn check_ports(
    ports: &[PortDefinition],
    field: &str,
    direction: &'static str,
) -> Result<(), Located> {
    let mut seen = HashSet::new();
    for (i, port) in ports.iter().enumerate() {
        let location = format!("{field}[{i}]");
        if !seen.insert(port.label.as_str()) {
            return Err((
                location,
                DefinitionErrorKind::DuplicatePort {
                    direction,
                    label: port.label.clone(),
                },
            ));
        }
        if port.min_streams > port.max_streams {
            return Err((
                location,
                DefinitionErrorKind::InvalidStreamRange {
                    label: port.label.clone(),
                    min: port.min_streams,
                    max: port.max_streams,
                },
            ));
        }
    }
    Ok(())
}

impl ParamEntry {
    /// An enum left without a default takes its first option's key.
    fn into_param(self) -> ParamDefinition {
        let mut param = ParamDefinition::new(self.id, self.dtype, self.default);
        if let Some(label) = self.label {
            param.label = label;
        }
        param.options = self.options.into_iter().map(OptionEntry::into_option).collect();
        if param.dtype == ParamType::Enum
            && param.default.trim().is_empty()
            && let Some(first) = param.options.first()
        {
            param.default = first.key.clone();
        }
        param
    }

    fn from_param(param: &ParamDefinition) -> Self {
        Self {
            id: param.id.clone(),
            label: (param.label != param.id).then(|| param.label.clone()),
            dtype: param.dtype,
            default: param.default.clone(),
            options: param.options.iter().map(OptionEntry::from_option).collect(),
        }
    }
}

impl OptionEntry {
    fn into_option(self) -> ParamOption {
        match self {
            OptionEntry::Key(key) => ParamOption::new(key),
            OptionEntry::Full(table) => {
                let mut option = ParamOption::new(table.key);
                if let Some(label) = table.label {
                    option.label = label;
                }
                option.attributes = table.attributes;
                option
            }
        }
    }

    fn from_option(option: &ParamOption) -> Self {
        if option.label == option.key && option.attributes.is_empty() {
            return OptionEntry::Key(option.key.clone());
        }
        OptionEntry::Full(OptionTable {
            key: option.key.clone(),
            label: (option.label != option.key).then(|| option.label.clone()),
            attributes: option.attributes.clone(),
        })
    }
}

impl PortEntry {
    fn into_port(self) -> PortDefinition {
        let message = self.domain == PortDomain::Message;
        PortDefinition {
            label: self.label,
            domain: self.domain,
            dtype: self
                .dtype
                .unwrap_or_else(|| if message { "message" } else { "*" }.to_string()),
            vlen: self.vlen,
            multiplicity: self.multiplicity,
            min_streams: self.min_streams,
            max_streams: self.max_streams,
            optional: self.optional.unwrap_or(message),
        }
    }

    fn from_port(port: &PortDefinition) -> Self {
        Self {
            label: port.label.clone(),
            domain: port.domain,
            dtype: Some(port.dtype.clone()),
            vlen: port.vlen.clone(),
            multiplicity: port.multiplicity.clone(),
            min_streams: port.min_streams,
            max_streams: port.max_streams,
            optional: Some(port.optional),
        }
    }
}

impl TemplateEntry {
    fn into_template_set(self) -> TemplateSet {
        match self {
            TemplateEntry::Make(make) => TemplateSet::make(make),
            TemplateEntry::Full(table) => TemplateSet {
                imports: table.imports,
                make: table.make,
                callbacks: table.callbacks,
            },
        }
    }

    fn from_template_set(set: &TemplateSet) -> Self {
        if set.imports.is_empty() && set.callbacks.is_empty() {
            return TemplateEntry::Make(set.make.clone());
        }
        TemplateEntry::Full(TemplateTable {
            imports: set.imports.clone(),
            make: set.make.clone(),
            callbacks: set.callbacks.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<BlockDefinition, Located> {
        let file: BlockFile = toml::from_str(text).expect("valid TOML");
        let def = file.into_definition();
        check_definition(&def)?;
        Ok(def)
    }

    #[test]
    fn test_defaults_fill_in() {
        let def = parse(
            r#"
            id = "probe"
            kind = "probe"

            [[inputs]]
            label = "in"
            "#,
        )
        .unwrap();
        assert_eq!(def.label, "probe");
        assert_eq!(def.kind, BlockKind::Probe);
        assert!(!def.evaluatable);
        let port = &def.inputs[0];
        assert_eq!(port.dtype, "*");
        assert_eq!(port.vlen, "1");
        assert_eq!((port.min_streams, port.max_streams), (1, 1));
        assert!(!port.optional);
    }

    #[test]
    fn test_enum_default_falls_back_to_first_key() {
        let def = parse(
            r#"
            id = "x"
            [[params]]
            id = "type"
            dtype = "enum"
            options = ["float", { key = "int", label = "Integer" }]
            "#,
        )
        .unwrap();
        let param = def.param("type").unwrap();
        assert_eq!(param.default, "float");
        assert_eq!(param.options[1].label, "Integer");
    }

    #[test]
    fn test_bare_and_table_templates() {
        let def = parse(
            r#"
            id = "x"
            [templates]
            ref = "x()"
            [templates.python]
            imports = ["import x"]
            make = "x.X()"
            "#,
        )
        .unwrap();
        assert_eq!(def.template("ref").unwrap().make, "x()");
        assert_eq!(def.template("python").unwrap().imports, vec!["import x"]);
    }

    #[test]
    fn test_rejects_duplicate_params() {
        let (location, kind) = parse(
            r#"
            id = "x"
            [[params]]
            id = "a"
            [[params]]
            id = "a"
            "#,
        )
        .unwrap_err();
        assert_eq!(location, "params[1]");
        assert!(matches!(kind, DefinitionErrorKind::DuplicateParam { .. }));
    }

    #[test]
    fn test_rejects_enum_without_options() {
        let (_, kind) = parse(
            r#"
            id = "x"
            [[params]]
            id = "type"
            dtype = "enum"
            "#,
        )
        .unwrap_err();
        assert!(matches!(kind, DefinitionErrorKind::NoOptions { .. }));
    }

    #[test]
    fn test_rejects_default_outside_options() {
        let (_, kind) = parse(
            r#"
            id = "x"
            [[params]]
            id = "type"
            dtype = "enum"
            default = "complex"
            options = ["float"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            kind,
            DefinitionErrorKind::DefaultNotAnOption { ref default, .. } if default == "complex"
        ));
    }

    #[test]
    fn test_rejects_duplicate_option_keys() {
        let (_, kind) = parse(
            r#"
            id = "x"
            [[params]]
            id = "type"
            dtype = "enum"
            options = ["float", "float"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(kind, DefinitionErrorKind::DuplicateOption { .. }));
    }

    #[test]
    fn test_rejects_duplicate_port_labels_per_direction() {
        let (location, kind) = parse(
            r#"
            id = "x"
            [[inputs]]
            label = "in"
            [[inputs]]
            label = "in"
            [[outputs]]
            label = "in"
            "#,
        )
        .unwrap_err();
        assert_eq!(location, "inputs[1]");
        assert!(matches!(
            kind,
            DefinitionErrorKind::DuplicatePort { direction: "input", .. }
        ));
    }

    #[test]
    fn test_same_label_on_both_sides_is_fine() {
        assert!(
            parse(
                r#"
                id = "x"
                [[inputs]]
                label = "data"
                [[outputs]]
                label = "data"
                "#,
            )
            .is_ok()
        );
    }

    #[test]
    fn test_evaluatable_needs_value_param() {
        let (location, kind) = parse(
            r#"
            id = "variable"
            kind = "variable"
            "#,
        )
        .unwrap_err();
        assert_eq!(location, "value_param");
        assert!(matches!(kind, DefinitionErrorKind::MissingValueParam { .. }));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<BlockFile, _> = toml::from_str("id = \"x\"\ncolour = \"red\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_checks_parse_with_rule_tag() {
        let def = parse(
            r#"
            id = "x"
            [[params]]
            id = "taps"
            dtype = "int"
            default = "31"
            [[checks]]
            param = "taps"
            rule = "odd"
            [[checks]]
            param = "taps"
            rule = "range"
            min = 1
            max = 255
            severity = "warning"
            "#,
        )
        .unwrap();
        assert_eq!(def.checks.len(), 2);
        assert_eq!(
            def.checks[1].rule,
            blockflow_core::CheckRule::Range { min: 1.0, max: 255.0 }
        );
        assert_eq!(def.checks[1].severity, blockflow_core::Severity::Warning);
    }
}
