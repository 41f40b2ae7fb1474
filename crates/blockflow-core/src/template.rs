//! Template placeholders and block rendering.
//!
//! Template text is copied verbatim except for `${...}` placeholders:
//!
//! | Placeholder       | Substituted with                              |
//! |-------------------|-----------------------------------------------|
//! | `${id}`           | the instance id                               |
//! | `${param}`        | the parameter's evaluated value               |
//! | `${param:expr}`   | the parameter's raw expression                |
//! | `${param.attr}`   | attribute `attr` of the selected enum option  |
//!
//! A `${` with no closing brace is copied literally.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::definition::{BlockDefinition, ParamType};
use crate::value::Value;

/// A parsed `${...}` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// `${id}`
    InstanceId,
    /// `${param}`
    Value(&'a str),
    /// `${param:expr}`
    Expression(&'a str),
    /// `${param.attr}`
    Attribute {
        /// Parameter id.
        param: &'a str,
        /// Attribute name.
        attr: &'a str,
    },
}

impl<'a> Placeholder<'a> {
    fn from_body(body: &'a str) -> Placeholder<'a> {
        let body = body.trim();
        if body == "id" {
            return Placeholder::InstanceId;
        }
        if let Some(param) = body.strip_suffix(":expr") {
            return Placeholder::Expression(param.trim());
        }
        if let Some((param, attr)) = body.split_once('.') {
            return Placeholder::Attribute {
                param: param.trim(),
                attr: attr.trim(),
            };
        }
        Placeholder::Value(body)
    }

    /// Parameter id the placeholder reads from, if any.
    pub fn param(&self) -> Option<&'a str> {
        match *self {
            Placeholder::InstanceId => None,
            Placeholder::Value(p) | Placeholder::Expression(p) => Some(p),
            Placeholder::Attribute { param, .. } => Some(param),
        }
    }
}

impl fmt::Display for Placeholder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::InstanceId => write!(f, "${{id}}"),
            Placeholder::Value(p) => write!(f, "${{{p}}}"),
            Placeholder::Expression(p) => write!(f, "${{{p}:expr}}"),
            Placeholder::Attribute { param, attr } => write!(f, "${{{param}.{attr}}}"),
        }
    }
}

/// A piece of template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text.
    Text(&'a str),
    /// A placeholder.
    Placeholder(Placeholder<'a>),
}

/// Splits template text into literal and placeholder segments.
pub fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        if start > 0 {
            out.push(Segment::Text(&rest[..start]));
        }
        out.push(Segment::Placeholder(Placeholder::from_body(&after[..end])));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

/// Parameter ids referenced by placeholders in `template`, in order.
pub fn referenced_params(template: &str) -> Vec<&str> {
    segments(template)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(p) => p.param(),
            Segment::Text(_) => None,
        })
        .collect()
}

/// A placeholder that could not be substituted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value for placeholder '{placeholder}'")]
pub struct RenderError {
    /// The placeholder as written.
    pub placeholder: String,
}

/// Everything a renderer may read about one block instance.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Instance id.
    pub block_id: &'a str,
    /// The block's definition.
    pub definition: &'a BlockDefinition,
    /// Target being rendered for.
    pub target: &'a str,
    /// Raw parameter expressions.
    pub expressions: &'a BTreeMap<String, String>,
    /// Evaluated parameter values. Parameters that failed are absent.
    pub values: &'a BTreeMap<String, Value>,
}

impl RenderContext<'_> {
    /// Resolves one placeholder to text.
    ///
    /// Enum parameters substitute their option key verbatim; other values use
    /// their [`Value`] display form.
    pub fn lookup(&self, placeholder: &Placeholder<'_>) -> Option<String> {
        match *placeholder {
            Placeholder::InstanceId => Some(self.block_id.to_string()),
            Placeholder::Expression(param) => self.expressions.get(param).cloned(),
            Placeholder::Value(param) => {
                let def = self.definition.param(param)?;
                if def.dtype == ParamType::Enum {
                    return self.expressions.get(param).map(|e| e.trim().to_string());
                }
                self.values.get(param).map(ToString::to_string)
            }
            Placeholder::Attribute { param, attr } => {
                let def = self.definition.param(param)?;
                let key = self.expressions.get(param)?;
                def.option(key.trim())?.attributes.get(attr).cloned()
            }
        }
    }

    /// Substitutes every placeholder in `template`.
    pub fn substitute(&self, template: &str) -> Result<String, RenderError> {
        let mut out = String::with_capacity(template.len());
        for segment in segments(template) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    let text = self.lookup(&p).ok_or_else(|| RenderError {
                        placeholder: p.to_string(),
                    })?;
                    out.push_str(&text);
                }
            }
        }
        Ok(out)
    }
}

/// Custom emission for a block definition.
///
/// The default methods substitute placeholders in the target's template set;
/// implementors override whichever part needs bespoke text.
pub trait TemplateRenderer: Send + Sync + fmt::Debug {
    /// Renders the instantiation statement.
    fn render_make(&self, make: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        ctx.substitute(make)
    }

    /// Renders one callback statement.
    fn render_callback(
        &self,
        callback: &str,
        ctx: &RenderContext<'_>,
    ) -> Result<String, RenderError> {
        ctx.substitute(callback)
    }
}

/// Renderer used when a definition attaches none.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {}
