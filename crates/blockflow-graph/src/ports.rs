//! Expansion of logical ports into physical ports.
//!
//! A logical port's dtype, vlen and multiplicity may reference parameters
//! through placeholders (`${type.ctype}`, `${vlen}`, `${num_inputs}`). Once
//! the block's parameters are evaluated, each logical port becomes
//! `multiplicity` physical ports, numbered consecutively across the side.

use blockflow_core::template::referenced_params;
use blockflow_core::{Direction, PortDomain, RenderContext, RenderError};

use crate::graph::BlockInstance;
use crate::params::ParamValues;
use crate::resolver::{Evaluator, Resolution};

/// One physical port with its expressions resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPort {
    /// Label of the logical port it came from.
    pub label: String,
    /// Index of that logical port in its direction's list.
    pub logical: usize,
    /// Stream or message.
    pub domain: PortDomain,
    /// Element type, or `None` when it could not be resolved.
    pub dtype: Option<String>,
    /// Vector length, or `None` when it could not be resolved.
    pub vlen: Option<i64>,
    /// Whether the port must be connected.
    pub required: bool,
}

/// Physical ports of one side of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPorts {
    /// Physical ports in index order.
    pub ports: Vec<ResolvedPort>,
    /// Problems met while resolving, as messages against the block.
    pub problems: Vec<String>,
}

struct PortResolver<'a> {
    ctx: RenderContext<'a>,
    params: &'a ParamValues,
    resolution: &'a Resolution,
    evaluator: &'a mut Evaluator,
    problems: Vec<String>,
}

impl PortResolver<'_> {
    /// Substitutes placeholders. Returns `None` without a problem when a
    /// referenced parameter failed, since that failure is reported already.
    fn substitute(&self, text: &str) -> Result<Option<String>, RenderError> {
        let blocked = referenced_params(text).into_iter().any(|p| {
            self.ctx.definition.param(p).is_some() && !self.params.values.contains_key(p)
        });
        if blocked {
            return Ok(None);
        }
        self.ctx.substitute(text).map(|s| Some(s.trim().to_string()))
    }

    fn text(&mut self, label: &str, what: &str, text: &str) -> Option<String> {
        match self.substitute(text) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.problems.push(format!("port '{label}' {what}: {err}"));
                None
            }
        }
    }

    fn count(&mut self, label: &str, what: &str, text: &str) -> Option<usize> {
        let resolved = self.text(label, what, text)?;
        match self.evaluator.evaluate(&resolved, self.resolution.namespace()) {
            Ok(value) => match value.as_integer() {
                Some(n) if n >= 0 => Some(n as usize),
                _ => {
                    self.problems.push(format!(
                        "port '{label}' {what} must be a non-negative integer (got {value})"
                    ));
                    None
                }
            },
            Err(err) => {
                self.problems
                    .push(format!("port '{label}' {what} '{resolved}': {err}"));
                None
            }
        }
    }
}

/// Resolves and expands the ports on one side of `block`.
pub(crate) fn resolve_ports(
    block: &BlockInstance,
    direction: Direction,
    target: &str,
    params: &ParamValues,
    resolution: &Resolution,
    evaluator: &mut Evaluator,
) -> ResolvedPorts {
    let definition = block.definition();
    let mut resolver = PortResolver {
        ctx: RenderContext {
            block_id: block.id(),
            definition,
            target,
            expressions: &params.expressions,
            values: &params.values,
        },
        params,
        resolution,
        evaluator,
        problems: Vec::new(),
    };

    let mut ports = Vec::new();
    for (logical, port) in definition.ports(direction).iter().enumerate() {
        let dtype = resolver.text(&port.label, "dtype", &port.dtype);
        let vlen = resolver
            .count(&port.label, "vlen", &port.vlen)
            .map(|n| n as i64);
        let streams = match resolver.count(&port.label, "multiplicity", &port.multiplicity) {
            Some(n) => {
                if n < port.min_streams || n > port.max_streams {
                    resolver.problems.push(format!(
                        "port '{}' has {n} streams, allowed {} to {}",
                        port.label, port.min_streams, port.max_streams
                    ));
                }
                n.min(port.max_streams)
            }
            // Already reported; expose only the guaranteed ports.
            None => port.min_streams,
        };

        let physical = ResolvedPort {
            label: port.label.clone(),
            logical,
            domain: port.domain,
            dtype,
            vlen,
            required: !port.optional && port.min_streams >= 1,
        };
        ports.extend(std::iter::repeat_n(physical, streams));
    }

    ResolvedPorts {
        ports,
        problems: resolver.problems,
    }
}
