//! Graph validation.
//!
//! [`validate`] never fails: every problem becomes a [`ValidationIssue`] in
//! the report, and the graph is valid when none of them is an error. Checks
//! run in a fixed order so reports are stable:
//!
//! 1. Cyclic references between evaluatable blocks
//! 2. Parameter values against their declared types
//! 3. Port counts, multiplicity ranges, and sink ports used more than once
//! 4. Domain, dtype and vector length agreement across each connection
//! 5. Required ports left unconnected
//! 6. Per-definition checks and custom validators
//!
//! Disabled blocks and connections touching them are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;

use blockflow_core::{CheckContext, Direction, PortDomain, Severity, WILDCARD_DTYPE};
use serde::Serialize;

use crate::graph::{Connection, FlowGraph};
use crate::params::ParamError;

/// What an issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Subject {
    /// A block instance.
    Block {
        /// Instance id.
        id: String,
    },
    /// A connection.
    Connection(Connection),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Block { id } => write!(f, "block {id}"),
            Subject::Connection(c) => write!(f, "connection {c}"),
        }
    }
}

/// One problem found by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// What the issue is about.
    pub subject: Subject,
    /// Error or warning.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.subject, self.message)
    }
}

/// Ordered list of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Every issue, in check order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Error-severity issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Warning-severity issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// True when no issue is an error.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Number of issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// True when there are no issues at all.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    fn block(&mut self, id: &str, severity: Severity, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            subject: Subject::Block { id: id.to_string() },
            severity,
            message: message.into(),
        });
    }

    fn connection(&mut self, connection: &Connection, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            subject: Subject::Connection(connection.clone()),
            severity: Severity::Error,
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

fn side_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Input => "input",
        Direction::Output => "output",
    }
}

fn dtypes_agree(a: &str, b: &str) -> bool {
    a == b || a == WILDCARD_DTYPE || b == WILDCARD_DTYPE
}

/// Validates `graph`, resolving it first if needed.
pub fn validate(graph: &mut FlowGraph) -> ValidationReport {
    let (resolution, analysis) = graph.analyze();
    let graph = &*graph;
    let mut report = ValidationReport::default();
    let enabled: Vec<_> = graph.blocks().iter().filter(|b| b.is_enabled()).collect();

    // --- Cyclic references ---
    if let Some(cycle) = resolution.cycle() {
        for id in &cycle.cycle {
            report.block(id, Severity::Error, cycle.to_string());
        }
    }

    // --- Parameter values ---
    for block in &enabled {
        let Some(a) = analysis.get(block.id()) else { continue };
        for param in &block.definition().params {
            let Some(err) = a.params.errors.get(&param.id) else {
                continue;
            };
            if let ParamError::Eval(eval) = err
                && resolution.is_secondary(eval)
            {
                continue;
            }
            report.block(block.id(), Severity::Error, format!("param '{}': {err}", param.id));
        }
    }

    // --- Port counts and sink usage ---
    for block in &enabled {
        let Some(a) = analysis.get(block.id()) else { continue };
        for problem in a.inputs.problems.iter().chain(&a.outputs.problems) {
            report.block(block.id(), Severity::Error, problem.clone());
        }
    }

    let mut sink_usage: HashMap<(&str, usize), usize> = HashMap::new();
    let mut typed = Vec::new();
    for connection in graph.enabled_connections() {
        let (Some(src), Some(dst)) = (analysis.get(&connection.source), analysis.get(&connection.sink)) else {
            continue;
        };
        let mut in_range = true;
        for (direction, a, index) in [
            (Direction::Output, src, connection.source_port),
            (Direction::Input, dst, connection.sink_port),
        ] {
            let available = a.side(direction).ports.len();
            if index >= available {
                report.connection(
                    connection,
                    format!(
                        "{side} port {index} does not exist (block has {available} {side} ports)",
                        side = side_name(direction)
                    ),
                );
                in_range = false;
            }
        }

        let uses = sink_usage
            .entry((connection.sink.as_str(), connection.sink_port))
            .or_insert(0);
        *uses += 1;
        if *uses > 1 {
            report.connection(
                connection,
                format!(
                    "input port {}:{} has more than one connection",
                    connection.sink, connection.sink_port
                ),
            );
        }

        if in_range {
            typed.push((connection, src, dst));
        }
    }

    // --- Connection type agreement ---
    for (connection, src, dst) in typed {
        let out = &src.outputs.ports[connection.source_port];
        let inp = &dst.inputs.ports[connection.sink_port];
        if out.domain != inp.domain {
            report.connection(
                connection,
                format!("cannot connect {} output to {} input", out.domain, inp.domain),
            );
            continue;
        }
        if let (Some(a), Some(b)) = (&out.dtype, &inp.dtype)
            && !dtypes_agree(a, b)
        {
            report.connection(connection, format!("type mismatch: {a} output to {b} input"));
            continue;
        }
        if out.domain == PortDomain::Stream
            && let (Some(a), Some(b)) = (out.vlen, inp.vlen)
            && a != b
        {
            report.connection(
                connection,
                format!("vector length mismatch: {a} output to {b} input"),
            );
        }
    }

    // --- Required ports ---
    let connected: HashSet<(&str, Direction, usize)> = graph
        .enabled_connections()
        .flat_map(|c| {
            [
                (c.source.as_str(), Direction::Output, c.source_port),
                (c.sink.as_str(), Direction::Input, c.sink_port),
            ]
        })
        .collect();
    for block in &enabled {
        let Some(a) = analysis.get(block.id()) else { continue };
        for direction in [Direction::Input, Direction::Output] {
            for (index, port) in a.side(direction).ports.iter().enumerate() {
                if port.required && !connected.contains(&(block.id(), direction, index)) {
                    report.block(
                        block.id(),
                        Severity::Error,
                        format!(
                            "{} port '{}' ({index}) is not connected",
                            side_name(direction),
                            port.label
                        ),
                    );
                }
            }
        }
    }

    // --- Definition checks ---
    for block in &enabled {
        let Some(a) = analysis.get(block.id()) else { continue };
        let ctx = CheckContext {
            block_id: block.id(),
            definition: block.definition(),
            expressions: &a.params.expressions,
            values: &a.params.values,
        };
        for finding in block.definition().run_checks(&ctx) {
            report.block(block.id(), finding.severity, finding.message);
        }
    }

    tracing::debug!(
        "validate: {} errors, {} warnings",
        report.errors().count(),
        report.warnings().count()
    );
    report
}
