//! Cross-parameter dependency resolution.
//!
//! Evaluatable blocks (variables, parameters, anything tagged `evaluatable`)
//! contribute their value expression to a shared namespace that every other
//! parameter expression may reference by block id. A resolution pass:
//!
//! 1. Builds the [`DependencyGraph`] from lexical references between the
//!    value expressions of enabled evaluatable blocks.
//! 2. Orders it with Kahn's algorithm, breaking ties by natural id order.
//! 3. Evaluates each block in order, binding successes into the
//!    [`Namespace`] and recording failures per id.
//!
//! A cycle does not abort the pass: everything ahead of the cycle is still
//! evaluated so the validator can report independent problems, and the
//! cycle is carried in the [`Resolution`].

mod dependency;
mod evaluator;
mod references;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use blockflow_core::{EvalError, Value};

use crate::error::CyclicDependencyError;
use crate::graph::BlockInstance;
use crate::params::raw_value;

pub use dependency::{DependencyGraph, topological_order};
pub use evaluator::{Evaluator, Namespace};
pub use references::extract_references;

/// Output of one resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    order: Vec<String>,
    namespace: Namespace,
    failures: BTreeMap<String, EvalError>,
    unresolved: BTreeSet<String>,
    cycle: Option<CyclicDependencyError>,
    dependencies: DependencyGraph,
}

impl Resolution {
    /// Evaluatable block ids in evaluation order. Ids on or behind a cycle
    /// are missing.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Values of the evaluatable blocks that evaluated successfully.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Value of one evaluatable block.
    pub fn value(&self, id: &str) -> Option<&Value> {
        self.namespace.get(id)
    }

    /// Evaluation failures by block id.
    pub fn failures(&self) -> &BTreeMap<String, EvalError> {
        &self.failures
    }

    /// Why `id` failed to evaluate, if it did.
    pub fn failure(&self, id: &str) -> Option<&EvalError> {
        self.failures.get(id)
    }

    /// Ids that were never evaluated because of a cycle.
    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    /// The cycle that stopped ordering, if any.
    pub fn cycle(&self) -> Option<&CyclicDependencyError> {
        self.cycle.as_ref()
    }

    /// The dependency graph the pass ordered.
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    /// Whether `error` only reflects a problem already reported for another
    /// evaluatable block: an unknown identifier naming a block that failed or
    /// was left unresolved.
    pub fn is_secondary(&self, error: &EvalError) -> bool {
        match error {
            EvalError::UnknownIdentifier { name } => {
                self.failures.contains_key(name) || self.unresolved.contains(name)
            }
            _ => false,
        }
    }

    pub(crate) fn check(&self) -> Result<(), CyclicDependencyError> {
        match &self.cycle {
            Some(cycle) => Err(cycle.clone()),
            None => Ok(()),
        }
    }
}

/// Runs one full pass over `blocks`.
pub(crate) fn run_pass(blocks: &[BlockInstance], evaluator: &mut Evaluator) -> Resolution {
    let evaluatable: Vec<&BlockInstance> = blocks
        .iter()
        .filter(|b| b.is_enabled() && b.definition().evaluatable)
        .collect();
    let dependencies = DependencyGraph::from_expressions(
        evaluatable
            .iter()
            .map(|b| (b.id().to_string(), b.value_expression().to_string())),
    );
    let by_id: HashMap<&str, &BlockInstance> = evaluatable.iter().map(|b| (b.id(), *b)).collect();

    let (order, unresolved) = dependencies.partial_order();
    let cycle = (!unresolved.is_empty()).then(|| dependencies.shortest_cycle(&unresolved));

    let mut namespace = Namespace::new();
    let mut failures = BTreeMap::new();
    for id in &order {
        let Some(block) = by_id.get(id.as_str()) else {
            continue;
        };
        let definition = block.definition();
        let param = definition.param(&definition.value_param);
        match raw_value(param, block.value_expression(), evaluator, &namespace) {
            Ok(value) => namespace.insert(id.clone(), value),
            Err(err) => {
                tracing::debug!("resolve: {id} failed: {err}");
                failures.insert(id.clone(), err);
            }
        }
    }

    tracing::debug!(
        "resolve: {} evaluated, {} failed, {} unresolved",
        namespace.len(),
        failures.len(),
        unresolved.len()
    );

    Resolution {
        order,
        namespace,
        failures,
        unresolved,
        cycle,
        dependencies,
    }
}
