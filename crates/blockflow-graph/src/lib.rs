//! Flow graph model, validation and dependency resolution for blockflow.
//!
//! - [`FlowGraph`]: blocks, connections and options, with checked mutations
//! - [`validate`]: the ordered validation rules, producing a
//!   [`ValidationReport`]
//! - [`resolver`]: reference extraction, the variable [`DependencyGraph`],
//!   its topological order and memoized evaluation
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use blockflow_core::{BlockDefinition, BlockKind, ParamDefinition, ParamType, Value};
//! use blockflow_graph::{FlowGraph, GraphOptions};
//! use blockflow_registry::DefinitionRegistry;
//!
//! let mut registry = DefinitionRegistry::new();
//! registry
//!     .register(
//!         BlockDefinition::new("variable", BlockKind::Variable)
//!             .with_param(ParamDefinition::new("value", ParamType::Raw, "0")),
//!     )
//!     .unwrap();
//!
//! let mut graph = FlowGraph::new(Arc::new(registry), GraphOptions::default());
//! graph.add_block_with_id("variable", "v1", &[("value", "1")]).unwrap();
//! graph.add_block_with_id("variable", "v2", &[("value", "v1 + 1")]).unwrap();
//!
//! let resolution = graph.resolve().unwrap();
//! assert_eq!(resolution.order(), ["v1", "v2"]);
//! assert_eq!(resolution.value("v2"), Some(&Value::Number(2.0)));
//! ```

mod cache;
mod error;
mod graph;
pub mod ids;
mod params;
mod ports;
pub mod resolver;
mod validator;

pub use cache::ResolutionCache;
pub use error::{CyclicDependencyError, GraphError};
pub use graph::{BlockInstance, Connection, FlowGraph, GraphOptions};
pub use params::{ParamError, ParamValues};
pub use resolver::{
    DependencyGraph, Evaluator, Namespace, Resolution, extract_references, topological_order,
};
pub use validator::{Subject, ValidationIssue, ValidationReport, validate};
