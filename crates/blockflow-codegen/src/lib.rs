//! Code generation for blockflow graphs.
//!
//! A [`Generator`] walks a validated [`FlowGraph`](blockflow_graph::FlowGraph)
//! and substitutes each block's evaluated parameters into its template for
//! the selected target. The per-language glue (instance binding, connection
//! statements, setter sections, file extension) comes from a
//! [`TargetProfile`]; `ref`, `python` and `cpp` are built in.
//!
//! Generation performs no I/O. The caller decides where
//! [`GeneratedProgram::file_name`] is written.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use blockflow_codegen::Generator;
//! use blockflow_core::{BlockDefinition, BlockKind, ParamDefinition, ParamType, PortDefinition};
//! use blockflow_graph::{FlowGraph, GraphOptions};
//! use blockflow_registry::DefinitionRegistry;
//!
//! let mut registry = DefinitionRegistry::new();
//! registry.register(
//!     BlockDefinition::new("const_source", BlockKind::Block)
//!         .with_param(ParamDefinition::new("value", ParamType::Real, "0"))
//!         .with_output(PortDefinition::stream("out", "float"))
//!         .with_make("ref", "const_source(value=${value})"),
//! ).unwrap();
//!
//! let mut graph = FlowGraph::new(Arc::new(registry), GraphOptions::default());
//! graph.add_block("const_source", &[("value", "2 * 3")]).unwrap();
//!
//! let program = Generator::for_target("ref").unwrap().generate(&mut graph).unwrap();
//! assert_eq!(program.file_name, "flowgraph.flow");
//! assert!(program.text.contains("b1 = const_source(value=6)"));
//! ```

mod error;
mod generator;
mod profile;

pub use error::GenerationError;
pub use generator::{GeneratedProgram, Generator};
pub use profile::{BUILTIN_TARGETS, TargetProfile};
