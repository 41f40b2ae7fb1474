//! Core primitives for the blockflow graph compiler.
//!
//! This crate holds everything the other blockflow crates agree on:
//!
//! - **Definitions**: [`BlockDefinition`] and its parameter, port and template
//!   declarations
//! - **Values**: the [`Value`] type expressions evaluate to
//! - **Expressions**: the small parameter [`expr`] language (parser and
//!   evaluator, plus the tolerant identifier scan used for dependency edges)
//! - **Capabilities**: [`CustomValidator`] and [`TemplateRenderer`], the two
//!   hooks a definition may attach, with built-in implementations
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use blockflow_core::{Value, expr};
//!
//! let mut namespace = BTreeMap::new();
//! namespace.insert("v1".to_string(), Value::Number(1.0));
//!
//! let parsed = expr::parse("v1 + 1").unwrap();
//! assert_eq!(expr::evaluate(&parsed, &namespace).unwrap(), Value::Number(2.0));
//! assert_eq!(expr::scan_identifiers("'v3' + v1"), vec!["v1"]);
//! ```

pub mod check;
pub mod definition;
pub mod expr;
pub mod template;
mod value;

pub use check::{Check, CheckContext, CheckRule, CustomValidator, DeclarativeChecks, Finding, Severity};
pub use definition::{
    BlockDefinition, BlockKind, Direction, ParamDefinition, ParamOption, ParamType, PortDefinition,
    PortDomain, TemplateSet, WILDCARD_DTYPE, split_category,
};
pub use expr::{EvalError, ExprError, Scope};
pub use template::{PlaceholderRenderer, RenderContext, RenderError, TemplateRenderer};
pub use value::Value;
