//! Generation errors.

use blockflow_graph::{CyclicDependencyError, GraphError};
use thiserror::Error;

/// Why a graph could not be turned into a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// A template placeholder had nothing to substitute.
    #[error("block '{block}': no value for placeholder '{placeholder}'")]
    MissingPlaceholder {
        /// Instance id.
        block: String,
        /// The placeholder as written.
        placeholder: String,
    },

    /// A block's definition has no template for the target.
    #[error("block '{block}' has no template for target '{target}'")]
    MissingTemplate {
        /// Instance id.
        block: String,
        /// Target name.
        target: String,
    },

    /// The evaluatable blocks could not be ordered.
    #[error(transparent)]
    Resolution(#[from] CyclicDependencyError),

    /// No built-in profile has this name.
    #[error("unknown target '{name}' (available: {available})")]
    UnknownTarget {
        /// Requested name.
        name: String,
        /// Comma-separated built-in names.
        available: String,
    },

    /// The graph rejected a query.
    #[error(transparent)]
    Graph(GraphError),
}

impl From<GraphError> for GenerationError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Resolution(cycle) => GenerationError::Resolution(cycle),
            other => GenerationError::Graph(other),
        }
    }
}
