//! Error types for graph mutation and resolution.

use std::fmt;

use blockflow_core::Direction;
use thiserror::Error;

/// A rejected graph mutation. The graph is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No block with this instance id, or no definition with this type id.
    #[error("unknown block '{0}'")]
    UnknownBlock(String),

    /// The block's definition declares no such parameter.
    #[error("block '{block}' has no param '{param}'")]
    UnknownParam {
        /// Instance id.
        block: String,
        /// Parameter id.
        param: String,
    },

    /// Port index beyond the most physical ports the side can have.
    #[error("{} port {index} of block '{block}' is out of range (max {max})", side(*.direction))]
    PortRange {
        /// Instance id.
        block: String,
        /// Which side.
        direction: Direction,
        /// Requested index.
        index: usize,
        /// Number of physical ports the side can have.
        max: usize,
    },

    /// The sink port already has an enabled connection, or the edge exists.
    #[error("input port {port} of block '{block}' is already connected")]
    PortInUse {
        /// Sink instance id.
        block: String,
        /// Sink port index.
        port: usize,
    },

    /// A port connected to itself.
    #[error("cannot connect port {port} of block '{block}' to itself")]
    SelfLoop {
        /// Instance id.
        block: String,
        /// Port index.
        port: usize,
    },

    /// The edge to remove does not exist.
    #[error("no connection {source_block}:{source_port} -> {sink_block}:{sink_port}")]
    NotConnected {
        /// Source instance id.
        source_block: String,
        /// Source port index.
        source_port: usize,
        /// Sink instance id.
        sink_block: String,
        /// Sink port index.
        sink_port: usize,
    },

    /// An explicit instance id that is already taken.
    #[error("block id '{0}' is already in use")]
    DuplicateBlockId(String),

    /// An explicit instance id that is not an identifier.
    #[error("'{0}' is not a valid block id")]
    InvalidBlockId(String),

    /// Parameter evaluation needs a resolution pass, which failed.
    #[error(transparent)]
    Resolution(#[from] CyclicDependencyError),
}

fn side(direction: Direction) -> &'static str {
    match direction {
        Direction::Input => "input",
        Direction::Output => "output",
    }
}

/// Evaluatable blocks whose expressions reference each other in a loop.
///
/// `cycle` lists the ids in reference order: each references the next, and
/// the last references the first. It starts at the naturally smallest id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CyclicDependencyError {
    /// The ids on the cycle.
    pub cycle: Vec<String>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cyclic dependency: ")?;
        for id in &self.cycle {
            write!(f, "{id} -> ")?;
        }
        match self.cycle.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_range_display() {
        let err = GraphError::PortRange {
            block: "b1".to_string(),
            direction: Direction::Output,
            index: 5,
            max: 1,
        };
        assert_eq!(
            err.to_string(),
            "output port 5 of block 'b1' is out of range (max 1)"
        );
    }

    #[test]
    fn test_cycle_display_closes() {
        let err = CyclicDependencyError {
            cycle: vec!["v1".to_string(), "v2".to_string()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: v1 -> v2 -> v1");
    }

    #[test]
    fn test_not_connected_display() {
        let err = GraphError::NotConnected {
            source_block: "b1".to_string(),
            source_port: 0,
            sink_block: "b2".to_string(),
            sink_port: 1,
        };
        assert_eq!(err.to_string(), "no connection b1:0 -> b2:1");
    }
}
