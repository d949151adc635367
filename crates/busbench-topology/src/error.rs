//! Topology error types.
//!
//! Every variant is a configuration problem: it is raised while laying out
//! the bus, before anything is deployed.

use busbench_core::ConfigError;
use thiserror::Error;

pub type TopologyResult<T> = Result<T, TopologyError>;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("unknown topology: {0}")]
    UnknownKind(String),

    #[error("topology {kind} expects {expected} argument(s), got {got}")]
    Arity {
        kind: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid edge {from}-{to} in a graph of {nodes} nodes")]
    InvalidEdge { from: usize, to: usize, nodes: usize },

    #[error("topology {0} has too many nodes")]
    TooLarge(String),

    #[error("no machines available for {0}")]
    NoMachines(String),

    #[error("listener port out of range on {0}")]
    PortRange(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
