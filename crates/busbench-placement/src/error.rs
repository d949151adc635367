//! Placement error types.

use thiserror::Error;

pub type PlacementResult<T> = Result<T, PlacementError>;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no {pool} machines for {count} {role} agent(s)")]
    EmptyMachinePool {
        role: String,
        pool: String,
        count: u32,
    },

    #[error("no bus endpoints reachable for {count} {role} agent(s)")]
    NoBusEndpoints { role: String, count: u32 },

    #[error("no control-bus replica for shard {0}")]
    NoControlEndpoint(usize),

    #[error("cannot shard over zero control-bus replicas")]
    NoShards,
}
