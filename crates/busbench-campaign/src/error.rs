//! Campaign error types.
//!
//! Only [`ExecutionError`] is recovered from: the combination that raised
//! it is marked skipped and the campaign moves on. Everything else stops
//! the campaign.

use std::path::PathBuf;

use busbench_core::ConfigError;
use busbench_placement::PlacementError;
use busbench_state::StateError;
use busbench_topology::TopologyError;
use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

/// A collaborator failed to carry out an action on the testbed.
#[derive(Debug, Clone, Error)]
#[error("{action} failed: {message}")]
pub struct ExecutionError {
    pub action: String,
    pub message: String,
}

impl ExecutionError {
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("environment not prepared: {0}")]
    NotPrepared(String),
}

impl CampaignError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CampaignError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the campaign may skip the combination and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CampaignError::Execution(_))
    }
}
