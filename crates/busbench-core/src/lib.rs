//! busbench-core — shared data model for benchmark campaigns.
//!
//! Parameter spaces and the sets enumerated from them, experiment ids,
//! topic naming, bus endpoint descriptors, the immutable defaults record
//! and the `busbench.toml` campaign configuration.

pub mod config;
pub mod defaults;
pub mod error;
pub mod id;
pub mod params;
pub mod topics;
pub mod types;
pub mod value;

pub use config::{CampaignConfig, DriverConfig, StaticConfig};
pub use defaults::Defaults;
pub use error::{ConfigError, ConfigResult};
pub use id::ExperimentId;
pub use params::{ParameterSet, ParameterSpace};
pub use topics::TopicSet;
pub use types::*;
pub use value::ParamValue;
